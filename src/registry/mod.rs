//! Record admission, identity, and sealing.
//!
//! The registry owns the set of active durable records and a bounded
//! short-term delta buffer. Admission applies, in order: a stability filter
//! over the coherence/ethical scores, a surprise filter, deterministic
//! identity assignment, and tier classification.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ontomem::registry::{MemoryRegistry, SubstrateState};
//! use ontomem::config::RegistryConfig;
//!
//! let mut registry = MemoryRegistry::new(RegistryConfig::default());
//! let state = SubstrateState::new(0.9, 0.9, 0.9).with_domain("physics");
//! let outcome = registry.admit(&state, false)?;
//! ```

mod identity;
mod sealing;
mod store;
mod types;

pub use identity::{stable_bucket, IdentityHasher};
pub use sealing::{compute_seal, SealCommand, SealingWorker};
pub use store::{MemoryRegistry, SharedRecords};
pub use types::{
    AdmissionOutcome, MemoryRecord, MemoryTier, RecordId, RegistryStats, RejectReason,
    SubstrateContext, SubstrateState,
};
