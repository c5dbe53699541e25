//! # ontomem
//!
//! A tiered, retention-scored memory store. Discrete observations
//! ("substrate states") are filtered, classified into tiers, and persisted
//! as long-lived records arranged into a causal lineage graph plus an
//! associative similarity graph. A temporal-decay retention policy
//! continuously re-scores and evicts records while protecting those that
//! bridge otherwise-unconnected domains.
//!
//! ## Core Components
//!
//! - **Registry**: admission filtering, deterministic identity, async sealing
//! - **Graph**: causal lineage navigation and latent link discovery
//! - **Retention**: decay-weighted scoring, eviction, bridge protection
//! - **System**: single facade wiring everything together
//!
//! ## Example
//!
//! ```rust,ignore
//! use ontomem::{MemoryConfig, MemorySystem, SubstrateState};
//!
//! let mut system = MemorySystem::new(MemoryConfig::default());
//! let state = SubstrateState::new(0.9, 0.9, 0.9).with_domain("physics");
//!
//! let outcome = system.admit(&state, false)?;
//! if let Some(id) = outcome.id() {
//!     let links = system.discover_links(id, None);
//!     println!("discovered {} cross-domain links", links.len());
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod registry;
pub mod retention;
pub mod system;

// Re-exports for convenience
pub use config::{
    ForensicsConfig, LinkerConfig, MemoryConfig, RegistryConfig, RetentionConfig, SentinelConfig,
};
pub use error::{Error, Result};
pub use events::{
    BroadcastEmitter, CollectingEmitter, EventEmitter, MemoryEvent, MemoryEventKind, NullEmitter,
};
pub use graph::{
    CausalGraphNavigator, DomainPair, DriftAnalysis, EthicalViolation, ForensicsEngine,
    Investigation, LatentLink, LatentLinkDiscoverer, NodeAttrs, PhysicalAnomaly, Recommendation,
};
pub use registry::{
    AdmissionOutcome, IdentityHasher, MemoryRecord, MemoryRegistry, MemoryTier, RecordId,
    RegistryStats, RejectReason, SealingWorker, SubstrateContext, SubstrateState,
};
pub use retention::{
    BridgeEdge, BridgeHit, BridgeSentinel, BridgeTier, CriticalBridge, GovernanceImpact,
    LambdaController, PhysicsSignature, RetentionPriority, RetentionStats, SentinelStats,
    ShadowEntry, TemporalRetentionEngine, TemporalWeightParams,
};
pub use system::{MaintenanceReport, MemoryStats, MemorySystem};
