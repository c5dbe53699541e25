//! Temporal-decay retention scoring, eviction, and bridge protection.
//!
//! The retention engine computes a decay-weighted score per record,
//! classifies diagnostic priority, and periodically evicts the
//! lowest-scoring records to a shadow store. The bridge sentinel watches
//! associative edges spanning two domains of interest and raises their
//! protective score when eviction looks imminent.

mod engine;
mod proptest;
mod sentinel;
mod weight;

pub use engine::{
    BridgeEdge, BridgeHit, BridgeTier, RetentionStats, ShadowEntry, TemporalRetentionEngine,
};
pub use sentinel::{
    BridgeSentinel, CriticalBridge, GovernanceImpact, PhysicsSignature, SentinelStats,
};
pub use weight::{classify_priority, LambdaController, RetentionPriority, TemporalWeightParams};
