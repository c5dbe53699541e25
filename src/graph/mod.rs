//! Causal and associative navigation over durable records.
//!
//! Two views share one arena: a directed causal DAG built from parent
//! lineage at admission time, and an undirected associative overlay whose
//! edges are discovered by nearest-neighbor search over metadata
//! embeddings. The forensics engine combines both to explain drift.

mod causal;
mod forensics;
mod latent;

pub use causal::{CausalGraphNavigator, NodeAttrs};
pub use forensics::{
    DriftAnalysis, EthicalViolation, ForensicsEngine, Investigation, PhysicalAnomaly,
    Recommendation,
};
pub use latent::{
    DomainPair, Embedding, LatentLink, LatentLinkDiscoverer, EMBEDDING_DIM,
};
