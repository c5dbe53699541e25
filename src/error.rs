//! Error types for ontomem.

use thiserror::Error;

/// Result type alias using ontomem's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during memory store operations.
///
/// Admission rejections are not errors: `MemoryRegistry::admit` returns a
/// typed [`AdmissionOutcome`](crate::registry::AdmissionOutcome) instead.
/// This enum covers programming errors and infrastructure failures only.
#[derive(Error, Debug)]
pub enum Error {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record with this id already exists with different content.
    /// Records are immutable after creation, so construction aborts.
    #[error("Duplicate record id {id} with differing content")]
    DuplicateRecord { id: String },

    /// Causal graph invariant violated
    #[error("Graph inconsistency: {0}")]
    GraphInconsistency(String),

    /// Operation attempted after shutdown
    #[error("Registry is closed")]
    RegistryClosed,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a duplicate record error.
    pub fn duplicate_record(id: impl Into<String>) -> Self {
        Self::DuplicateRecord { id: id.into() }
    }

    /// Create a graph inconsistency error.
    pub fn graph_inconsistency(message: impl Into<String>) -> Self {
        Self::GraphInconsistency(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
