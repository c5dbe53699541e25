//! Deterministic content-addressed identity for memory records.
//!
//! Record ids are a function of quantized admission metadata, so two
//! admissions with identical quantized inputs collide on purpose: identity
//! assignment is idempotent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::registry::types::RecordId;

/// Number of decimal places kept for score quantization.
const SCORE_DECIMALS: f64 = 10_000.0;

/// Quantized identity payload; field order fixes the canonical form.
#[derive(Serialize)]
struct QuantizedIdentity<'a> {
    beta: f64,
    phi: f64,
    seed: &'a str,
    ts: i64,
}

/// Generator of deterministic record ids.
#[derive(Debug, Clone)]
pub struct IdentityHasher {
    seed_ref: String,
}

impl IdentityHasher {
    /// Create a hasher keyed by the first 16 chars of the origin seed.
    pub fn new(origin_seed: &str) -> Self {
        let end = origin_seed.len().min(16);
        Self {
            seed_ref: origin_seed[..end].to_string(),
        }
    }

    /// The truncated seed reference included in every identity digest.
    pub fn seed_ref(&self) -> &str {
        &self.seed_ref
    }

    /// Compute the record id for the quantized admission metadata.
    pub fn record_id(
        &self,
        coherence_score: f64,
        ethical_score: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<RecordId> {
        let payload = QuantizedIdentity {
            beta: quantize_score(ethical_score),
            phi: quantize_score(coherence_score),
            seed: &self.seed_ref,
            ts: timestamp.timestamp_millis(),
        };
        let canonical = serde_json::to_string(&payload)?;

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();

        let hex: String = digest
            .iter()
            .take(8)
            .map(|b| format!("{:02X}", b))
            .collect();
        Ok(RecordId(format!("MID-{}", hex)))
    }
}

/// Round a score to the quantization grid.
fn quantize_score(score: f64) -> f64 {
    (score * SCORE_DECIMALS).round() / SCORE_DECIMALS
}

/// Deterministic bucket assignment for a string tag.
///
/// Process-stable, unlike `DefaultHasher`, so embeddings built from domain
/// tags are reproducible across runs.
pub fn stable_bucket(tag: &str, buckets: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % buckets.max(1)
}
