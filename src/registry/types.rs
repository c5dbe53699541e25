//! Core data model for the tiered memory store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Content-derived identifier for a durable memory record.
///
/// Globally unique and immutable after creation. Two admissions with
/// identical quantized inputs intentionally collide (idempotent identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Short form for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// Durability classification of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryTier {
    /// Volatile, never stored
    Episodic,
    /// Short-term, kept in the bounded delta buffer
    Integrated,
    /// Durable, inserted into the causal graph and sealed
    Ontological,
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Episodic => "EPISODIC",
            Self::Integrated => "INTEGRATED",
            Self::Ontological => "ONTOLOGICAL",
        };
        write!(f, "{}", s)
    }
}

/// Typed substrate context carried alongside an observation.
///
/// Replaces the free-form `social_context` map of upstream producers with
/// the keys the store actually consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateContext {
    /// Originating subsystem tag
    pub domain: String,
    /// Fraction of agents currently in crisis
    pub crisis_ratio: f64,
    /// p99 latency of the originating substrate, milliseconds
    pub latency_p99: f64,
}

impl Default for SubstrateContext {
    fn default() -> Self {
        Self {
            domain: "general".to_string(),
            crisis_ratio: 0.0,
            latency_p99: 0.0,
        }
    }
}

impl SubstrateContext {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn with_crisis_ratio(mut self, crisis_ratio: f64) -> Self {
        self.crisis_ratio = crisis_ratio;
        self
    }

    pub fn with_latency_p99(mut self, latency_p99: f64) -> Self {
        self.latency_p99 = latency_p99;
        self
    }
}

/// A single externally produced observation submitted for admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateState {
    /// Hash of the raw substrate snapshot (opaque to the store)
    pub content_hash: String,
    /// Governance vector; only its length (agent count) is consumed
    pub governance_vector: Vec<f32>,
    /// Typed substrate context
    pub context: SubstrateContext,
    /// Observation timestamp
    pub timestamp: DateTime<Utc>,
    /// Coherence (phi) score from the upstream constitutional layer
    pub coherence_score: f64,
    /// Ethical (beta) score from the upstream constitutional layer
    pub ethical_score: f64,
    /// Entropy surprise magnitude relative to the previous state
    pub surprise_magnitude: f64,
}

impl SubstrateState {
    /// Create a state with the given scores and defaults elsewhere.
    pub fn new(coherence_score: f64, ethical_score: f64, surprise_magnitude: f64) -> Self {
        Self {
            content_hash: String::new(),
            governance_vector: Vec::new(),
            context: SubstrateContext::default(),
            timestamp: Utc::now(),
            coherence_score,
            ethical_score,
            surprise_magnitude,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.context.domain = domain.into();
        self
    }

    pub fn with_context(mut self, context: SubstrateContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_content_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.content_hash = content_hash.into();
        self
    }

    pub fn with_governance_vector(mut self, governance_vector: Vec<f32>) -> Self {
        self.governance_vector = governance_vector;
        self
    }

    /// Number of agents represented by the governance vector.
    pub fn agent_count(&self) -> u64 {
        self.governance_vector.len() as u64
    }
}

/// A long-lived memory record owned by the registry.
///
/// Referenced by id everywhere else; fields other than `seal` are immutable
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: RecordId,
    pub tier: MemoryTier,
    pub domain: String,
    pub coherence_score: f64,
    pub ethical_score: f64,
    pub crisis_ratio: f64,
    pub latency_p99: f64,
    pub agent_count: u64,
    /// Causally preceding durable record, if any (lookup only, not ownership)
    pub parent_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    /// Write-once integrity hash, populated by the sealing worker
    pub seal: Option<String>,
    /// Admission pipeline latency, diagnostic only
    pub minting_latency_ms: f64,
}

impl MemoryRecord {
    /// Whether the integrity seal has been written.
    pub fn sealed(&self) -> bool {
        self.seal.is_some()
    }

    /// Canonical serialization used for seal computation.
    ///
    /// Field order is fixed by the struct definition, so equal records
    /// produce byte-identical output.
    pub fn canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Age of the record in fractional hours at `now`.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// Why an admission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "reason")]
pub enum RejectReason {
    /// Coherence or ethical score below the admission thresholds
    RejectedUnstable { coherence: f64, ethical: f64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RejectedUnstable { coherence, ethical } => {
                write!(f, "REJECTED_UNSTABLE(phi={:.3}, beta={:.3})", coherence, ethical)
            }
        }
    }
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AdmissionOutcome {
    /// Stored as INTEGRATED or ONTOLOGICAL
    Admitted { id: RecordId, tier: MemoryTier },
    /// Passed the stability filter but fell below the surprise threshold
    Ephemeral,
    /// Failed the stability filter; no record was created
    Rejected(RejectReason),
}

impl AdmissionOutcome {
    /// Whether a record was created in any tier.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    /// Id of the admitted record, if any.
    pub fn id(&self) -> Option<&RecordId> {
        match self {
            Self::Admitted { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Tier of the admitted record, if any.
    pub fn tier(&self) -> Option<MemoryTier> {
        match self {
            Self::Admitted { tier, .. } => Some(*tier),
            _ => None,
        }
    }
}

/// Counters maintained by the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Records admitted to any stored tier
    pub accepted: u64,
    /// States rejected by the stability filter
    pub rejected: u64,
    /// INTEGRATED records appended to the delta buffer
    pub deltas_minted: u64,
    /// Seals completed by the sealing worker
    pub sealed: u64,
    /// Active ONTOLOGICAL records
    pub registry_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_short() {
        let id = RecordId("MID-0123456789ABCDEF".to_string());
        assert_eq!(id.short(), "MID-01234567");
        assert_eq!(RecordId("MID".to_string()).short(), "MID");
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(MemoryTier::Ontological.to_string(), "ONTOLOGICAL");
        assert_eq!(MemoryTier::Episodic.to_string(), "EPISODIC");
    }

    #[test]
    fn test_state_builder() {
        let state = SubstrateState::new(0.9, 0.8, 0.5)
            .with_domain("physics")
            .with_governance_vector(vec![0.0; 128]);
        assert_eq!(state.context.domain, "physics");
        assert_eq!(state.agent_count(), 128);
    }

    #[test]
    fn test_outcome_helpers() {
        let admitted = AdmissionOutcome::Admitted {
            id: RecordId::from("MID-AAAA"),
            tier: MemoryTier::Ontological,
        };
        assert!(admitted.is_admitted());
        assert_eq!(admitted.tier(), Some(MemoryTier::Ontological));

        let rejected = AdmissionOutcome::Rejected(RejectReason::RejectedUnstable {
            coherence: 0.5,
            ethical: 0.9,
        });
        assert!(!rejected.is_admitted());
        assert_eq!(rejected.id(), None);
    }

    #[test]
    fn test_canonical_json_is_deterministic() {
        let record = MemoryRecord {
            id: RecordId::from("MID-1"),
            tier: MemoryTier::Ontological,
            domain: "physics".to_string(),
            coherence_score: 0.9,
            ethical_score: 0.8,
            crisis_ratio: 0.1,
            latency_p99: 3.5,
            agent_count: 10,
            parent_id: None,
            created_at: Utc::now(),
            seal: None,
            minting_latency_ms: 0.2,
        };
        assert_eq!(
            record.canonical_json().unwrap(),
            record.clone().canonical_json().unwrap()
        );
        assert!(!record.sealed());
    }
}
