//! Configuration for the memory store components.
//!
//! All thresholds are named, overridable fields rather than hard-coded
//! constants. Two stability knobs exist on purpose: the admission thresholds
//! on [`RegistryConfig`] and the separate forensic drift floor on
//! [`ForensicsConfig`] are tuned independently.

use serde::{Deserialize, Serialize};

/// Admission and sealing configuration for the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Minimum coherence score (phi) for admission
    pub phi_threshold: f64,
    /// Minimum ethical score (beta) for admission
    pub beta_threshold: f64,
    /// Surprise magnitude below which a state is classified ephemeral
    pub surprise_threshold: f64,
    /// Surprise magnitude above which a record is promoted to the durable tier
    pub high_surprise_threshold: f64,
    /// Capacity of the bounded short-term delta buffer (FIFO eviction)
    pub delta_buffer_capacity: usize,
    /// Seed keying both record identity and integrity seals
    pub origin_seed: String,
    /// Simulated per-item sealing latency in milliseconds
    pub sealing_latency_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            phi_threshold: 0.72,
            beta_threshold: 0.65,
            surprise_threshold: 0.15,
            high_surprise_threshold: 0.85,
            delta_buffer_capacity: 10_000,
            origin_seed: "ontomem-dev-seed".to_string(),
            sealing_latency_ms: 47,
        }
    }
}

impl RegistryConfig {
    /// Config with a specific origin seed.
    pub fn with_seed(seed: impl Into<String>) -> Self {
        Self {
            origin_seed: seed.into(),
            ..Self::default()
        }
    }
}

/// Retention scoring and eviction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Lower bound for the decay rate lambda
    pub lambda_min: f64,
    /// Upper bound for the decay rate lambda
    pub lambda_max: f64,
    /// Initial decay rate
    pub lambda_baseline: f64,
    /// Ethical score above which the ethical boost applies
    pub high_ethics_threshold: f64,
    /// Window within which a cross-domain link counts as active, in hours
    pub active_link_window_hours: f64,
    /// Minimum seconds between eviction passes
    pub prune_cooldown_secs: i64,
    /// Days a shadow entry is retained before permanent purge
    pub shadow_retention_days: i64,
    /// Eviction candidates above this ethical score are kept active
    pub prune_protect_ethical_floor: f64,
    /// Eviction candidates above this bridge score are kept active
    pub prune_protect_bridge_floor: f64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            lambda_min: 0.01,
            lambda_max: 0.2,
            lambda_baseline: 0.05,
            high_ethics_threshold: 0.75,
            active_link_window_hours: 24.0,
            prune_cooldown_secs: 3600,
            shadow_retention_days: 14,
            prune_protect_ethical_floor: 0.7,
            prune_protect_bridge_floor: 0.5,
        }
    }
}

/// Latent link discovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Number of nearest neighbors considered per query
    pub k_neighbors: usize,
    /// Minimum cosine similarity for a link to be created
    pub similarity_threshold: f64,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            similarity_threshold: 0.65,
        }
    }
}

/// Critical bridge monitoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// First domain of the monitored bridge pair
    pub domain_a: String,
    /// Second domain of the monitored bridge pair
    pub domain_b: String,
    /// Minimum correlation strength for a bridge to be scanned
    pub min_correlation: f64,
    /// Risk above which a bridge is flagged as at-risk
    pub risk_flag_threshold: f64,
    /// Risk above which a protective boost is applied
    pub protect_threshold: f64,
    /// Bridge score boost applied to protected bridges (capped at 1.0)
    pub protection_boost: f64,
    /// Hours after discovery during which a bridge is considered young
    pub discovery_grace_hours: f64,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            domain_a: "physics".to_string(),
            domain_b: "governance".to_string(),
            min_correlation: 0.6,
            risk_flag_threshold: 0.5,
            protect_threshold: 0.7,
            protection_boost: 0.3,
            discovery_grace_hours: 48.0,
        }
    }
}

/// Forensic investigation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicsConfig {
    /// Latency p99 above which a chain entry is flagged as a physical anomaly
    pub latency_anomaly_threshold: f64,
    /// Ethical score below which a chain entry is flagged as a violation
    pub drift_ethical_floor: f64,
    /// Similarity floor for latent correlations surfaced by an investigation
    pub correlation_min_similarity: f64,
    /// Maximum affected descendants reported
    pub descendant_limit: usize,
}

impl Default for ForensicsConfig {
    fn default() -> Self {
        Self {
            latency_anomaly_threshold: 8.0,
            drift_ethical_floor: 0.65,
            correlation_min_similarity: 0.80,
            descendant_limit: 10,
        }
    }
}

/// Aggregate configuration for a full memory system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub registry: RegistryConfig,
    pub retention: RetentionConfig,
    pub linker: LinkerConfig,
    pub sentinel: SentinelConfig,
    pub forensics: ForensicsConfig,
}

impl MemoryConfig {
    /// Aggregate config with a specific origin seed.
    pub fn with_seed(seed: impl Into<String>) -> Self {
        Self {
            registry: RegistryConfig::with_seed(seed),
            ..Self::default()
        }
    }
}
