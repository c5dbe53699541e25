//! Temporal decay parameters and priority classification.

use serde::{Deserialize, Serialize};

/// Modifier constants for the retention weight formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalWeightParams {
    /// Multiplier for records above the high-ethics threshold
    pub ethical_boost: f64,
    /// Multiplier for the mean similarity of latent links touching a record
    pub surprise_boost: f64,
    /// Permanence factor for sealed anchors (scaled by centrality and coherence)
    pub anchor_permanence: f64,
    /// Fraction of the bridge score added as bonus
    pub bridge_bonus_factor: f64,
    /// Flat bonus for an active cross-domain link
    pub active_link_bonus: f64,
    /// Bonus per hop of causal lineage
    pub causal_bonus_per_hop: f64,
}

impl Default for TemporalWeightParams {
    fn default() -> Self {
        Self {
            ethical_boost: 1.5,
            surprise_boost: 2.0,
            anchor_permanence: 0.3,
            bridge_bonus_factor: 0.25,
            active_link_bonus: 0.15,
            causal_bonus_per_hop: 0.1,
        }
    }
}

/// Controller for the decay rate lambda in `exp(-lambda * dt_hours)`.
///
/// Adjusted each maintenance tick from system load, ethical stability, and
/// link discovery rate, smoothed with an exponential moving average and
/// bounded to `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaController {
    min: f64,
    max: f64,
    current: f64,
}

impl LambdaController {
    pub fn new(min: f64, max: f64, baseline: f64) -> Self {
        Self {
            min,
            max,
            current: baseline.clamp(min, max),
        }
    }

    /// Current decay rate.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Adjust the decay rate from the current system signals.
    ///
    /// Inputs are expected in `[0, 1]`. `exploration` damps the rate so
    /// exploratory phases forget more slowly.
    pub fn adjust(
        &mut self,
        system_load: f64,
        ethical_stability: f64,
        discovery_rate: f64,
        exploration: bool,
    ) -> f64 {
        let adjustment =
            0.5 * system_load + 0.3 * (1.0 - ethical_stability) + 0.2 * discovery_rate;
        let mut proposed = self.current * (0.7 + 0.3 * adjustment);
        if exploration {
            proposed *= 0.6;
        }
        self.current = (0.8 * self.current + 0.2 * proposed).clamp(self.min, self.max);
        self.current
    }
}

/// Diagnostic priority class for a record.
///
/// Used for ordering and reporting only; the retention weight itself is
/// independent of the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionPriority {
    /// Candidate for pruning
    Noise,
    /// Less than an hour old, normal operations
    EphemeralContext,
    /// Less than five minutes old with a high crisis ratio
    RecentCrisis,
    /// High ethical score, less than a day old
    EthicalAnchor,
    /// Sealed with high retention weight
    AnchorMaster,
}

impl std::fmt::Display for RetentionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Noise => "NOISE",
            Self::EphemeralContext => "EPHEMERAL_CONTEXT",
            Self::RecentCrisis => "RECENT_CRISIS",
            Self::EthicalAnchor => "ETHICAL_ANCHOR",
            Self::AnchorMaster => "ANCHOR_MASTER",
        };
        write!(f, "{}", s)
    }
}

/// Classify a record's diagnostic priority.
pub fn classify_priority(
    sealed: bool,
    weight: f64,
    ethical_score: f64,
    crisis_ratio: f64,
    age_hours: f64,
    high_ethics_threshold: f64,
) -> RetentionPriority {
    if sealed && weight > 0.7 {
        RetentionPriority::AnchorMaster
    } else if ethical_score > high_ethics_threshold && age_hours < 24.0 {
        RetentionPriority::EthicalAnchor
    } else if age_hours < 0.083 && crisis_ratio > 0.5 {
        RetentionPriority::RecentCrisis
    } else if age_hours < 1.0 {
        RetentionPriority::EphemeralContext
    } else {
        RetentionPriority::Noise
    }
}
