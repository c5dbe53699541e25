//! Critical bridge monitoring between two domains of interest.
//!
//! The sentinel scans tracked bridges spanning the configured domain pair,
//! classifies each record's physics signature and governance impact,
//! estimates the risk of imminent eviction for bridges with a critical
//! signature, and raises the protective bridge score of those most at
//! risk. The boost feeds back into the retention engine's bridge bonus on
//! the next scoring pass.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SentinelConfig;
use crate::graph::{CausalGraphNavigator, LatentLinkDiscoverer};
use crate::registry::{MemoryRecord, MemoryRegistry, RecordId};
use crate::retention::engine::TemporalRetentionEngine;

/// Physics-side signature classes observed on bridge records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicsSignature {
    HighVelocityVariance,
    CollisionCascade,
    NetworkLagSpike,
    Fp16PrecisionLoss,
    Unknown,
}

impl PhysicsSignature {
    /// Whether the signature is in the critical set warranting tracking.
    pub fn is_critical(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for PhysicsSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HighVelocityVariance => "high_velocity_variance",
            Self::CollisionCascade => "collision_cascade",
            Self::NetworkLagSpike => "network_lag_spike",
            Self::Fp16PrecisionLoss => "fp16_precision_loss",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Governance-side impact classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceImpact {
    AttentionInstability,
    CascadeFailureEconomic,
    ProductivityDrop,
    ResourceAllocationError,
}

impl std::fmt::Display for GovernanceImpact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AttentionInstability => "attention_instability",
            Self::CascadeFailureEconomic => "cascade_failure_economic",
            Self::ProductivityDrop => "productivity_drop",
            Self::ResourceAllocationError => "resource_allocation_error",
        };
        write!(f, "{}", s)
    }
}

/// A bridge deemed critical for cross-domain reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalBridge {
    pub id: RecordId,
    pub signature: PhysicsSignature,
    pub impact: GovernanceImpact,
    pub discovered_at: DateTime<Utc>,
    pub correlation_strength: f64,
    pub pruning_risk: f64,
}

/// Counters maintained by the sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentinelStats {
    /// Critical bridges tracked since startup
    pub critical_bridges_found: u64,
    /// Bridges flagged at the last risk assessment
    pub at_risk_bridges: usize,
    /// Protective boosts applied
    pub prunes_prevented: u64,
}

/// Monitor for eviction risk on critical cross-domain bridges.
pub struct BridgeSentinel {
    config: SentinelConfig,
    critical: HashMap<RecordId, CriticalBridge>,
    stats: SentinelStats,
}

impl BridgeSentinel {
    pub fn new(config: SentinelConfig) -> Self {
        Self {
            config,
            critical: HashMap::new(),
            stats: SentinelStats::default(),
        }
    }

    /// Classify the physics signature of a bridge record.
    ///
    /// Only records from the monitored physics-side domain carry a known
    /// signature; everything else is `Unknown`.
    pub fn classify_signature(&self, record: &MemoryRecord) -> PhysicsSignature {
        if record.domain != self.config.domain_a {
            return PhysicsSignature::Unknown;
        }
        if record.latency_p99 > 9.0 {
            PhysicsSignature::NetworkLagSpike
        } else {
            PhysicsSignature::HighVelocityVariance
        }
    }

    /// Classify the governance-side impact of a bridge record.
    pub fn classify_impact(&self, record: &MemoryRecord) -> GovernanceImpact {
        if record.crisis_ratio > 0.8 {
            GovernanceImpact::CascadeFailureEconomic
        } else {
            GovernanceImpact::AttentionInstability
        }
    }

    /// Scan for new critical bridges between the monitored domains.
    ///
    /// Returns only bridges first tracked by this call.
    pub fn scan(
        &mut self,
        now: DateTime<Utc>,
        registry: &MemoryRegistry,
        engine: &TemporalRetentionEngine,
    ) -> Vec<CriticalBridge> {
        let hits = engine.query_bridges(
            registry,
            &self.config.domain_a,
            &self.config.domain_b,
            self.config.min_correlation,
        );

        let mut new_critical = Vec::new();
        for hit in hits {
            if self.critical.contains_key(&hit.id) {
                continue;
            }
            let record = registry
                .get(&hit.id)
                .or_else(|| engine.shadow_entry(&hit.id).map(|entry| entry.record.clone()));
            let Some(record) = record else { continue };

            let signature = self.classify_signature(&record);
            if !signature.is_critical() {
                continue;
            }
            let bridge = CriticalBridge {
                id: hit.id.clone(),
                signature,
                impact: self.classify_impact(&record),
                discovered_at: now,
                correlation_strength: hit.correlation,
                pruning_risk: 0.0,
            };
            debug!(id = %bridge.id.short(), signature = %signature, "critical bridge tracked");
            self.critical.insert(hit.id, bridge.clone());
            new_critical.push(bridge);
        }
        self.stats.critical_bridges_found += new_critical.len() as u64;
        new_critical
    }

    /// Estimate eviction risk for every tracked critical bridge.
    ///
    /// `risk = 0.4·weight_deficit + 0.3·shadow_term + 0.2·youth_term`;
    /// bridges above the flag threshold are returned with their risk.
    pub fn assess_risk(
        &mut self,
        now: DateTime<Utc>,
        registry: &MemoryRegistry,
        engine: &mut TemporalRetentionEngine,
        graph: &CausalGraphNavigator,
        linker: &LatentLinkDiscoverer,
    ) -> Vec<(RecordId, f64)> {
        let mut at_risk = Vec::new();
        let mut ids: Vec<RecordId> = self.critical.keys().cloned().collect();
        ids.sort();

        for id in ids {
            let weight = engine.compute_weight(&id, now, registry, graph, linker);
            let shadowed = engine.is_shadowed(&id);
            let Some(bridge) = self.critical.get_mut(&id) else {
                continue;
            };
            let hours_since_discovery =
                (now - bridge.discovered_at).num_milliseconds() as f64 / 3_600_000.0;

            let weight_deficit = (0.4 - weight).max(0.0) / 0.4;
            let shadow_term = if shadowed { 0.3 } else { 0.0 };
            let youth_term =
                1.0 - (hours_since_discovery / self.config.discovery_grace_hours).min(1.0);
            let risk = 0.4 * weight_deficit + 0.3 * shadow_term + 0.2 * youth_term;

            bridge.pruning_risk = risk;
            if risk > self.config.risk_flag_threshold {
                at_risk.push((id, risk));
            }
        }
        self.stats.at_risk_bridges = at_risk.len();
        at_risk
    }

    /// Apply protective boosts to the most at-risk bridges.
    ///
    /// Returns the number of boosts applied.
    pub fn protect(
        &mut self,
        at_risk: &[(RecordId, f64)],
        engine: &mut TemporalRetentionEngine,
        now: DateTime<Utc>,
    ) -> usize {
        let mut protected = 0;
        for (id, risk) in at_risk {
            if *risk <= self.config.protect_threshold {
                continue;
            }
            if engine.protect_bridge(id, self.config.protection_boost, now) {
                self.stats.prunes_prevented += 1;
                protected += 1;
                info!(id = %id.short(), risk, "protective boost applied");
            }
        }
        protected
    }

    /// Tracked critical bridge for a record, if any.
    pub fn critical_bridge(&self, id: &RecordId) -> Option<&CriticalBridge> {
        self.critical.get(id)
    }

    /// Number of tracked critical bridges.
    pub fn tracked(&self) -> usize {
        self.critical.len()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> &SentinelStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::config::{LinkerConfig, RegistryConfig, RetentionConfig};
    use crate::graph::{DomainPair, LatentLink};
    use crate::registry::SubstrateState;

    struct Fixture {
        registry: MemoryRegistry,
        graph: CausalGraphNavigator,
        linker: LatentLinkDiscoverer,
        engine: TemporalRetentionEngine,
        sentinel: BridgeSentinel,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn new(config: SentinelConfig) -> Self {
            Self {
                registry: MemoryRegistry::new(RegistryConfig::default()),
                graph: CausalGraphNavigator::new(),
                linker: LatentLinkDiscoverer::new(LinkerConfig::default()),
                engine: TemporalRetentionEngine::new(RetentionConfig::default()),
                sentinel: BridgeSentinel::new(config),
                now: Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap(),
            }
        }

        fn admit(&mut self, age_hours: i64, domain: &str, latency: f64, crisis: f64) -> RecordId {
            let state = SubstrateState::new(0.9, 0.66, 0.9)
                .with_context(
                    crate::registry::SubstrateContext::new(domain)
                        .with_latency_p99(latency)
                        .with_crisis_ratio(crisis),
                )
                .with_timestamp(self.now - Duration::hours(age_hours));
            let outcome = self.registry.admit(&state, false).unwrap();
            let id = outcome.id().unwrap().clone();
            let record = self.registry.get(&id).unwrap();
            self.graph.insert(&record);
            id
        }

        /// Link two records so both become tracked bridges.
        ///
        /// A single discovery leaves the bridge score at zero while the
        /// correlation carries the similarity, which is the state a freshly
        /// found bridge is in.
        fn bridge(&mut self, a: &RecordId, b: &RecordId, pair: DomainPair, similarity: f64) {
            let link = LatentLink {
                source: a.clone(),
                target: b.clone(),
                similarity,
                domain_pair: pair,
                discovered_at: self.now,
            };
            self.engine.record_link(&link, self.now);
        }
    }

    #[test]
    fn test_signature_classification() {
        let fx = Fixture::new(SentinelConfig::default());
        let mut record = crate::registry::MemoryRecord {
            id: RecordId::from("MID-A"),
            tier: crate::registry::MemoryTier::Ontological,
            domain: "physics".to_string(),
            coherence_score: 0.9,
            ethical_score: 0.66,
            crisis_ratio: 0.1,
            latency_p99: 3.0,
            agent_count: 10,
            parent_id: None,
            created_at: fx.now,
            seal: None,
            minting_latency_ms: 0.1,
        };

        assert_eq!(
            fx.sentinel.classify_signature(&record),
            PhysicsSignature::HighVelocityVariance
        );
        record.latency_p99 = 9.5;
        assert_eq!(
            fx.sentinel.classify_signature(&record),
            PhysicsSignature::NetworkLagSpike
        );
        record.domain = "social".to_string();
        assert_eq!(fx.sentinel.classify_signature(&record), PhysicsSignature::Unknown);

        assert_eq!(fx.sentinel.classify_impact(&record), GovernanceImpact::AttentionInstability);
        record.crisis_ratio = 0.9;
        assert_eq!(
            fx.sentinel.classify_impact(&record),
            GovernanceImpact::CascadeFailureEconomic
        );
    }

    #[test]
    fn test_scan_tracks_only_critical_signatures() {
        let mut fx = Fixture::new(SentinelConfig::default());
        let physics = fx.admit(1, "physics", 9.5, 0.9);
        let governance = fx.admit(2, "governance", 5.0, 0.1);
        fx.bridge(&physics, &governance, DomainPair::new("physics", "governance"), 0.9);

        let found = fx.sentinel.scan(fx.now, &fx.registry, &fx.engine);

        // Both endpoints bridge the pair, but only the physics-side record
        // carries a known signature
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, physics);
        assert_eq!(found[0].signature, PhysicsSignature::NetworkLagSpike);
        assert_eq!(found[0].impact, GovernanceImpact::CascadeFailureEconomic);
        assert_eq!(fx.sentinel.tracked(), 1);

        // Re-scan discovers nothing new
        assert!(fx.sentinel.scan(fx.now, &fx.registry, &fx.engine).is_empty());
        assert_eq!(fx.sentinel.stats().critical_bridges_found, 1);
    }

    #[test]
    fn test_assess_risk_flags_light_young_bridges() {
        let mut fx = Fixture::new(SentinelConfig::default());
        // Old enough that recency has fully decayed
        let physics = fx.admit(500, "physics", 5.0, 0.1);
        let governance = fx.admit(400, "governance", 5.0, 0.1);
        fx.bridge(&physics, &governance, DomainPair::new("physics", "governance"), 0.7);
        fx.sentinel.scan(fx.now, &fx.registry, &fx.engine);

        let at_risk = fx.sentinel.assess_risk(
            fx.now,
            &fx.registry,
            &mut fx.engine,
            &fx.graph,
            &fx.linker,
        );

        // Freshly discovered and nearly weightless: flagged
        assert_eq!(at_risk.len(), 1);
        assert_eq!(at_risk[0].0, physics);
        assert!(at_risk[0].1 > 0.5);
        assert!(fx.sentinel.critical_bridge(&physics).unwrap().pruning_risk > 0.5);

        // Two days later the youth term has expired and the risk drops
        let later = fx.now + Duration::hours(60);
        let at_risk = fx.sentinel.assess_risk(
            later,
            &fx.registry,
            &mut fx.engine,
            &fx.graph,
            &fx.linker,
        );
        assert!(at_risk.is_empty());
        assert_eq!(fx.sentinel.stats().at_risk_bridges, 0);
    }

    #[test]
    fn test_protect_boosts_bridge_score() {
        // Lowered protection threshold so the boost path is reachable
        let config = SentinelConfig {
            protect_threshold: 0.55,
            ..SentinelConfig::default()
        };
        let mut fx = Fixture::new(config);
        let physics = fx.admit(500, "physics", 5.0, 0.1);
        let governance = fx.admit(400, "governance", 5.0, 0.1);
        fx.bridge(&physics, &governance, DomainPair::new("physics", "governance"), 0.7);
        fx.sentinel.scan(fx.now, &fx.registry, &fx.engine);

        let before = fx.engine.bridge_score(&physics);
        let at_risk = fx.sentinel.assess_risk(
            fx.now,
            &fx.registry,
            &mut fx.engine,
            &fx.graph,
            &fx.linker,
        );
        let protected = fx.sentinel.protect(&at_risk, &mut fx.engine, fx.now);

        assert_eq!(protected, 1);
        assert!(fx.engine.bridge_score(&physics) > before);
        assert!(fx.engine.bridge_score(&physics) <= 1.0);
        assert_eq!(fx.sentinel.stats().prunes_prevented, 1);
    }

    #[test]
    fn test_default_protect_threshold_is_conservative() {
        // With the default 0.7 threshold the maximum attainable risk
        // (0.4 + 0.09 + 0.2) stays below the protection trigger; flagging
        // still works
        let mut fx = Fixture::new(SentinelConfig::default());
        let physics = fx.admit(500, "physics", 5.0, 0.1);
        let governance = fx.admit(400, "governance", 5.0, 0.1);
        fx.bridge(&physics, &governance, DomainPair::new("physics", "governance"), 0.7);
        fx.sentinel.scan(fx.now, &fx.registry, &fx.engine);

        let at_risk = fx.sentinel.assess_risk(
            fx.now,
            &fx.registry,
            &mut fx.engine,
            &fx.graph,
            &fx.linker,
        );
        assert!(!at_risk.is_empty());
        let protected = fx.sentinel.protect(&at_risk, &mut fx.engine, fx.now);
        assert_eq!(protected, 0);
    }
}
