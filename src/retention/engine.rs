//! Retention scoring, bridge tracking, and the eviction pass.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RetentionConfig;
use crate::graph::{CausalGraphNavigator, DomainPair, LatentLink, LatentLinkDiscoverer};
use crate::registry::{MemoryRecord, MemoryRegistry, RecordId};
use crate::retention::weight::{
    classify_priority, LambdaController, RetentionPriority, TemporalWeightParams,
};

/// Idle-decay rate for bridge recency, per day.
const BRIDGE_RECENCY_LAMBDA: f64 = 0.1;

/// Depth of the causal walk feeding the lineage bonus.
const CAUSAL_BONUS_DEPTH: usize = 10;

/// Bridge metadata tracked per record.
///
/// Updated in place with exponential smoothing; removed only when the
/// record itself is permanently purged from the shadow store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEdge {
    /// Unordered domain pairs this record bridges
    pub domain_pairs: BTreeSet<DomainPair>,
    /// Smoothed correlation strength, in [0, 1]
    pub correlation_strength: f64,
    /// Protective score fed back into retention weighting
    pub bridge_score: f64,
    /// Last discovery or protection touch
    pub last_touched: DateTime<Utc>,
}

impl BridgeEdge {
    pub(crate) fn new(pair: DomainPair, correlation: f64, now: DateTime<Utc>) -> Self {
        let mut domain_pairs = BTreeSet::new();
        domain_pairs.insert(pair);
        Self {
            domain_pairs,
            correlation_strength: correlation,
            bridge_score: 0.0,
            last_touched: now,
        }
    }

    /// Fold a new correlation observation into the edge.
    pub(crate) fn touch(&mut self, new_correlation: f64, now: DateTime<Utc>) {
        let idle_days = (now - self.last_touched).num_milliseconds() as f64 / 86_400_000.0;
        let recency = (-BRIDGE_RECENCY_LAMBDA * idle_days.max(0.0)).exp();
        self.correlation_strength =
            0.7 * self.correlation_strength + 0.3 * new_correlation;
        self.bridge_score =
            self.correlation_strength * recency * self.domain_pairs.len() as f64;
        self.last_touched = now;
    }
}

/// A record moved out of the active registry, retained for forensics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowEntry {
    pub record: MemoryRecord,
    pub moved_at: DateTime<Utc>,
    pub weight_at_eviction: f64,
}

/// Where a bridge's record currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeTier {
    Active,
    Shadow,
}

impl std::fmt::Display for BridgeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Shadow => write!(f, "shadow"),
        }
    }
}

/// One result of a cross-domain bridge query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeHit {
    pub id: RecordId,
    pub tier: BridgeTier,
    pub bridge_score: f64,
    pub correlation: f64,
}

/// Counters maintained by the retention engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionStats {
    /// Records moved to the shadow store
    pub evicted: u64,
    /// Eviction candidates skipped by bridge/ethics protection
    pub bridges_preserved: u64,
    /// Latent links folded into the bridge registry
    pub bridge_discoveries: u64,
    /// Shadow entries permanently purged
    pub shadow_purged: u64,
    /// Current shadow store size
    pub shadow_size: usize,
}

/// Decay-weighted retention scoring and eviction.
pub struct TemporalRetentionEngine {
    config: RetentionConfig,
    params: TemporalWeightParams,
    lambda: LambdaController,
    bridge_registry: HashMap<RecordId, BridgeEdge>,
    shadow: HashMap<RecordId, ShadowEntry>,
    weight_cache: HashMap<RecordId, f64>,
    priority_cache: HashMap<RecordId, RetentionPriority>,
    last_prune: Option<DateTime<Utc>>,
    evicted: u64,
    bridges_preserved: u64,
    bridge_discoveries: u64,
    shadow_purged: u64,
}

impl TemporalRetentionEngine {
    pub fn new(config: RetentionConfig) -> Self {
        let lambda =
            LambdaController::new(config.lambda_min, config.lambda_max, config.lambda_baseline);
        Self {
            config,
            params: TemporalWeightParams::default(),
            lambda,
            bridge_registry: HashMap::new(),
            shadow: HashMap::new(),
            weight_cache: HashMap::new(),
            priority_cache: HashMap::new(),
            last_prune: None,
            evicted: 0,
            bridges_preserved: 0,
            bridge_discoveries: 0,
            shadow_purged: 0,
        }
    }

    /// Compute the retention weight of an active record at `now`.
    ///
    /// `recency + permanence + surprise + ethical + bridge + causal`,
    /// clamped to `[0, 1]`. Unknown ids weigh 0. Correct whether or not the
    /// record has been sealed yet: an unsealed anchor simply contributes no
    /// permanence.
    pub fn compute_weight(
        &mut self,
        id: &RecordId,
        now: DateTime<Utc>,
        registry: &MemoryRegistry,
        graph: &CausalGraphNavigator,
        linker: &LatentLinkDiscoverer,
    ) -> f64 {
        let Some(record) = registry.get(id) else {
            return 0.0;
        };
        let age_hours = record.age_hours(now);

        let recency = (-self.lambda.current() * age_hours).exp();

        let permanence = if record.sealed() {
            self.params.anchor_permanence * graph.centrality(id) * record.coherence_score
        } else {
            0.0
        };

        let similarities = linker.similarities_touching(id);
        let surprise = if similarities.is_empty() {
            0.0
        } else {
            let mean = similarities.iter().sum::<f64>() / similarities.len() as f64;
            self.params.surprise_boost * mean
        };

        let ethical = if record.ethical_score > self.config.high_ethics_threshold {
            self.params.ethical_boost * record.ethical_score
        } else {
            0.0
        };

        let mut bridge_bonus = self
            .bridge_registry
            .get(id)
            .map(|edge| self.params.bridge_bonus_factor * edge.bridge_score)
            .unwrap_or(0.0);
        if linker.has_active_cross_domain_link(id, now, self.config.active_link_window_hours) {
            bridge_bonus += self.params.active_link_bonus;
        }

        let causal_depth = graph.find_causal_path(id, CAUSAL_BONUS_DEPTH).len();
        let causal_bonus = self.params.causal_bonus_per_hop * causal_depth as f64;

        let weight =
            (recency + permanence + surprise + ethical + bridge_bonus + causal_bonus).clamp(0.0, 1.0);

        self.weight_cache.insert(id.clone(), weight);
        self.priority_cache.insert(
            id.clone(),
            classify_priority(
                record.sealed(),
                weight,
                record.ethical_score,
                record.crisis_ratio,
                age_hours,
                self.config.high_ethics_threshold,
            ),
        );
        weight
    }

    /// Last computed weight for a record, if cached this tick.
    pub fn cached_weight(&self, id: &RecordId) -> Option<f64> {
        self.weight_cache.get(id).copied()
    }

    /// Last computed priority for a record, if cached this tick.
    pub fn cached_priority(&self, id: &RecordId) -> Option<RetentionPriority> {
        self.priority_cache.get(id).copied()
    }

    /// Fold a newly discovered latent link into the bridge registry.
    ///
    /// Both endpoints become (or update) tracked bridges for the link's
    /// domain pair.
    pub fn record_link(&mut self, link: &LatentLink, now: DateTime<Utc>) {
        for id in [&link.source, &link.target] {
            match self.bridge_registry.get_mut(id) {
                None => {
                    self.bridge_registry.insert(
                        id.clone(),
                        BridgeEdge::new(link.domain_pair.clone(), link.similarity, now),
                    );
                }
                Some(edge) => {
                    edge.domain_pairs.insert(link.domain_pair.clone());
                    edge.touch(link.similarity, now);
                }
            }
        }
        self.bridge_discoveries += 1;
    }

    /// Bridge score of a record, 0.0 if untracked.
    pub fn bridge_score(&self, id: &RecordId) -> f64 {
        self.bridge_registry.get(id).map(|e| e.bridge_score).unwrap_or(0.0)
    }

    /// Tracked bridge metadata for a record.
    pub fn bridge_edge(&self, id: &RecordId) -> Option<&BridgeEdge> {
        self.bridge_registry.get(id)
    }

    /// Raise a bridge's protective score, capped at 1.0.
    ///
    /// Returns `false` if the record is not a tracked bridge.
    pub fn protect_bridge(&mut self, id: &RecordId, boost: f64, now: DateTime<Utc>) -> bool {
        match self.bridge_registry.get_mut(id) {
            Some(edge) => {
                edge.bridge_score = (edge.bridge_score + boost).min(1.0);
                edge.last_touched = now;
                true
            }
            None => false,
        }
    }

    /// All bridges spanning the two given domains with sufficient
    /// correlation, sorted by bridge score descending.
    pub fn query_bridges(
        &self,
        registry: &MemoryRegistry,
        domain_a: &str,
        domain_b: &str,
        min_correlation: f64,
    ) -> Vec<BridgeHit> {
        let mut hits: Vec<BridgeHit> = self
            .bridge_registry
            .iter()
            .filter(|(_, edge)| {
                edge.correlation_strength >= min_correlation
                    && edge.domain_pairs.iter().any(|pair| pair.matches(domain_a, domain_b))
            })
            .map(|(id, edge)| BridgeHit {
                id: id.clone(),
                tier: if registry.contains(id) {
                    BridgeTier::Active
                } else {
                    BridgeTier::Shadow
                },
                bridge_score: edge.bridge_score,
                correlation: edge.correlation_strength,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.bridge_score
                .partial_cmp(&a.bridge_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }

    /// Run the eviction pass, at most once per cooldown.
    ///
    /// Candidates are the `target_reduction` fraction with the highest
    /// pruning priority score (the lowest retention weight after protection
    /// discounts). Candidates above the ethical or bridge protection floors
    /// are kept active and counted as bridges preserved. Returns the number
    /// of records actually moved to the shadow store.
    pub fn prune(
        &mut self,
        now: DateTime<Utc>,
        target_reduction: f64,
        registry: &mut MemoryRegistry,
        graph: &mut CausalGraphNavigator,
        linker: &mut LatentLinkDiscoverer,
    ) -> usize {
        if let Some(last) = self.last_prune {
            if (now - last).num_seconds() < self.config.prune_cooldown_secs {
                return 0;
            }
        }

        struct Candidate {
            id: RecordId,
            weight: f64,
            score: f64,
            ethical_score: f64,
            bridge_score: f64,
            is_bridge: bool,
            created_at: DateTime<Utc>,
        }

        let ids = registry.active_ids();
        let total = ids.len();
        let mut candidates: Vec<Candidate> = Vec::with_capacity(total);
        for id in ids {
            let weight = self.compute_weight(&id, now, registry, graph, linker);
            let Some(record) = registry.get(&id) else { continue };
            let is_bridge = self.bridge_registry.contains_key(&id);
            let bridge_score = self.bridge_score(&id);

            let score = pruning_priority_score(
                weight,
                is_bridge.then_some(bridge_score),
                record.ethical_score > self.config.prune_protect_ethical_floor,
                linker.has_active_cross_domain_link(
                    &id,
                    now,
                    self.config.active_link_window_hours,
                ),
            );
            candidates.push(Candidate {
                id,
                weight,
                score,
                ethical_score: record.ethical_score,
                bridge_score,
                is_bridge,
                created_at: record.created_at,
            });
        }

        // Highest pruning score first; ties fall to the older record, then
        // to the id for full determinism
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let target_keep = (total as f64 * (1.0 - target_reduction)) as usize;
        let candidate_count = total.saturating_sub(target_keep);

        let mut pruned = 0;
        for candidate in candidates.into_iter().take(candidate_count) {
            let protected = candidate.ethical_score > self.config.prune_protect_ethical_floor
                || (candidate.is_bridge
                    && candidate.bridge_score > self.config.prune_protect_bridge_floor);
            if protected {
                self.bridges_preserved += 1;
                debug!(id = %candidate.id.short(), "eviction candidate preserved");
                continue;
            }
            self.move_to_shadow(&candidate.id, candidate.weight, now, registry, graph, linker);
            pruned += 1;
        }

        self.last_prune = Some(now);
        info!(pruned, total, "eviction pass complete");
        pruned
    }

    fn move_to_shadow(
        &mut self,
        id: &RecordId,
        weight: f64,
        now: DateTime<Utc>,
        registry: &mut MemoryRegistry,
        graph: &mut CausalGraphNavigator,
        linker: &mut LatentLinkDiscoverer,
    ) {
        let Some(record) = registry.remove(id) else {
            return;
        };
        self.shadow.insert(
            id.clone(),
            ShadowEntry {
                record,
                moved_at: now,
                weight_at_eviction: weight,
            },
        );
        graph.remove(id);
        linker.remove(id);
        self.weight_cache.remove(id);
        self.priority_cache.remove(id);
        self.evicted += 1;
        debug!(id = %id.short(), weight, "record moved to shadow");
    }

    /// Whether a record currently sits in the shadow store.
    pub fn is_shadowed(&self, id: &RecordId) -> bool {
        self.shadow.contains_key(id)
    }

    /// Shadow entry for a record, if present.
    pub fn shadow_entry(&self, id: &RecordId) -> Option<&ShadowEntry> {
        self.shadow.get(id)
    }

    /// Permanently purge shadow entries past the retention window.
    ///
    /// Bridge edges of purged records are removed with them; this is the
    /// only path that deletes bridge registry entries.
    pub fn purge_shadow(&mut self, now: DateTime<Utc>) -> usize {
        let retention = chrono::Duration::days(self.config.shadow_retention_days);
        let expired: Vec<RecordId> = self
            .shadow
            .iter()
            .filter(|(_, entry)| now - entry.moved_at > retention)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.shadow.remove(id);
            self.bridge_registry.remove(id);
            debug!(id = %id.short(), "shadow entry purged");
        }
        self.shadow_purged += expired.len() as u64;
        expired.len()
    }

    /// Adjust the decay rate from current system signals.
    pub fn adjust_lambda(
        &mut self,
        system_load: f64,
        ethical_stability: f64,
        discovery_rate: f64,
        exploration: bool,
    ) -> f64 {
        self.lambda
            .adjust(system_load, ethical_stability, discovery_rate, exploration)
    }

    /// Current decay rate.
    pub fn lambda(&self) -> f64 {
        self.lambda.current()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> RetentionStats {
        RetentionStats {
            evicted: self.evicted,
            bridges_preserved: self.bridges_preserved,
            bridge_discoveries: self.bridge_discoveries,
            shadow_purged: self.shadow_purged,
            shadow_size: self.shadow.len(),
        }
    }
}

/// Pruning priority score for one eviction candidate.
///
/// `1 - weight`, discounted for tracked bridges, high ethical scores, and
/// active cross-domain links; floored at zero. Lower scores survive.
pub(crate) fn pruning_priority_score(
    weight: f64,
    bridge_score: Option<f64>,
    ethically_protected: bool,
    actively_linked: bool,
) -> f64 {
    let mut score = 1.0 - weight;
    if let Some(bridge_score) = bridge_score {
        score -= 0.5 * bridge_score;
    }
    if ethically_protected {
        score -= 0.3;
    }
    if actively_linked {
        score -= 0.2;
    }
    score.max(0.0)
}
