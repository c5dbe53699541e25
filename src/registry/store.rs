//! Active record registry and admission pipeline.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::registry::identity::IdentityHasher;
use crate::registry::types::{
    AdmissionOutcome, MemoryRecord, MemoryTier, RecordId, RegistryStats, RejectReason,
    SubstrateState,
};

/// Shared handle to the active record arena.
///
/// The registry is the single logical writer; the sealing worker holds a
/// clone only to write seals back without blocking admission.
pub type SharedRecords = Arc<RwLock<HashMap<RecordId, MemoryRecord>>>;

/// Owner of the active (durable) records and the bounded delta buffer.
pub struct MemoryRegistry {
    config: RegistryConfig,
    identity: IdentityHasher,
    active: SharedRecords,
    delta_buffer: VecDeque<MemoryRecord>,
    admission_order: Vec<RecordId>,
    last_ontological: Option<RecordId>,
    accepted: u64,
    rejected: u64,
    deltas_minted: u64,
    sealed: Arc<AtomicU64>,
}

impl MemoryRegistry {
    /// Create a registry from its configuration.
    pub fn new(config: RegistryConfig) -> Self {
        let identity = IdentityHasher::new(&config.origin_seed);
        Self {
            config,
            identity,
            active: Arc::new(RwLock::new(HashMap::new())),
            delta_buffer: VecDeque::new(),
            admission_order: Vec::new(),
            last_ontological: None,
            accepted: 0,
            rejected: 0,
            deltas_minted: 0,
            sealed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Apply the admission pipeline to a substrate state.
    ///
    /// Ordering: stability filter, surprise filter, identity assignment,
    /// tier classification, storage. Never blocks on sealing; the caller is
    /// responsible for graph insertion and seal enqueueing of ONTOLOGICAL
    /// admissions.
    pub fn admit(&mut self, state: &SubstrateState, force_durable: bool) -> Result<AdmissionOutcome> {
        let start = Instant::now();

        // 1. Stability filter
        if state.coherence_score < self.config.phi_threshold
            || state.ethical_score < self.config.beta_threshold
        {
            self.rejected += 1;
            debug!(
                phi = state.coherence_score,
                beta = state.ethical_score,
                "admission rejected: below stability thresholds"
            );
            return Ok(AdmissionOutcome::Rejected(RejectReason::RejectedUnstable {
                coherence: state.coherence_score,
                ethical: state.ethical_score,
            }));
        }

        // 2. Surprise filter
        if !force_durable && state.surprise_magnitude < self.config.surprise_threshold {
            return Ok(AdmissionOutcome::Ephemeral);
        }

        // 3. Deterministic identity
        let id = self
            .identity
            .record_id(state.coherence_score, state.ethical_score, state.timestamp)?;

        // 4. Tier classification
        let tier = if force_durable || state.surprise_magnitude > self.config.high_surprise_threshold
        {
            MemoryTier::Ontological
        } else {
            MemoryTier::Integrated
        };

        let parent_id = match tier {
            MemoryTier::Ontological => self.last_ontological.clone(),
            _ => None,
        };

        let record = MemoryRecord {
            id: id.clone(),
            tier,
            domain: state.context.domain.clone(),
            coherence_score: state.coherence_score,
            ethical_score: state.ethical_score,
            crisis_ratio: state.context.crisis_ratio,
            latency_p99: state.context.latency_p99,
            agent_count: state.agent_count(),
            parent_id,
            created_at: state.timestamp,
            seal: None,
            minting_latency_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        // 5. Storage
        match tier {
            MemoryTier::Ontological => {
                let mut active = self.active.write().unwrap();
                if let Some(existing) = active.get(&id) {
                    // Idempotent identity: identical quantized inputs land on
                    // the same record. Differing content under the same id is
                    // a programming error and must not overwrite.
                    if same_content(existing, &record) {
                        return Ok(AdmissionOutcome::Admitted { id, tier });
                    }
                    return Err(Error::duplicate_record(id.0));
                }
                active.insert(id.clone(), record);
                drop(active);
                self.admission_order.push(id.clone());
                self.last_ontological = Some(id.clone());
                self.accepted += 1;
                info!(id = %id.short(), %tier, "record admitted");
            }
            MemoryTier::Integrated => {
                if self.delta_buffer.len() >= self.config.delta_buffer_capacity {
                    self.delta_buffer.pop_front();
                }
                self.delta_buffer.push_back(record);
                self.accepted += 1;
                self.deltas_minted += 1;
                debug!(id = %id.short(), "delta minted");
            }
            MemoryTier::Episodic => unreachable!("episodic states are never stored"),
        }

        Ok(AdmissionOutcome::Admitted { id, tier })
    }

    /// Clone of the active record with the given id.
    pub fn get(&self, id: &RecordId) -> Option<MemoryRecord> {
        self.active.read().unwrap().get(id).cloned()
    }

    /// Whether an active record with the given id exists.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.active.read().unwrap().contains_key(id)
    }

    /// Remove a record from the active arena (eviction path).
    ///
    /// Keeps the parent pointer on a live record: children admitted after
    /// an eviction must chain to the most recent surviving ONTOLOGICAL id,
    /// never to one that left the graph.
    pub fn remove(&mut self, id: &RecordId) -> Option<MemoryRecord> {
        let removed = self.active.write().unwrap().remove(id);
        if removed.is_some() && self.last_ontological.as_ref() == Some(id) {
            let active = self.active.read().unwrap();
            self.last_ontological = self
                .admission_order
                .iter()
                .rev()
                .find(|candidate| active.contains_key(*candidate))
                .cloned();
        }
        removed
    }

    /// Ids of all active records, in unspecified order.
    pub fn active_ids(&self) -> Vec<RecordId> {
        self.active.read().unwrap().keys().cloned().collect()
    }

    /// Number of active records.
    pub fn len(&self) -> usize {
        self.active.read().unwrap().len()
    }

    /// Whether the active arena is empty.
    pub fn is_empty(&self) -> bool {
        self.active.read().unwrap().is_empty()
    }

    /// Most recently admitted ONTOLOGICAL id.
    pub fn last_ontological(&self) -> Option<&RecordId> {
        self.last_ontological.as_ref()
    }

    /// Contents of the short-term delta buffer, oldest first.
    pub fn delta_buffer(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.delta_buffer.iter()
    }

    /// Shared handle for the sealing worker.
    pub fn shared_records(&self) -> SharedRecords {
        Arc::clone(&self.active)
    }

    /// Shared seal-completion counter for the sealing worker.
    pub fn sealed_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.sealed)
    }

    /// Registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Counter snapshot.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            accepted: self.accepted,
            rejected: self.rejected,
            deltas_minted: self.deltas_minted,
            sealed: self.sealed.load(Ordering::Relaxed),
            registry_size: self.len(),
        }
    }
}

/// Equality over the immutable content fields (seal and minting latency are
/// process artifacts, not content).
fn same_content(a: &MemoryRecord, b: &MemoryRecord) -> bool {
    a.tier == b.tier
        && a.domain == b.domain
        && a.coherence_score == b.coherence_score
        && a.ethical_score == b.ethical_score
        && a.crisis_ratio == b.crisis_ratio
        && a.latency_p99 == b.latency_p99
        && a.agent_count == b.agent_count
        && a.created_at == b.created_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn registry() -> MemoryRegistry {
        MemoryRegistry::new(RegistryConfig::default())
    }

    fn stable_state(surprise: f64) -> SubstrateState {
        SubstrateState::new(0.9, 0.9, surprise)
            .with_timestamp(Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_unstable_state_is_rejected() {
        let mut registry = registry();
        let outcome = registry
            .admit(&SubstrateState::new(0.5, 0.9, 0.9), false)
            .unwrap();
        assert!(matches!(
            outcome,
            AdmissionOutcome::Rejected(RejectReason::RejectedUnstable { .. })
        ));
        assert_eq!(registry.stats().rejected, 1);
        assert_eq!(registry.stats().registry_size, 0);
    }

    #[test]
    fn test_low_ethical_is_rejected() {
        let mut registry = registry();
        let outcome = registry
            .admit(&SubstrateState::new(0.9, 0.5, 0.9), false)
            .unwrap();
        assert!(!outcome.is_admitted());
        assert_eq!(registry.stats().rejected, 1);
    }

    #[test]
    fn test_low_surprise_is_ephemeral() {
        let mut registry = registry();
        let outcome = registry.admit(&stable_state(0.05), false).unwrap();
        assert_eq!(outcome, AdmissionOutcome::Ephemeral);
        assert_eq!(registry.stats().accepted, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_high_surprise_is_ontological() {
        let mut registry = registry();
        let outcome = registry.admit(&stable_state(0.9), false).unwrap();
        assert_eq!(outcome.tier(), Some(MemoryTier::Ontological));
        assert_eq!(registry.len(), 1);

        let id = outcome.id().unwrap();
        let record = registry.get(id).unwrap();
        assert_eq!(record.parent_id, None);
        assert!(!record.sealed());
    }

    #[test]
    fn test_moderate_surprise_is_integrated() {
        let mut registry = registry();
        let outcome = registry.admit(&stable_state(0.5), false).unwrap();
        assert_eq!(outcome.tier(), Some(MemoryTier::Integrated));
        // Delta buffer only; the active arena stays empty
        assert!(registry.is_empty());
        assert_eq!(registry.stats().deltas_minted, 1);
        assert_eq!(registry.delta_buffer().count(), 1);
    }

    #[test]
    fn test_force_durable_overrides_surprise() {
        let mut registry = registry();
        let outcome = registry.admit(&stable_state(0.01), true).unwrap();
        assert_eq!(outcome.tier(), Some(MemoryTier::Ontological));
    }

    #[test]
    fn test_parent_chain() {
        let mut registry = registry();
        let first = registry.admit(&stable_state(0.9), false).unwrap();
        let second = registry
            .admit(
                &stable_state(0.9).with_timestamp(Utc.with_ymd_and_hms(2026, 1, 24, 13, 0, 0).unwrap()),
                false,
            )
            .unwrap();

        let second_record = registry.get(second.id().unwrap()).unwrap();
        assert_eq!(second_record.parent_id.as_ref(), first.id());
        assert_eq!(registry.last_ontological(), second.id());
    }

    #[test]
    fn test_identical_admission_is_idempotent() {
        let mut registry = registry();
        let first = registry.admit(&stable_state(0.9), false).unwrap();
        let second = registry.admit(&stable_state(0.9), false).unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.stats().accepted, 1);
    }

    #[test]
    fn test_colliding_id_with_different_content_aborts() {
        let mut registry = registry();
        registry.admit(&stable_state(0.9), false).unwrap();

        // Same quantized identity inputs, different domain
        let conflicting = stable_state(0.9).with_domain("physics");
        let result = registry.admit(&conflicting, false);
        assert!(matches!(result, Err(Error::DuplicateRecord { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_parent_pointer_survives_eviction_of_latest() {
        let mut registry = registry();
        let first = registry.admit(&stable_state(0.9), false).unwrap();
        let second = registry
            .admit(
                &stable_state(0.9).with_timestamp(Utc.with_ymd_and_hms(2026, 1, 24, 13, 0, 0).unwrap()),
                false,
            )
            .unwrap();

        registry.remove(second.id().unwrap());
        assert_eq!(registry.last_ontological(), first.id());

        let third = registry
            .admit(
                &stable_state(0.9).with_timestamp(Utc.with_ymd_and_hms(2026, 1, 24, 14, 0, 0).unwrap()),
                false,
            )
            .unwrap();
        let record = registry.get(third.id().unwrap()).unwrap();
        assert_eq!(record.parent_id.as_ref(), first.id());
    }

    #[test]
    fn test_delta_buffer_is_bounded() {
        let config = RegistryConfig {
            delta_buffer_capacity: 3,
            ..RegistryConfig::default()
        };
        let mut registry = MemoryRegistry::new(config);
        for i in 0..5 {
            let ts = Utc.with_ymd_and_hms(2026, 1, 24, 12, 0, i).unwrap();
            registry
                .admit(&stable_state(0.5).with_timestamp(ts), false)
                .unwrap();
        }
        assert_eq!(registry.delta_buffer().count(), 3);
        assert_eq!(registry.stats().deltas_minted, 5);
    }
}
