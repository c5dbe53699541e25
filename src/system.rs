//! Top-level memory system facade.
//!
//! Wires the registry, sealing worker, causal graph, latent linker,
//! retention engine, forensics, and bridge sentinel into one owner.
//! Admission, eviction, and graph mutation are serialized through this
//! facade (single logical writer); sealing is the one concurrent
//! operation, running on its own task and touching records only through
//! the shared arena.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::events::{EventEmitter, MemoryEvent, NullEmitter};
use crate::graph::{
    CausalGraphNavigator, ForensicsEngine, Investigation, LatentLink, LatentLinkDiscoverer,
};
use crate::registry::{
    AdmissionOutcome, MemoryRegistry, MemoryTier, RecordId, SealingWorker, SubstrateState,
};
use crate::retention::{
    BridgeHit, BridgeSentinel, RetentionPriority, TemporalRetentionEngine,
};

/// Aggregate counter snapshot across all components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Records admitted to any stored tier
    pub accepted: u64,
    /// States rejected by the stability filter
    pub rejected: u64,
    /// Seals completed by the sealing worker
    pub sealed: u64,
    /// Records moved to the shadow store
    pub evicted: u64,
    /// Eviction candidates preserved by bridge/ethics protection
    pub bridges_preserved: u64,
    /// Active ONTOLOGICAL records
    pub registry_size: usize,
    /// INTEGRATED records minted into the delta buffer
    pub deltas_minted: u64,
    /// Records currently in the shadow store
    pub shadow_size: usize,
    /// Latent links discovered
    pub links_discovered: u64,
}

/// Result of one maintenance cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    /// Decay rate after adjustment
    pub lambda: f64,
    /// Critical bridges newly tracked by the sentinel
    pub critical_found: usize,
    /// Bridges flagged at risk of eviction
    pub at_risk: usize,
    /// Protective boosts applied
    pub protected: usize,
    /// Shadow entries permanently purged
    pub shadow_purged: usize,
}

/// Owner of the full tiered memory store.
///
/// Must be constructed inside a tokio runtime: creation spawns the sealing
/// worker task.
pub struct MemorySystem {
    config: MemoryConfig,
    registry: MemoryRegistry,
    graph: CausalGraphNavigator,
    linker: LatentLinkDiscoverer,
    engine: TemporalRetentionEngine,
    sentinel: BridgeSentinel,
    forensics: ForensicsEngine,
    sealing: SealingWorker,
    emitter: Arc<dyn EventEmitter>,
    closed: bool,
}

impl MemorySystem {
    /// Create a system with events discarded.
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_emitter(config, Arc::new(NullEmitter))
    }

    /// Create a system emitting events through the given emitter.
    pub fn with_emitter(config: MemoryConfig, emitter: Arc<dyn EventEmitter>) -> Self {
        let registry = MemoryRegistry::new(config.registry.clone());
        let sealing = SealingWorker::spawn(
            registry.shared_records(),
            registry.sealed_counter(),
            config.registry.origin_seed.clone(),
            Duration::from_millis(config.registry.sealing_latency_ms),
            Arc::clone(&emitter),
        );
        Self {
            registry,
            graph: CausalGraphNavigator::new(),
            linker: LatentLinkDiscoverer::new(config.linker.clone()),
            engine: TemporalRetentionEngine::new(config.retention.clone()),
            sentinel: BridgeSentinel::new(config.sentinel.clone()),
            forensics: ForensicsEngine::new(config.forensics.clone()),
            sealing,
            emitter,
            config,
            closed: false,
        }
    }

    /// Admit a substrate state.
    ///
    /// ONTOLOGICAL admissions are inserted into the causal graph and queued
    /// for sealing; admission itself never waits on the seal.
    pub fn admit(
        &mut self,
        state: &SubstrateState,
        force_durable: bool,
    ) -> Result<AdmissionOutcome> {
        if self.closed {
            return Err(Error::RegistryClosed);
        }
        let outcome = self.registry.admit(state, force_durable)?;
        match &outcome {
            AdmissionOutcome::Admitted { id, tier } => {
                if *tier == MemoryTier::Ontological && !self.graph.contains(id) {
                    let record = self
                        .registry
                        .get(id)
                        .ok_or_else(|| Error::internal("admitted record missing from arena"))?;
                    self.graph.insert(&record);
                    self.sealing.submit(id.clone());
                }
                self.emitter.emit(MemoryEvent::admitted(id, *tier));
            }
            AdmissionOutcome::Ephemeral => self.emitter.emit(MemoryEvent::ephemeral()),
            AdmissionOutcome::Rejected(reason) => {
                self.emitter.emit(MemoryEvent::rejected(reason))
            }
        }
        Ok(outcome)
    }

    /// Discover new cross-domain links from `source` and start tracking
    /// them as bridges.
    pub fn discover_links(
        &mut self,
        source: &RecordId,
        min_similarity: Option<f64>,
    ) -> Vec<LatentLink> {
        let now = Utc::now();
        self.linker.rebuild_index(&self.graph);
        let links = self
            .linker
            .discover_links(&mut self.graph, source, min_similarity, now);
        for link in &links {
            self.engine.record_link(link, now);
            self.emitter.emit(MemoryEvent::link_discovered(link));
        }
        links
    }

    /// Current retention weight of an active record.
    pub fn weight(&mut self, id: &RecordId) -> f64 {
        self.engine
            .compute_weight(id, Utc::now(), &self.registry, &self.graph, &self.linker)
    }

    /// Diagnostic priority cached by the last scoring pass.
    pub fn priority(&self, id: &RecordId) -> Option<RetentionPriority> {
        self.engine.cached_priority(id)
    }

    /// Run the eviction pass.
    pub fn prune(&mut self, target_reduction: f64) -> usize {
        let total = self.registry.len();
        let evicted = self.engine.prune(
            Utc::now(),
            target_reduction,
            &mut self.registry,
            &mut self.graph,
            &mut self.linker,
        );
        if evicted > 0 {
            self.emitter.emit(MemoryEvent::pruned(evicted, total));
        }
        evicted
    }

    /// Run one maintenance cycle: decay-rate adjustment, sentinel scan,
    /// risk assessment, protective boosts, and shadow purge.
    pub fn maintain(
        &mut self,
        system_load: f64,
        ethical_stability: f64,
        discovery_rate: f64,
        exploration: bool,
    ) -> MaintenanceReport {
        let now = Utc::now();
        let lambda =
            self.engine
                .adjust_lambda(system_load, ethical_stability, discovery_rate, exploration);

        let new_critical = self.sentinel.scan(now, &self.registry, &self.engine);
        for bridge in &new_critical {
            self.emitter.emit(MemoryEvent::critical_bridge_found(
                &bridge.id,
                bridge.signature.to_string(),
            ));
        }

        let at_risk =
            self.sentinel
                .assess_risk(now, &self.registry, &mut self.engine, &self.graph, &self.linker);
        let protected = self.sentinel.protect(&at_risk, &mut self.engine, now);
        for (id, risk) in at_risk
            .iter()
            .filter(|(_, risk)| *risk > self.config.sentinel.protect_threshold)
        {
            self.emitter.emit(MemoryEvent::bridge_protected(id, *risk));
        }

        let shadow_purged = self.engine.purge_shadow(now);
        if shadow_purged > 0 {
            self.emitter.emit(MemoryEvent::shadow_purged(shadow_purged));
        }

        info!(
            lambda,
            critical = new_critical.len(),
            at_risk = at_risk.len(),
            protected,
            shadow_purged,
            "maintenance cycle complete"
        );
        MaintenanceReport {
            lambda,
            critical_found: new_critical.len(),
            at_risk: at_risk.len(),
            protected,
            shadow_purged,
        }
    }

    /// All bridges spanning the two given domains, strongest first.
    pub fn query_bridges(
        &self,
        domain_a: &str,
        domain_b: &str,
        min_correlation: f64,
    ) -> Vec<BridgeHit> {
        self.engine
            .query_bridges(&self.registry, domain_a, domain_b, min_correlation)
    }

    /// Forensic explanation of a record's causal and associative context.
    pub fn investigate(&mut self, id: &RecordId) -> Investigation {
        self.forensics
            .investigate(&mut self.graph, &mut self.linker, id, Utc::now())
    }

    /// Aggregate counter snapshot.
    pub fn stats(&self) -> MemoryStats {
        let registry = self.registry.stats();
        let retention = self.engine.stats();
        MemoryStats {
            accepted: registry.accepted,
            rejected: registry.rejected,
            sealed: registry.sealed,
            evicted: retention.evicted,
            bridges_preserved: retention.bridges_preserved,
            registry_size: registry.registry_size,
            deltas_minted: registry.deltas_minted,
            shadow_size: retention.shadow_size,
            links_discovered: self.linker.links_discovered(),
        }
    }

    /// Drain the sealing queue and close the store.
    ///
    /// Records admitted but not yet sealed are sealed before the worker
    /// joins; further admissions fail with `RegistryClosed`.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.sealing.shutdown().await?;
        self.closed = true;
        self.emitter.emit(MemoryEvent::shutdown());
        Ok(())
    }

    /// Whether the store has been shut down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read access to the registry.
    pub fn registry(&self) -> &MemoryRegistry {
        &self.registry
    }

    /// Read access to the causal graph.
    pub fn graph(&self) -> &CausalGraphNavigator {
        &self.graph
    }

    /// Read access to the retention engine.
    pub fn retention(&self) -> &TemporalRetentionEngine {
        &self.engine
    }

    /// Read access to the bridge sentinel.
    pub fn sentinel(&self) -> &BridgeSentinel {
        &self.sentinel
    }
}
