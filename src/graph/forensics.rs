//! Forensic investigation of ethical drift along causal lineage.
//!
//! An investigation walks a record's causal chain, flags physical anomalies
//! and ethical violations along it, surfaces high-similarity latent
//! correlations, and reports the descendants a root cause may have
//! affected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ForensicsConfig;
use crate::graph::causal::CausalGraphNavigator;
use crate::graph::latent::{LatentLink, LatentLinkDiscoverer};
use crate::registry::RecordId;

/// Depth of the backward causal walk during drift tracing.
const DRIFT_TRACE_DEPTH: usize = 10;

/// Depth of the forward descendant sweep from a root cause.
const DESCENDANT_SWEEP_DEPTH: usize = 3;

/// A latency degradation found on the causal chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalAnomaly {
    pub id: RecordId,
    pub latency_p99: f64,
}

/// An ethical score below the drift floor found on the causal chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicalViolation {
    pub id: RecordId,
    pub ethical_score: f64,
    pub domain: String,
}

/// Operator-facing recommendation from an investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    /// No physical anomalies on the chain: tune local governance
    EthicalDriftIsolated,
    /// Latency degradation precedes the drift: fix the substrate first
    PhysicalCauseDetected,
    /// Physical and ethical signals are entangled: needs human analysis
    ComplexCausality,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EthicalDriftIsolated => "ETHICAL_DRIFT_ISOLATED",
            Self::PhysicalCauseDetected => "PHYSICAL_CAUSE_DETECTED",
            Self::ComplexCausality => "COMPLEX_CAUSALITY",
        };
        write!(f, "{}", s)
    }
}

/// Intermediate result of a causal drift trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAnalysis {
    pub target: RecordId,
    pub causal_chain: Vec<RecordId>,
    pub physical_anomalies: Vec<PhysicalAnomaly>,
    pub ethical_violations: Vec<EthicalViolation>,
    pub root_cause: Option<EthicalViolation>,
}

/// Full forensic report for a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    pub investigated: RecordId,
    pub causal_chain: Vec<RecordId>,
    pub root_cause: Option<EthicalViolation>,
    pub physical_anomalies: Vec<PhysicalAnomaly>,
    pub latent_correlations: Vec<LatentLink>,
    pub affected_descendants: Vec<RecordId>,
    pub recommendation: Recommendation,
}

/// Drift tracing and investigation over the causal graph.
pub struct ForensicsEngine {
    config: ForensicsConfig,
}

impl ForensicsEngine {
    pub fn new(config: ForensicsConfig) -> Self {
        Self { config }
    }

    /// Walk the causal chain of `target` and flag anomalies and violations.
    pub fn trace_drift(
        &self,
        graph: &CausalGraphNavigator,
        target: &RecordId,
    ) -> DriftAnalysis {
        let causal_chain = graph.find_causal_path(target, DRIFT_TRACE_DEPTH);
        let mut physical_anomalies = Vec::new();
        let mut ethical_violations = Vec::new();

        for id in &causal_chain {
            let Some(attrs) = graph.node(id) else { continue };
            if attrs.latency_p99 > self.config.latency_anomaly_threshold {
                physical_anomalies.push(PhysicalAnomaly {
                    id: id.clone(),
                    latency_p99: attrs.latency_p99,
                });
            }
            if attrs.ethical_score < self.config.drift_ethical_floor {
                ethical_violations.push(EthicalViolation {
                    id: id.clone(),
                    ethical_score: attrs.ethical_score,
                    domain: attrs.domain.clone(),
                });
            }
        }

        // Chain is ordered oldest first, so the first violation is the
        // earliest candidate cause
        let root_cause = ethical_violations.first().cloned();
        DriftAnalysis {
            target: target.clone(),
            causal_chain,
            physical_anomalies,
            ethical_violations,
            root_cause,
        }
    }

    /// Produce a full forensic report for a record.
    ///
    /// Combines the drift trace with freshly discovered high-similarity
    /// latent correlations and the descendants of the root cause.
    pub fn investigate(
        &self,
        graph: &mut CausalGraphNavigator,
        linker: &mut LatentLinkDiscoverer,
        id: &RecordId,
        now: DateTime<Utc>,
    ) -> Investigation {
        let analysis = self.trace_drift(graph, id);

        linker.rebuild_index(graph);
        let latent_correlations = linker.discover_links(
            graph,
            id,
            Some(self.config.correlation_min_similarity),
            now,
        );

        let root_id = analysis
            .root_cause
            .as_ref()
            .map(|violation| violation.id.clone())
            .unwrap_or_else(|| id.clone());
        let mut affected_descendants =
            graph.find_causal_descendants(&root_id, DESCENDANT_SWEEP_DEPTH);
        affected_descendants.truncate(self.config.descendant_limit);

        let recommendation = self.recommend(&analysis);
        info!(
            id = %id.short(),
            chain = analysis.causal_chain.len(),
            %recommendation,
            "investigation complete"
        );

        Investigation {
            investigated: id.clone(),
            causal_chain: analysis.causal_chain,
            root_cause: analysis.root_cause,
            physical_anomalies: analysis.physical_anomalies,
            latent_correlations,
            affected_descendants,
            recommendation,
        }
    }

    fn recommend(&self, analysis: &DriftAnalysis) -> Recommendation {
        if analysis.physical_anomalies.is_empty() {
            Recommendation::EthicalDriftIsolated
        } else if analysis.ethical_violations.is_empty() {
            Recommendation::PhysicalCauseDetected
        } else {
            Recommendation::ComplexCausality
        }
    }
}
