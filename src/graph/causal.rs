//! Causal lineage graph over durable records.
//!
//! An arena DAG keyed by record id: directed parent→child edges created at
//! insertion time from `parent_id`, plus an undirected associative overlay
//! for latent links. Eviction removes a node and every edge touching it in
//! O(degree); dangling edges are never left behind.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::registry::{MemoryRecord, RecordId};

/// Degree at which causal centrality saturates.
const CENTRALITY_DEGREE_SCALE: f64 = 20.0;

/// Centrality reported for ids absent from the graph.
const UNKNOWN_CENTRALITY: f64 = 0.5;

/// Node attributes copied from the record at insertion.
///
/// The graph never dereferences back into the registry; embedding and
/// forensic reads work from this copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttrs {
    pub domain: String,
    pub coherence_score: f64,
    pub ethical_score: f64,
    pub crisis_ratio: f64,
    pub latency_p99: f64,
    pub agent_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&MemoryRecord> for NodeAttrs {
    fn from(record: &MemoryRecord) -> Self {
        Self {
            domain: record.domain.clone(),
            coherence_score: record.coherence_score,
            ethical_score: record.ethical_score,
            crisis_ratio: record.crisis_ratio,
            latency_p99: record.latency_p99,
            agent_count: record.agent_count,
            created_at: record.created_at,
        }
    }
}

/// Directed causal graph plus associative overlay.
#[derive(Debug, Default)]
pub struct CausalGraphNavigator {
    nodes: HashMap<RecordId, NodeAttrs>,
    // BTreeMap adjacency keeps iteration order deterministic for tie-breaks
    parents: HashMap<RecordId, BTreeMap<RecordId, f64>>,
    children: HashMap<RecordId, BTreeMap<RecordId, f64>>,
    associations: HashMap<RecordId, BTreeMap<RecordId, f64>>,
    domain_index: HashMap<String, Vec<RecordId>>,
}

impl CausalGraphNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a durable record as a graph node.
    ///
    /// A `parent_id` referencing a node not present in the graph must never
    /// occur (parents are inserted before children); it is an assertion
    /// failure in debug builds and the record becomes a root in release.
    pub fn insert(&mut self, record: &MemoryRecord) {
        let id = record.id.clone();
        self.nodes.insert(id.clone(), NodeAttrs::from(record));
        self.domain_index
            .entry(record.domain.clone())
            .or_default()
            .push(id.clone());

        if let Some(parent) = &record.parent_id {
            if self.nodes.contains_key(parent) {
                self.children
                    .entry(parent.clone())
                    .or_default()
                    .insert(id.clone(), 1.0);
                self.parents
                    .entry(id.clone())
                    .or_default()
                    .insert(parent.clone(), 1.0);
            } else {
                debug_assert!(
                    false,
                    "parent {} of {} not present in graph",
                    parent, record.id
                );
                warn!(id = %id.short(), parent = %parent.short(), "missing parent, treating as root");
            }
        }
        debug!(id = %id.short(), domain = %record.domain, "node ingested");
    }

    /// Record an associative (latent) edge between two existing nodes.
    pub fn add_latent_edge(&mut self, a: &RecordId, b: &RecordId, weight: f64) {
        if !self.nodes.contains_key(a) || !self.nodes.contains_key(b) {
            return;
        }
        self.associations
            .entry(a.clone())
            .or_default()
            .insert(b.clone(), weight);
        self.associations
            .entry(b.clone())
            .or_default()
            .insert(a.clone(), weight);
    }

    /// Walk backward from `target`, at each step following the predecessor
    /// with the highest edge weight (smallest id on ties).
    ///
    /// Returns the path ordered oldest→newest, excluding `target` itself.
    pub fn find_causal_path(&self, target: &RecordId, max_depth: usize) -> Vec<RecordId> {
        if !self.nodes.contains_key(target) {
            return Vec::new();
        }
        let mut path = Vec::new();
        let mut current = target.clone();
        for _ in 0..max_depth {
            let Some(preds) = self.parents.get(&current) else {
                break;
            };
            // Ascending id iteration: strict > keeps the smallest id on ties
            let mut best: Option<(&RecordId, f64)> = None;
            for (pred, weight) in preds {
                match best {
                    Some((_, best_weight)) if *weight <= best_weight => {}
                    _ => best = Some((pred, *weight)),
                }
            }
            let Some((parent, _)) = best else { break };
            path.push(parent.clone());
            current = parent.clone();
        }
        path.reverse();
        path
    }

    /// Breadth-first forward traversal up to `max_depth` levels.
    ///
    /// Returns deduplicated descendant ids, sorted for determinism.
    pub fn find_causal_descendants(&self, source: &RecordId, max_depth: usize) -> Vec<RecordId> {
        if !self.nodes.contains_key(source) {
            return Vec::new();
        }
        let mut visited: HashSet<RecordId> = HashSet::new();
        let mut frontier: VecDeque<(RecordId, usize)> = VecDeque::new();
        frontier.push_back((source.clone(), 0));

        while let Some((node, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            if let Some(succs) = self.children.get(&node) {
                for succ in succs.keys() {
                    if visited.insert(succ.clone()) {
                        frontier.push_back((succ.clone(), depth + 1));
                    }
                }
            }
        }

        let mut descendants: Vec<RecordId> = visited.into_iter().collect();
        descendants.sort();
        descendants
    }

    /// Normalized causal degree, capped at 1.0.
    ///
    /// Ids absent from the graph report a neutral 0.5.
    pub fn centrality(&self, id: &RecordId) -> f64 {
        if !self.nodes.contains_key(id) {
            return UNKNOWN_CENTRALITY;
        }
        let degree = self.parents.get(id).map_or(0, |m| m.len())
            + self.children.get(id).map_or(0, |m| m.len());
        (degree as f64 / CENTRALITY_DEGREE_SCALE).min(1.0)
    }

    /// Remove a node and every edge touching it.
    pub fn remove(&mut self, id: &RecordId) {
        let Some(attrs) = self.nodes.remove(id) else {
            return;
        };
        if let Some(preds) = self.parents.remove(id) {
            for pred in preds.keys() {
                if let Some(children) = self.children.get_mut(pred) {
                    children.remove(id);
                }
            }
        }
        if let Some(succs) = self.children.remove(id) {
            for succ in succs.keys() {
                if let Some(parents) = self.parents.get_mut(succ) {
                    parents.remove(id);
                }
            }
        }
        if let Some(assocs) = self.associations.remove(id) {
            for other in assocs.keys() {
                if let Some(edges) = self.associations.get_mut(other) {
                    edges.remove(id);
                }
            }
        }
        if let Some(ids) = self.domain_index.get_mut(&attrs.domain) {
            ids.retain(|other| other != id);
        }
        debug!(id = %id.short(), "node removed from graph");
    }

    /// Attributes of a node, if present.
    pub fn node(&self, id: &RecordId) -> Option<&NodeAttrs> {
        self.nodes.get(id)
    }

    /// Domain tag of a node, if present.
    pub fn domain_of(&self, id: &RecordId) -> Option<&str> {
        self.nodes.get(id).map(|attrs| attrs.domain.as_str())
    }

    /// Whether the node is present in the active graph.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All active node ids, in unspecified order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.nodes.keys().cloned().collect()
    }

    /// Number of active nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Associative neighbors of a node with their edge weights.
    pub fn associations_of(&self, id: &RecordId) -> Vec<(RecordId, f64)> {
        self.associations
            .get(id)
            .map(|edges| edges.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::registry::MemoryTier;

    fn record(id: &str, parent: Option<&str>) -> MemoryRecord {
        MemoryRecord {
            id: RecordId::from(id),
            tier: MemoryTier::Ontological,
            domain: "physics".to_string(),
            coherence_score: 0.9,
            ethical_score: 0.8,
            crisis_ratio: 0.0,
            latency_p99: 3.0,
            agent_count: 4,
            parent_id: parent.map(RecordId::from),
            created_at: Utc::now(),
            seal: None,
            minting_latency_ms: 0.1,
        }
    }

    fn chain(ids: &[&str]) -> CausalGraphNavigator {
        let mut graph = CausalGraphNavigator::new();
        let mut prev: Option<&str> = None;
        for id in ids {
            graph.insert(&record(id, prev));
            prev = Some(id);
        }
        graph
    }

    #[test]
    fn test_path_walks_lineage_oldest_first() {
        let graph = chain(&["MID-A", "MID-B", "MID-C", "MID-D"]);
        let path = graph.find_causal_path(&RecordId::from("MID-D"), 10);
        assert_eq!(
            path,
            vec![RecordId::from("MID-A"), RecordId::from("MID-B"), RecordId::from("MID-C")]
        );
    }

    #[test]
    fn test_path_respects_max_depth() {
        let graph = chain(&["MID-A", "MID-B", "MID-C", "MID-D"]);
        let path = graph.find_causal_path(&RecordId::from("MID-D"), 2);
        assert_eq!(path, vec![RecordId::from("MID-B"), RecordId::from("MID-C")]);
    }

    #[test]
    fn test_path_of_unknown_target_is_empty() {
        let graph = chain(&["MID-A"]);
        assert!(graph.find_causal_path(&RecordId::from("MID-X"), 10).is_empty());
    }

    #[test]
    fn test_path_tie_breaks_on_smallest_id() {
        let mut graph = CausalGraphNavigator::new();
        graph.insert(&record("MID-B", None));
        graph.insert(&record("MID-A", None));
        graph.insert(&record("MID-C", Some("MID-B")));
        // Second equal-weight predecessor, added directly
        graph.parents.get_mut(&RecordId::from("MID-C")).unwrap().insert(RecordId::from("MID-A"), 1.0);
        graph.children.entry(RecordId::from("MID-A")).or_default().insert(RecordId::from("MID-C"), 1.0);

        let path = graph.find_causal_path(&RecordId::from("MID-C"), 1);
        assert_eq!(path, vec![RecordId::from("MID-A")]);
    }

    #[test]
    fn test_descendants_bfs() {
        let mut graph = CausalGraphNavigator::new();
        graph.insert(&record("MID-A", None));
        graph.insert(&record("MID-B", Some("MID-A")));
        graph.insert(&record("MID-C", Some("MID-B")));
        graph.insert(&record("MID-D", Some("MID-C")));

        let one_level = graph.find_causal_descendants(&RecordId::from("MID-A"), 1);
        assert_eq!(one_level, vec![RecordId::from("MID-B")]);

        let all = graph.find_causal_descendants(&RecordId::from("MID-A"), 10);
        assert_eq!(
            all,
            vec![RecordId::from("MID-B"), RecordId::from("MID-C"), RecordId::from("MID-D")]
        );
    }

    #[test]
    fn test_centrality() {
        let graph = chain(&["MID-A", "MID-B", "MID-C"]);
        // MID-B has one parent and one child
        assert!((graph.centrality(&RecordId::from("MID-B")) - 0.1).abs() < 1e-9);
        // Unknown id reports neutral centrality
        assert_eq!(graph.centrality(&RecordId::from("MID-X")), 0.5);
    }

    #[test]
    fn test_remove_leaves_no_dangling_edges() {
        let mut graph = chain(&["MID-A", "MID-B", "MID-C"]);
        graph.add_latent_edge(&RecordId::from("MID-A"), &RecordId::from("MID-C"), 0.8);

        graph.remove(&RecordId::from("MID-B"));

        assert!(!graph.contains(&RecordId::from("MID-B")));
        assert!(graph.find_causal_path(&RecordId::from("MID-C"), 10).is_empty());
        assert!(graph.find_causal_descendants(&RecordId::from("MID-A"), 10).is_empty());

        // Association between the surviving nodes is intact
        assert_eq!(graph.associations_of(&RecordId::from("MID-A")).len(), 1);

        graph.remove(&RecordId::from("MID-C"));
        assert!(graph.associations_of(&RecordId::from("MID-A")).is_empty());
    }

    #[test]
    fn test_latent_edge_requires_both_nodes() {
        let mut graph = chain(&["MID-A"]);
        graph.add_latent_edge(&RecordId::from("MID-A"), &RecordId::from("MID-X"), 0.9);
        assert!(graph.associations_of(&RecordId::from("MID-A")).is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not present in graph")]
    fn test_missing_parent_asserts_in_debug() {
        let mut graph = CausalGraphNavigator::new();
        graph.insert(&record("MID-B", Some("MID-MISSING")));
    }
}
