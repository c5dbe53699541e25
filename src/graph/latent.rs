//! Associative link discovery over record metadata embeddings.
//!
//! Each active record gets a deterministic low-dimensional embedding built
//! from its admission metadata. A brute-force cosine index over those
//! embeddings answers k-nearest-neighbor queries; neighbors from a
//! *different* domain above the similarity floor become latent links.
//! Same-domain neighbors are trivially correlated and never linked.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LinkerConfig;
use crate::graph::causal::{CausalGraphNavigator, NodeAttrs};
use crate::registry::{stable_bucket, RecordId};

/// Dimensionality of the metadata embedding.
pub const EMBEDDING_DIM: usize = 6;

/// Metadata embedding vector.
pub type Embedding = [f32; EMBEDDING_DIM];

/// Unordered, order-normalized pair of domain tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainPair(pub String, pub String);

impl DomainPair {
    /// Build a normalized pair (lexicographic order).
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let a = a.into();
        let b = b.into();
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Whether this pair spans the two given domains, in either order.
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.0 == a && self.1 == b) || (self.0 == b && self.1 == a)
    }

    /// Whether both tags are distinct domains.
    pub fn is_cross_domain(&self) -> bool {
        self.0 != self.1
    }
}

impl std::fmt::Display for DomainPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<->{}", self.0, self.1)
    }
}

/// An associative edge discovered between two records.
///
/// Immutable once created; deduplicated by the unordered id pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentLink {
    pub source: RecordId,
    pub target: RecordId,
    pub similarity: f64,
    pub domain_pair: DomainPair,
    pub discovered_at: DateTime<Utc>,
}

impl LatentLink {
    /// Whether the link has the given record as an endpoint.
    pub fn touches(&self, id: &RecordId) -> bool {
        &self.source == id || &self.target == id
    }

    /// The opposite endpoint, if `id` is an endpoint.
    pub fn other(&self, id: &RecordId) -> Option<&RecordId> {
        if &self.source == id {
            Some(&self.target)
        } else if &self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// Approximate-nearest-neighbor discovery of cross-domain links.
pub struct LatentLinkDiscoverer {
    config: LinkerConfig,
    embeddings: HashMap<RecordId, Embedding>,
    index: Vec<(RecordId, Embedding)>,
    known_pairs: HashSet<(RecordId, RecordId)>,
    correlation_history: Vec<LatentLink>,
}

impl LatentLinkDiscoverer {
    pub fn new(config: LinkerConfig) -> Self {
        Self {
            config,
            embeddings: HashMap::new(),
            index: Vec::new(),
            known_pairs: HashSet::new(),
            correlation_history: Vec::new(),
        }
    }

    /// Deterministic metadata embedding for a graph node.
    pub fn embed(attrs: &NodeAttrs) -> Embedding {
        [
            attrs.coherence_score as f32,
            attrs.ethical_score as f32,
            attrs.crisis_ratio as f32,
            (attrs.latency_p99 / 10.0) as f32,
            stable_bucket(&attrs.domain, 100) as f32 / 100.0,
            (attrs.agent_count as f64 / 50_000.0) as f32,
        ]
    }

    /// Rebuild the neighbor index over all active graph nodes.
    ///
    /// Embeddings are cached per id; only ids without a cached embedding
    /// are recomputed.
    pub fn rebuild_index(&mut self, graph: &CausalGraphNavigator) {
        let mut index = Vec::new();
        for id in graph.ids() {
            let embedding = match self.embeddings.get(&id) {
                Some(existing) => *existing,
                None => {
                    let Some(attrs) = graph.node(&id) else { continue };
                    let embedding = Self::embed(attrs);
                    self.embeddings.insert(id.clone(), embedding);
                    embedding
                }
            };
            index.push((id, embedding));
        }
        // Deterministic query results regardless of hash-map order
        index.sort_by(|a, b| a.0.cmp(&b.0));
        self.index = index;
    }

    /// Discover new cross-domain links from `source` to its nearest
    /// neighbors.
    ///
    /// Returns only links created by this call; pairs already linked are
    /// silently skipped (dedup is not an error).
    pub fn discover_links(
        &mut self,
        graph: &mut CausalGraphNavigator,
        source: &RecordId,
        min_similarity: Option<f64>,
        now: DateTime<Utc>,
    ) -> Vec<LatentLink> {
        let min_similarity = min_similarity.unwrap_or(self.config.similarity_threshold);
        let Some(source_embedding) = self.embeddings.get(source).copied() else {
            return Vec::new();
        };
        let Some(source_domain) = graph.domain_of(source).map(str::to_string) else {
            return Vec::new();
        };

        let mut neighbors: Vec<(RecordId, f64)> = self
            .index
            .iter()
            .filter(|(id, _)| id != source)
            .map(|(id, embedding)| (id.clone(), cosine_similarity(&source_embedding, embedding)))
            .collect();
        neighbors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        neighbors.truncate(self.config.k_neighbors);

        let mut new_links = Vec::new();
        for (target, similarity) in neighbors {
            if similarity < min_similarity {
                continue;
            }
            let Some(target_domain) = graph.domain_of(&target) else {
                continue;
            };
            if target_domain == source_domain {
                continue;
            }
            let pair_key = ordered_pair(source, &target);
            if self.known_pairs.contains(&pair_key) {
                continue;
            }
            self.known_pairs.insert(pair_key);

            let link = LatentLink {
                source: source.clone(),
                target: target.clone(),
                similarity,
                domain_pair: DomainPair::new(source_domain.clone(), target_domain),
                discovered_at: now,
            };
            graph.add_latent_edge(source, &target, similarity);
            debug!(
                source = %source.short(),
                target = %target.short(),
                similarity,
                pair = %link.domain_pair,
                "latent link discovered"
            );
            self.correlation_history.push(link.clone());
            new_links.push(link);
        }
        new_links
    }

    /// Every link discovered so far, oldest first.
    pub fn correlation_history(&self) -> &[LatentLink] {
        &self.correlation_history
    }

    /// Similarities of all historical links touching `id`.
    pub fn similarities_touching(&self, id: &RecordId) -> Vec<f64> {
        self.correlation_history
            .iter()
            .filter(|link| link.touches(id))
            .map(|link| link.similarity)
            .collect()
    }

    /// Whether `id` participates in a cross-domain link discovered within
    /// the last `window_hours`.
    pub fn has_active_cross_domain_link(
        &self,
        id: &RecordId,
        now: DateTime<Utc>,
        window_hours: f64,
    ) -> bool {
        self.correlation_history.iter().any(|link| {
            link.touches(id)
                && link.domain_pair.is_cross_domain()
                && (now - link.discovered_at).num_milliseconds() as f64 / 3_600_000.0
                    <= window_hours
        })
    }

    /// Total links discovered.
    pub fn links_discovered(&self) -> u64 {
        self.correlation_history.len() as u64
    }

    /// Drop the cached embedding for an evicted record.
    pub fn remove(&mut self, id: &RecordId) {
        self.embeddings.remove(id);
    }
}

fn ordered_pair(a: &RecordId, b: &RecordId) -> (RecordId, RecordId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Cosine similarity between two embeddings, 0.0 on zero norm.
fn cosine_similarity(a: &Embedding, b: &Embedding) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..EMBEDDING_DIM {
        dot += a[i] as f64 * b[i] as f64;
        norm_a += (a[i] as f64).powi(2);
        norm_b += (b[i] as f64).powi(2);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
