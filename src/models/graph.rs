use super::Product;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub product_id: i64,
    pub score: f32,
}

/// Sparse product adjacency. The absence of an entry means the pair scored
/// below the significance threshold, not that its similarity is zero.
///
/// Contract: each adjacency list is sorted by descending score, ties broken
/// by ascending product id; self-edges are never stored. Callers may slice
/// the head of a list without re-sorting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductGraph {
    edges: HashMap<i64, Vec<Neighbor>>,
}

impl ProductGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a directed edge. `finalize` must run before the graph is read.
    pub fn insert(&mut self, from: i64, to: i64, score: f32) {
        self.edges
            .entry(from)
            .or_default()
            .push(Neighbor { product_id: to, score });
    }

    /// Insert both directions with equal weight.
    pub fn insert_symmetric(&mut self, a: i64, b: i64, score: f32) {
        self.insert(a, b, score);
        self.insert(b, a, score);
    }

    /// Establish the sorted-adjacency contract.
    pub fn finalize(mut self) -> Self {
        for neighbors in self.edges.values_mut() {
            neighbors.sort_by(|x, y| {
                y.score
                    .partial_cmp(&x.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(x.product_id.cmp(&y.product_id))
            });
        }
        self
    }

    pub fn neighbors(&self, product_id: i64) -> Option<&[Neighbor]> {
        self.edges.get(&product_id).map(Vec::as_slice)
    }

    pub fn score(&self, from: i64, to: i64) -> Option<f32> {
        self.edges
            .get(&from)?
            .iter()
            .find(|n| n.product_id == to)
            .map(|n| n.score)
    }

    /// Number of directed entries across all adjacency lists.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn product_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// The trained bundle served from memory. All three members are populated
/// together by one training run; a partial set is treated as untrained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub copurchase: ProductGraph,
    pub similarity: ProductGraph,
    pub features: HashMap<i64, Product>,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Untrained,
    Training,
    Trained,
}

/// Owner of the currently served model. Queries take a snapshot once at
/// entry; a retrain swaps the whole artifact so in-flight requests see the
/// old model in full or the new one in full, never a mix.
#[derive(Debug)]
pub struct ModelHandle {
    current: RwLock<Option<Arc<ModelArtifact>>>,
    state: RwLock<ModelState>,
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self {
            current: RwLock::new(None),
            state: RwLock::new(ModelState::Untrained),
        }
    }
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<Arc<ModelArtifact>> {
        self.current.read().clone()
    }

    /// Swap in a freshly trained artifact and mark the handle trained.
    pub fn install(&self, artifact: Arc<ModelArtifact>) {
        *self.current.write() = Some(artifact);
        *self.state.write() = ModelState::Trained;
    }

    pub fn state(&self) -> ModelState {
        *self.state.read()
    }

    pub fn set_state(&self, state: ModelState) {
        *self.state.write() = state;
    }

    pub fn is_trained(&self) -> bool {
        self.current.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacency_sorted_by_score_then_id() {
        let mut graph = ProductGraph::new();
        graph.insert(1, 4, 0.5);
        graph.insert(1, 2, 0.9);
        graph.insert(1, 3, 0.5);
        let graph = graph.finalize();

        let neighbors = graph.neighbors(1).unwrap();
        assert_eq!(neighbors[0].product_id, 2);
        // equal scores fall back to ascending product id
        assert_eq!(neighbors[1].product_id, 3);
        assert_eq!(neighbors[2].product_id, 4);
    }

    #[test]
    fn symmetric_insert_mirrors_weight() {
        let mut graph = ProductGraph::new();
        graph.insert_symmetric(1, 2, 3.0);
        let graph = graph.finalize();

        assert_eq!(graph.score(1, 2), Some(3.0));
        assert_eq!(graph.score(2, 1), Some(3.0));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn handle_swap_is_visible_to_new_snapshots() {
        let handle = ModelHandle::new();
        assert!(handle.snapshot().is_none());
        assert_eq!(handle.state(), ModelState::Untrained);

        let artifact = Arc::new(ModelArtifact {
            copurchase: ProductGraph::new(),
            similarity: ProductGraph::new(),
            features: HashMap::new(),
            trained_at: Utc::now(),
        });
        handle.install(artifact);

        assert!(handle.snapshot().is_some());
        assert_eq!(handle.state(), ModelState::Trained);
    }
}
