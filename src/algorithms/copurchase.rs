use crate::algorithms::factorization::{InteractionMatrix, MatrixFactorization};
use crate::config::TrainingConfig;
use crate::models::{BasketLine, Interaction, ProductGraph};
use crate::utils::cosine_similarity;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

/// Builds the behavioral co-purchase graph. The learned strategy factorizes
/// customer/product interaction strengths into latent embeddings; it needs a
/// matrix with at least two customers and two products to say anything about
/// item geometry. Anything thinner falls back to raw same-order
/// co-occurrence counting.
pub struct CoPurchaseTrainer {
    config: TrainingConfig,
}

impl CoPurchaseTrainer {
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn train(&self, interactions: &[Interaction], baskets: &[BasketLine]) -> ProductGraph {
        let matrix = InteractionMatrix::from_interactions(interactions);

        if matrix.customer_count() >= 2 && matrix.product_count() >= 2 {
            info!(
                customers = matrix.customer_count(),
                products = matrix.product_count(),
                "building co-purchase graph from factorized embeddings"
            );
            LearnedCoPurchase::new(&self.config).build(&matrix)
        } else {
            info!(
                baskets = baskets.len(),
                "interaction data too thin, counting same-order co-occurrence"
            );
            CooccurrenceCoPurchase::new(self.config.min_cooccurrence).build(baskets)
        }
    }
}

/// Learned strategy: factorize the interaction matrix, then connect product
/// pairs whose embedding cosine similarity clears the threshold. Weights are
/// the similarity scaled by a fixed factor; the graph is symmetric because
/// cosine similarity is.
pub struct LearnedCoPurchase {
    factorizer: MatrixFactorization,
    threshold: f32,
    scale: f32,
}

impl LearnedCoPurchase {
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            factorizer: MatrixFactorization::new(
                config.latent_dim,
                config.epochs,
                config.learning_rate,
                config.regularization,
                config.seed,
            ),
            threshold: config.copurchase_threshold,
            scale: config.copurchase_scale,
        }
    }

    pub fn build(&self, matrix: &InteractionMatrix) -> ProductGraph {
        let factorized = self.factorizer.fit(matrix);
        let embeddings = &factorized.product_vectors;
        let ids = &matrix.products;
        let n = ids.len();
        let threshold = self.threshold;
        let scale = self.scale;

        let edges: Vec<(i64, i64, f32)> = (0..n)
            .into_par_iter()
            .flat_map_iter(move |i| {
                ((i + 1)..n).filter_map(move |j| {
                    let similarity = cosine_similarity(
                        embeddings[i].as_slice(),
                        embeddings[j].as_slice(),
                    );
                    (similarity > threshold)
                        .then_some((ids[i], ids[j], similarity * scale))
                })
            })
            .collect();

        let mut graph = ProductGraph::new();
        for (a, b, weight) in edges {
            graph.insert_symmetric(a, b, weight);
        }
        graph.finalize()
    }
}

/// Fallback strategy: count distinct-product pairs sharing an order. Pairs
/// below the minimum count are dropped; kept pairs are inserted in both
/// directions with equal weight.
pub struct CooccurrenceCoPurchase {
    min_count: u32,
}

impl CooccurrenceCoPurchase {
    pub fn new(min_count: u32) -> Self {
        Self { min_count }
    }

    pub fn build(&self, baskets: &[BasketLine]) -> ProductGraph {
        let mut orders: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
        for line in baskets {
            orders.entry(line.order_id).or_default().insert(line.product_id);
        }

        let mut counts: HashMap<(i64, i64), u32> = HashMap::new();
        for products in orders.values() {
            let products: Vec<i64> = products.iter().copied().collect();
            for (i, &a) in products.iter().enumerate() {
                for &b in &products[i + 1..] {
                    *counts.entry((a, b)).or_insert(0) += 1;
                }
            }
        }

        let mut graph = ProductGraph::new();
        for ((a, b), count) in counts {
            if count >= self.min_count {
                graph.insert_symmetric(a, b, count as f32);
            }
        }
        graph.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn line(order_id: i64, product_id: i64) -> BasketLine {
        BasketLine {
            order_id,
            product_id,
        }
    }

    fn interaction(customer_id: i64, product_id: i64, strength: f64) -> Interaction {
        Interaction {
            customer_id,
            product_id,
            strength,
        }
    }

    fn training_config() -> TrainingConfig {
        Config::default().training
    }

    #[test]
    fn cooccurrence_requires_min_count_and_is_symmetric() {
        // orders {A,B}, {A,B}, {A,C}: A-B seen twice, A-C only once
        let baskets = vec![
            line(1, 100),
            line(1, 200),
            line(2, 100),
            line(2, 200),
            line(3, 100),
            line(3, 300),
        ];

        let graph = CooccurrenceCoPurchase::new(2).build(&baskets);

        assert_eq!(graph.score(100, 200), Some(2.0));
        assert_eq!(graph.score(200, 100), Some(2.0));
        assert_eq!(graph.score(100, 300), None);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn cooccurrence_ignores_duplicate_lines_within_an_order() {
        let baskets = vec![
            line(1, 100),
            line(1, 100),
            line(1, 200),
            line(2, 100),
            line(2, 200),
        ];

        let graph = CooccurrenceCoPurchase::new(2).build(&baskets);
        assert_eq!(graph.score(100, 200), Some(2.0));
    }

    #[test]
    fn thin_interaction_data_selects_the_fallback() {
        let trainer = CoPurchaseTrainer::new(&training_config());
        // a single customer cannot support factorization
        let interactions = vec![interaction(1, 100, 3.0), interaction(1, 200, 1.0)];
        let baskets = vec![
            line(1, 100),
            line(1, 200),
            line(2, 100),
            line(2, 200),
        ];

        let graph = trainer.train(&interactions, &baskets);

        // fallback weights are raw counts, not scaled similarities
        assert_eq!(graph.score(100, 200), Some(2.0));
    }

    #[test]
    fn learned_graph_is_symmetric() {
        let trainer = CoPurchaseTrainer::new(&training_config());
        let interactions = vec![
            interaction(1, 100, 5.0),
            interaction(1, 200, 5.0),
            interaction(2, 100, 4.0),
            interaction(2, 200, 4.0),
            interaction(3, 300, 1.0),
            interaction(3, 100, 2.0),
        ];

        let graph = trainer.train(&interactions, &[]);

        for &a in &[100, 200, 300] {
            if let Some(neighbors) = graph.neighbors(a) {
                for n in neighbors {
                    assert_eq!(graph.score(n.product_id, a), Some(n.score));
                }
            }
        }
    }

    #[test]
    fn learned_training_is_idempotent() {
        let trainer = CoPurchaseTrainer::new(&training_config());
        let interactions = vec![
            interaction(1, 100, 5.0),
            interaction(1, 200, 5.0),
            interaction(2, 100, 4.0),
            interaction(2, 200, 4.0),
        ];

        let first = trainer.train(&interactions, &[]);
        let second = trainer.train(&interactions, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_inputs_yield_an_empty_graph() {
        let trainer = CoPurchaseTrainer::new(&training_config());
        let graph = trainer.train(&[], &[]);
        assert!(graph.is_empty());
    }
}
