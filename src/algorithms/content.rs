use crate::algorithms::projection::{project, standardize};
use crate::config::TrainingConfig;
use crate::models::{Product, ProductGraph};
use crate::utils::cosine_similarity;
use ndarray::Array2;
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::info;

const CATEGORY_WEIGHT: f32 = 0.4;
const BRAND_WEIGHT: f32 = 0.3;
const PRICE_WEIGHT: f32 = 0.2;
const DEFAULT_RATING: f64 = 3.0;

/// Builds the content-similarity graph from catalog features. The learned
/// strategy needs at least two products and some feature variance to work
/// with; a degenerate feature set (every product identical on every
/// feature) selects the rule-based scorer instead.
pub struct ContentSimilarityTrainer {
    config: TrainingConfig,
}

impl ContentSimilarityTrainer {
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn train(&self, products: &[Product]) -> ProductGraph {
        if products.len() < 2 {
            return ProductGraph::new();
        }

        let features = FeatureMatrix::build(products);
        if features.has_variance() {
            info!(
                products = products.len(),
                columns = features.matrix.ncols(),
                "building similarity graph from reduced feature vectors"
            );
            LearnedSimilarity::new(&self.config).build(&features)
        } else {
            info!(
                products = products.len(),
                "feature matrix is degenerate, scoring with attribute rules"
            );
            RuleBasedSimilarity::new(self.config.similarity_threshold).build(products)
        }
    }
}

/// Product features laid out row-per-product: one-hot category indicators,
/// one-hot brand indicators, price, rating. Category and brand vocabularies
/// are sorted so the column order is stable across runs.
pub struct FeatureMatrix {
    pub ids: Vec<i64>,
    pub matrix: Array2<f32>,
}

impl FeatureMatrix {
    pub fn build(products: &[Product]) -> Self {
        let categories: BTreeSet<&str> = products
            .iter()
            .filter_map(|p| p.category.as_deref())
            .collect();
        let brands: BTreeSet<&str> = products
            .iter()
            .filter_map(|p| p.brand.as_deref())
            .collect();
        let categories: Vec<&str> = categories.into_iter().collect();
        let brands: Vec<&str> = brands.into_iter().collect();

        let columns = categories.len() + brands.len() + 2;
        let mut matrix = Array2::zeros((products.len(), columns));
        let mut ids = Vec::with_capacity(products.len());

        for (row, product) in products.iter().enumerate() {
            ids.push(product.id);

            if let Some(category) = product.category.as_deref() {
                if let Ok(idx) = categories.binary_search(&category) {
                    matrix[[row, idx]] = 1.0;
                }
            }
            if let Some(brand) = product.brand.as_deref() {
                if let Ok(idx) = brands.binary_search(&brand) {
                    matrix[[row, categories.len() + idx]] = 1.0;
                }
            }
            matrix[[row, columns - 2]] = product.price as f32;
            matrix[[row, columns - 1]] = product.rating.unwrap_or(DEFAULT_RATING) as f32;
        }

        Self { ids, matrix }
    }

    /// True when at least one feature column distinguishes two products.
    pub fn has_variance(&self) -> bool {
        self.matrix.columns().into_iter().any(|column| {
            let mut values = column.iter();
            match values.next() {
                Some(first) => values.any(|v| v != first),
                None => false,
            }
        })
    }
}

/// Learned strategy: standardize the feature matrix, reduce it to at most
/// `max_components` dimensions, and connect pairs whose reduced-vector
/// cosine similarity clears the threshold.
pub struct LearnedSimilarity {
    threshold: f32,
    max_components: usize,
    seed: u64,
}

impl LearnedSimilarity {
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
            max_components: config.max_components,
            seed: config.seed,
        }
    }

    pub fn build(&self, features: &FeatureMatrix) -> ProductGraph {
        let standardized = standardize(features.matrix.clone());
        let reduced = project(&standardized, self.max_components, self.seed);
        let rows: Vec<Vec<f32>> = reduced.outer_iter().map(|row| row.to_vec()).collect();
        let rows = &rows;
        let ids = &features.ids;
        let n = ids.len();
        let threshold = self.threshold;

        let edges: Vec<(i64, i64, f32)> = (0..n)
            .into_par_iter()
            .flat_map_iter(move |i| {
                ((i + 1)..n).filter_map(move |j| {
                    let score = cosine_similarity(&rows[i], &rows[j]);
                    (score > threshold).then_some((ids[i], ids[j], score))
                })
            })
            .collect();

        let mut graph = ProductGraph::new();
        for (a, b, score) in edges {
            graph.insert_symmetric(a, b, score);
        }
        graph.finalize()
    }
}

/// Fallback strategy: hand-weighted attribute rules. Same known category
/// scores 0.4, same known brand 0.3, and up to 0.2 for price proximity,
/// capped at 1.0.
pub struct RuleBasedSimilarity {
    threshold: f32,
}

impl RuleBasedSimilarity {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn build(&self, products: &[Product]) -> ProductGraph {
        let mut graph = ProductGraph::new();

        for (i, a) in products.iter().enumerate() {
            for b in &products[i + 1..] {
                let score = Self::score(a, b);
                if score > self.threshold {
                    graph.insert_symmetric(a.id, b.id, score);
                }
            }
        }
        graph.finalize()
    }

    pub fn score(a: &Product, b: &Product) -> f32 {
        let mut score = 0.0;

        if let (Some(ca), Some(cb)) = (a.category.as_deref(), b.category.as_deref()) {
            if ca == cb {
                score += CATEGORY_WEIGHT;
            }
        }
        if let (Some(ba), Some(bb)) = (a.brand.as_deref(), b.brand.as_deref()) {
            if ba == bb {
                score += BRAND_WEIGHT;
            }
        }

        let max_price = a.price.max(b.price);
        if max_price > 0.0 {
            let proximity = 1.0 - (a.price - b.price).abs() / max_price;
            score += proximity as f32 * PRICE_WEIGHT;
        }

        score.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn product(id: i64, category: &str, brand: &str, price: f64) -> Product {
        Product {
            id,
            name: format!("product-{id}"),
            price,
            brand: Some(brand.to_string()),
            category: Some(category.to_string()),
            rating: Some(4.0),
            picture: None,
            stock: 5,
        }
    }

    fn training_config() -> TrainingConfig {
        Config::default().training
    }

    #[test]
    fn rule_score_prefers_shared_attributes() {
        let p1 = product(1, "phone", "X", 100.0);
        let p2 = product(2, "phone", "X", 110.0);
        let p3 = product(3, "case", "Y", 20.0);

        assert!(RuleBasedSimilarity::score(&p1, &p2) > RuleBasedSimilarity::score(&p1, &p3));
    }

    #[test]
    fn rule_score_is_capped_at_one() {
        let p1 = product(1, "phone", "X", 100.0);
        let p2 = product(2, "phone", "X", 100.0);

        let score = RuleBasedSimilarity::score(&p1, &p2);
        assert!(score <= 1.0);
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn rule_score_ignores_unknown_categories() {
        let mut p1 = product(1, "phone", "X", 100.0);
        let mut p2 = product(2, "phone", "Y", 100.0);
        p1.category = None;
        p2.category = None;

        // two unknown categories are not "the same category"
        let score = RuleBasedSimilarity::score(&p1, &p2);
        assert!((score - PRICE_WEIGHT).abs() < 1e-6);
    }

    #[test]
    fn fewer_than_two_products_yields_empty_graph() {
        let trainer = ContentSimilarityTrainer::new(&training_config());
        assert!(trainer.train(&[]).is_empty());
        assert!(trainer.train(&[product(1, "phone", "X", 10.0)]).is_empty());
    }

    #[test]
    fn degenerate_features_select_the_rule_strategy() {
        let trainer = ContentSimilarityTrainer::new(&training_config());
        // identical on every feature: no variance for the learned path,
        // and the rule score is 0.4 + 0.3 + 0.2 capped contributions
        let products = vec![
            product(1, "phone", "X", 50.0),
            product(2, "phone", "X", 50.0),
        ];

        let graph = trainer.train(&products);
        assert_eq!(graph.score(1, 2), Some(0.9));
        assert_eq!(graph.score(2, 1), Some(0.9));
    }

    #[test]
    fn learned_graph_is_symmetric() {
        let trainer = ContentSimilarityTrainer::new(&training_config());
        let products = vec![
            product(1, "phone", "X", 100.0),
            product(2, "phone", "X", 110.0),
            product(3, "phone", "Y", 95.0),
            product(4, "case", "Y", 15.0),
            product(5, "case", "Z", 18.0),
        ];

        let graph = trainer.train(&products);

        for &a in &[1, 2, 3, 4, 5] {
            if let Some(neighbors) = graph.neighbors(a) {
                for n in neighbors {
                    assert_eq!(graph.score(n.product_id, a), Some(n.score));
                }
            }
        }
    }

    #[test]
    fn learned_training_is_idempotent() {
        let trainer = ContentSimilarityTrainer::new(&training_config());
        let products = vec![
            product(1, "phone", "X", 100.0),
            product(2, "phone", "X", 110.0),
            product(3, "case", "Y", 15.0),
        ];

        assert_eq!(trainer.train(&products), trainer.train(&products));
    }
}
