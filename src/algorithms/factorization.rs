use crate::models::Interaction;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::f32::consts::PI;

/// Customer x product interaction strengths in sparse form. Only observed
/// cells are kept; unobserved cells are never treated as zero targets.
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    pub customers: Vec<i64>,
    pub products: Vec<i64>,
    cells: Vec<(usize, usize, f32)>,
}

impl InteractionMatrix {
    pub fn from_interactions(interactions: &[Interaction]) -> Self {
        let mut merged: BTreeMap<(i64, i64), f32> = BTreeMap::new();
        for row in interactions {
            *merged.entry((row.customer_id, row.product_id)).or_insert(0.0) +=
                row.strength as f32;
        }

        let mut customers: Vec<i64> = merged.keys().map(|(c, _)| *c).collect();
        customers.sort_unstable();
        customers.dedup();
        let mut products: Vec<i64> = merged.keys().map(|(_, p)| *p).collect();
        products.sort_unstable();
        products.dedup();

        let customer_index: BTreeMap<i64, usize> =
            customers.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let product_index: BTreeMap<i64, usize> =
            products.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let cells = merged
            .into_iter()
            .map(|((c, p), strength)| (customer_index[&c], product_index[&p], strength))
            .collect();

        Self {
            customers,
            products,
            cells,
        }
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn observed(&self) -> &[(usize, usize, f32)] {
        &self.cells
    }
}

/// Latent vectors learned from one factorization run, aligned with the
/// matrix's sorted customer/product id lists.
#[derive(Debug, Clone)]
pub struct Factorized {
    pub customer_vectors: Vec<DVector<f32>>,
    pub product_vectors: Vec<DVector<f32>>,
}

/// Gradient-descent matrix factorization over observed cells only, with L2
/// regularization on both vector sets. Initialization draws from a seeded
/// rng so repeated runs over the same data produce the same embeddings.
#[derive(Debug, Clone)]
pub struct MatrixFactorization {
    pub latent_dim: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub regularization: f32,
    pub seed: u64,
}

impl MatrixFactorization {
    pub fn new(
        latent_dim: usize,
        epochs: usize,
        learning_rate: f32,
        regularization: f32,
        seed: u64,
    ) -> Self {
        Self {
            latent_dim,
            epochs,
            learning_rate,
            regularization,
            seed,
        }
    }

    pub fn fit(&self, matrix: &InteractionMatrix) -> Factorized {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut customer_vectors: Vec<DVector<f32>> = (0..matrix.customer_count())
            .map(|_| self.initial_vector(&mut rng))
            .collect();
        let mut product_vectors: Vec<DVector<f32>> = (0..matrix.product_count())
            .map(|_| self.initial_vector(&mut rng))
            .collect();

        for _ in 0..self.epochs {
            for &(c, p, strength) in matrix.observed() {
                let prediction = customer_vectors[c].dot(&product_vectors[p]);
                let error = strength - prediction;

                let customer_step = (&product_vectors[p] * error
                    - &customer_vectors[c] * self.regularization)
                    * self.learning_rate;
                let product_step = (&customer_vectors[c] * error
                    - &product_vectors[p] * self.regularization)
                    * self.learning_rate;

                customer_vectors[c] += customer_step;
                product_vectors[p] += product_step;
            }
        }

        Factorized {
            customer_vectors,
            product_vectors,
        }
    }

    /// Mean squared reconstruction error over observed cells.
    pub fn mse(matrix: &InteractionMatrix, factorized: &Factorized) -> f32 {
        let cells = matrix.observed();
        if cells.is_empty() {
            return 0.0;
        }

        let total: f32 = cells
            .iter()
            .map(|&(c, p, strength)| {
                let prediction =
                    factorized.customer_vectors[c].dot(&factorized.product_vectors[p]);
                (strength - prediction).powi(2)
            })
            .sum();

        total / cells.len() as f32
    }

    fn initial_vector(&self, rng: &mut StdRng) -> DVector<f32> {
        let values = (0..self.latent_dim)
            .map(|_| {
                let u1: f32 = rng.gen();
                let u2: f32 = rng.gen();
                let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
                z0 * 0.1
            })
            .collect();
        DVector::from_vec(values)
    }
}
