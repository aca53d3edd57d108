use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shoprec::algorithms::factorization::{InteractionMatrix, MatrixFactorization};
use shoprec::algorithms::{ContentSimilarityTrainer, CoPurchaseTrainer};
use shoprec::{BasketLine, Config, Interaction, Product};

fn synthetic_interactions(customers: i64, products: i64) -> Vec<Interaction> {
    let mut interactions = Vec::new();
    for c in 0..customers {
        for p in 0..products {
            if (c + p) % 3 == 0 {
                interactions.push(Interaction {
                    customer_id: c,
                    product_id: 1000 + p,
                    strength: ((c + p) % 5 + 1) as f64,
                });
            }
        }
    }
    interactions
}

fn synthetic_baskets(orders: i64) -> Vec<BasketLine> {
    let mut baskets = Vec::new();
    for o in 0..orders {
        for p in 0..4 {
            baskets.push(BasketLine {
                order_id: o,
                product_id: 1000 + (o + p) % 20,
            });
        }
    }
    baskets
}

fn synthetic_products(count: i64) -> Vec<Product> {
    let categories = ["phone", "case", "charger", "headset"];
    let brands = ["X", "Y", "Z"];

    (0..count)
        .map(|i| Product {
            id: i,
            name: format!("product-{i}"),
            price: 10.0 + (i % 40) as f64 * 2.5,
            brand: Some(brands[(i % 3) as usize].to_string()),
            category: Some(categories[(i % 4) as usize].to_string()),
            rating: Some(3.0 + (i % 3) as f64 * 0.5),
            picture: None,
            stock: 5,
        })
        .collect()
}

fn benchmark_factorization(c: &mut Criterion) {
    let interactions = synthetic_interactions(40, 25);
    let matrix = InteractionMatrix::from_interactions(&interactions);
    let factorizer = MatrixFactorization::new(10, 100, 0.01, 0.01, 42);

    c.bench_function("matrix_factorization_fit", |b| {
        b.iter(|| black_box(factorizer.fit(&matrix)));
    });
}

fn benchmark_copurchase_training(c: &mut Criterion) {
    let config = Config::default().training;
    let trainer = CoPurchaseTrainer::new(&config);
    let interactions = synthetic_interactions(40, 25);
    let baskets = synthetic_baskets(200);

    c.bench_function("copurchase_train", |b| {
        b.iter(|| black_box(trainer.train(&interactions, &baskets)));
    });
}

fn benchmark_content_training(c: &mut Criterion) {
    let config = Config::default().training;
    let trainer = ContentSimilarityTrainer::new(&config);
    let products = synthetic_products(100);

    c.bench_function("content_similarity_train", |b| {
        b.iter(|| black_box(trainer.train(&products)));
    });
}

criterion_group!(
    benches,
    benchmark_factorization,
    benchmark_copurchase_training,
    benchmark_content_training
);
criterion_main!(benches);
