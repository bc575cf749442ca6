//! Criterion benchmarks for morpho-rf: training, prediction and cross-validation.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use morpho_rf::{CrossValidation, RandomForestConfig};

fn make_catalogue(n_samples: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let n_features = 13;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % 3;
        labels.push(class);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 4 { class as f64 * 1.5 } else { 0.0 };
                base + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    let names = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, labels, names)
}

fn bench_train(c: &mut Criterion) {
    let (features, labels, names) = make_catalogue(780, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);
    c.bench_function("rf_train_780x13_50trees", |b| {
        b.iter(|| cfg.fit(&features, &labels, &names).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let (features, labels, names) = make_catalogue(780, 42);
    let forest = RandomForestConfig::new(50)
        .unwrap()
        .with_seed(42)
        .fit(&features, &labels, &names)
        .unwrap()
        .into_forest();
    c.bench_function("rf_predict_batch_780x13_50trees", |b| {
        b.iter(|| forest.predict_batch(&features).unwrap());
    });
}

fn bench_cross_val_predict(c: &mut Criterion) {
    let (features, labels, names) = make_catalogue(780, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);
    let cv = CrossValidation::new(10).unwrap();
    c.bench_function("rf_cv10_780x13_50trees", |b| {
        b.iter(|| cv.cross_val_predict(&cfg, &features, &labels, &names).unwrap());
    });
}

criterion_group!(benches, bench_train, bench_predict_batch, bench_cross_val_predict);
criterion_main!(benches);
