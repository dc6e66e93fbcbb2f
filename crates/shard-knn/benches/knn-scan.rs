use criterion::*;

use shard_knn::{
    cluster,
    data::TrainingShard,
    synthetic::{random_table, TestFunction},
    KnnConfig, Norm, ShardScanner,
};

fn scan(c: &mut Criterion) {
    let dim = 8;
    let training = random_table(20_000, dim, TestFunction::Circle, 42).unwrap();
    let queries = random_table(64, dim, TestFunction::Circle, 43).unwrap();
    let shard = TrainingShard::new(training.clone(), 0);

    let mut group = c.benchmark_group("ShardScan");
    group.sample_size(10);
    for k in [1, 10, 32, 100] {
        let scanner = ShardScanner::new(&shard, Norm::SquaredEuclidean, k);

        let id = BenchmarkId::new("sequential", k);
        group.bench_with_input(id, &k, |b, _| b.iter(|| black_box(scanner.scan(&queries, 1))));

        let id = BenchmarkId::new("blocked", k);
        group.bench_with_input(id, &k, |b, _| b.iter(|| black_box(scanner.scan(&queries, 8))));
    }
    group.finish();

    let mut group = c.benchmark_group("InProcessCluster");
    group.sample_size(10);
    for workers in [1, 2, 4] {
        let config = KnnConfig::new(dim, 32).with_threads(2);
        let id = BenchmarkId::new("workers", workers);
        group.bench_with_input(id, &workers, |b, &w| {
            b.iter(|| black_box(cluster::run_in_process(&config, &training, &queries, w).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, scan);
criterion_main!(benches);
