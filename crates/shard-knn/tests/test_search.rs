mod common;

use core::{cell::Cell, time::Duration};

use float_cmp::assert_approx_eq;
use test_case::test_case;

use shard_knn::{
    cluster,
    data::{Table, TrainingShard},
    mesh::{ChannelMesh, Envelope, Message, Transport},
    synthetic::{random_table, TestFunction},
    KnnConfig, KnnError, Norm, Prediction, Worker, WorkerOutput,
};

fn owner_of_first(outputs: &[WorkerOutput]) -> &WorkerOutput {
    outputs.iter().find(|o| o.owned.contains(0)).unwrap()
}

#[test]
fn four_points_one_worker() {
    let queries = Table::from_rows(&[vec![1.4]], Some(&[1.5])).unwrap();
    let config = KnnConfig::new(1, 2).with_threads(1);

    let outputs = cluster::run_in_process(&config, &common::line(), &queries, 1).unwrap();
    let output = &outputs[0];

    let neighbors = &output.neighbors[0];
    assert_eq!(neighbors.len(), 2);
    assert_eq!(neighbors[0].index, Some(1));
    assert_approx_eq!(f64, neighbors[0].distance, 0.16, epsilon = 1e-12);
    assert_eq!(neighbors[1].index, Some(2));
    assert_approx_eq!(f64, neighbors[1].distance, 0.36, epsilon = 1e-12);
    assert_approx_eq!(f64, output.predictions[0], 1.5, epsilon = 1e-12);

    let summary = output.summary.as_ref().unwrap();
    assert_eq!(summary.queries, 1);
    assert_approx_eq!(f64, summary.mse, 0.0, epsilon = 1e-20);
}

#[test]
fn four_points_two_workers() {
    let queries = Table::from_rows(&[vec![1.4]], Some(&[1.5])).unwrap();
    let config = KnnConfig::new(1, 2).with_threads(1);

    let single = cluster::run_in_process(&config, &common::line(), &queries, 1).unwrap();
    let double = cluster::run_in_process(&config, &common::line(), &queries, 2).unwrap();
    assert_eq!(double.len(), 2);

    // A single query is owned by the last worker.
    assert_eq!(double[0].owned.count, 0);
    assert_eq!(double[1].owned.count, 1);
    assert_eq!(owner_of_first(&double).neighbors, single[0].neighbors);
    assert_eq!(owner_of_first(&double).predictions, single[0].predictions);

    // The coordinator reports even when it owns nothing.
    assert_eq!(double[0].summary.as_ref().unwrap().queries, 1);
    assert!(double[1].summary.is_none());
}

#[test]
fn k_equal_to_training_size_returns_everything() {
    let queries = Table::from_rows(&[vec![2.2], vec![-1.0]], Some(&[2.0, 0.0])).unwrap();
    let config = KnnConfig::new(1, 4).with_threads(2);

    for workers in 1..=3 {
        let outputs = cluster::run_in_process(&config, &common::line(), &queries, workers).unwrap();
        for output in &outputs {
            for neighbors in &output.neighbors {
                assert_eq!(neighbors.len(), 4);
                assert!(neighbors.iter().all(|n| !n.is_sentinel()));
                assert!(neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));

                let mut indices = neighbors.iter().filter_map(|n| n.index).collect::<Vec<_>>();
                indices.sort_unstable();
                assert_eq!(indices, vec![0, 1, 2, 3]);
            }
            for &p in &output.predictions {
                assert_approx_eq!(f64, p, 1.5, epsilon = 1e-12);
            }
        }
    }
}

#[test_case(1, 1; "one_worker_one_thread")]
#[test_case(2, 3; "two_workers")]
#[test_case(3, 2; "three_workers")]
#[test_case(5, 4; "five_workers")]
#[test_case(7, 1; "more_workers_than_some_shards_need")]
fn matches_brute_force(workers: usize, threads: usize) {
    let (dim, k) = (3, 6);
    let training = random_table(211, dim, TestFunction::Circle, 42).unwrap();
    let queries = random_table(23, dim, TestFunction::Circle, 43).unwrap();
    let config = KnnConfig::new(dim, k).with_threads(threads);

    let outputs = cluster::run_in_process(&config, &training, &queries, workers).unwrap();
    assert_eq!(outputs.iter().map(|o| o.owned.count).sum::<usize>(), queries.len());

    for output in &outputs {
        for (local, q) in output.owned.range().enumerate() {
            let expected = common::brute_force(&training, queries.point(q), k, Norm::SquaredEuclidean);
            let actual = output.neighbors[local]
                .iter()
                .map(|n| (n.index.unwrap(), n.distance))
                .collect::<Vec<_>>();
            assert_eq!(actual, expected, "query {q} with {workers} workers");

            let value = output.neighbors[local].iter().map(|n| n.value).collect::<Vec<_>>();
            let expected_values = expected.iter().map(|&(i, _)| training.output(i)).collect::<Vec<_>>();
            assert_eq!(value, expected_values);
        }
    }
}

#[test_case(Norm::Chebyshev; "chebyshev")]
#[test_case(Norm::Manhattan; "manhattan")]
#[test_case(Norm::Minkowski(3); "minkowski_3")]
fn other_norms(norm: Norm) {
    let (dim, k) = (2, 4);
    let training = random_table(97, dim, TestFunction::Rastrigin, 1).unwrap();
    let queries = random_table(9, dim, TestFunction::Rastrigin, 2).unwrap();
    let config = KnnConfig::new(dim, k).with_norm(norm).with_threads(2);

    let outputs = cluster::run_in_process(&config, &training, &queries, 3).unwrap();
    for output in &outputs {
        for (local, q) in output.owned.range().enumerate() {
            let expected = common::brute_force(&training, queries.point(q), k, norm)
                .into_iter()
                .map(|(i, _)| i)
                .collect::<Vec<_>>();
            let actual = output.neighbors[local].iter().filter_map(|n| n.index).collect::<Vec<_>>();
            assert_eq!(actual, expected);
        }
    }
}

#[test_case(Prediction::Mean; "mean")]
#[test_case(Prediction::InverseDistance; "inverse_distance")]
#[test_case(Prediction::Nearest; "nearest")]
fn predictions_do_not_depend_on_worker_count(prediction: Prediction) {
    let training = random_table(150, 2, TestFunction::Himmelblau, 3).unwrap();
    let queries = random_table(12, 2, TestFunction::Himmelblau, 4).unwrap();
    let config = KnnConfig::new(2, 8).with_prediction(prediction).with_threads(3);

    let collect = |workers| {
        cluster::run_in_process(&config, &training, &queries, workers)
            .unwrap()
            .into_iter()
            .flat_map(|o| o.predictions)
            .map(f64::to_bits)
            .collect::<Vec<_>>()
    };

    let baseline = collect(1);
    assert_eq!(baseline.len(), 12);
    for workers in [2, 3, 4] {
        assert_eq!(collect(workers), baseline, "{workers} workers");
    }
    for _ in 0..3 {
        assert_eq!(collect(3), baseline);
    }
}

#[test]
fn metrics_cover_every_query() {
    let training = random_table(300, 2, TestFunction::Circle, 5).unwrap();
    let queries = random_table(40, 2, TestFunction::Circle, 6).unwrap();
    let config = KnnConfig::new(2, 5).with_threads(2);

    let outputs = cluster::run_in_process(&config, &training, &queries, 3).unwrap();
    let summary = outputs[0].summary.clone().unwrap();

    let predictions = outputs.iter().flat_map(|o| o.predictions.iter().copied()).collect::<Vec<_>>();
    let truths = queries.outputs();
    #[allow(clippy::cast_precision_loss)]
    let mse = truths.iter().zip(&predictions).map(|(t, p)| (t - p) * (t - p)).sum::<f64>() / truths.len() as f64;

    assert_eq!(summary.queries, 40);
    assert_eq!(summary.workers, 3);
    assert_approx_eq!(f64, summary.mse, mse, epsilon = 1e-12);
    assert!(summary.r2.unwrap() > 0.5, "{summary:?}");
}

#[test]
fn a_silent_peer_times_out() {
    let training = common::line();
    let queries = Table::from_rows(&[vec![0.5], vec![2.5]], Some(&[0.5, 2.5])).unwrap();
    let config = KnnConfig::new(1, 1)
        .with_threads(1)
        .with_recv_timeout(Duration::from_millis(50));

    let mut endpoints = ChannelMesh::build(2);
    let _silent = endpoints.pop().unwrap();
    let endpoint = endpoints.pop().unwrap();

    let shard = TrainingShard::from_full(&training, shard_knn::Partition { offset: 0, count: 2 }).unwrap();
    let err = Worker::new(config, shard, queries, endpoint).unwrap().run().unwrap_err();
    assert!(matches!(err, KnnError::Timeout { worker: 0, .. }), "{err}");
}

/// Holds back the first message it is asked to send.
struct SlowStart<T> {
    inner: T,
    delay: Cell<Option<Duration>>,
}

impl<T: Transport> Transport for SlowStart<T> {
    fn worker(&self) -> usize {
        self.inner.worker()
    }

    fn num_workers(&self) -> usize {
        self.inner.num_workers()
    }

    fn send(&self, to: usize, message: Message) -> shard_knn::Result<()> {
        if let Some(delay) = self.delay.take() {
            std::thread::sleep(delay);
        }
        self.inner.send(to, message)
    }

    fn recv(&self, timeout: Option<Duration>) -> shard_knn::Result<Option<Envelope>> {
        self.inner.recv(timeout)
    }
}

#[test]
fn first_query_latency_includes_the_wait_for_peers() {
    let training = common::line();
    let queries = Table::from_rows(&[vec![0.5], vec![2.5]], Some(&[0.5, 2.5])).unwrap();
    let config = KnnConfig::new(1, 1).with_threads(1);
    let delay = Duration::from_millis(300);

    let mut endpoints = ChannelMesh::build(2);
    let slow = SlowStart {
        inner: endpoints.pop().unwrap(),
        delay: Cell::new(Some(delay)),
    };
    let fast = endpoints.pop().unwrap();

    let first = TrainingShard::from_full(&training, shard_knn::Partition { offset: 0, count: 2 }).unwrap();
    let second = TrainingShard::from_full(&training, shard_knn::Partition { offset: 2, count: 2 }).unwrap();

    let (coordinator, _) = std::thread::scope(|s| {
        let slow_queries = queries.clone();
        let peer_config = config.clone();
        let peer = s.spawn(move || Worker::new(peer_config, second, slow_queries, slow).unwrap().run().unwrap());
        let coordinator = Worker::new(config, first, queries.clone(), fast).unwrap().run().unwrap();
        (coordinator, peer.join().unwrap())
    });

    let summary = coordinator.summary.unwrap();
    // The two workers start their exchange at slightly different moments.
    assert!(summary.first_query >= delay * 2 / 3, "{:?}", summary.first_query);
    assert!(summary.elapsed >= summary.first_query, "{:?}", summary.elapsed);
}

#[test]
fn rejects_k_larger_than_training_set() {
    let queries = Table::from_rows(&[vec![1.0]], Some(&[1.0])).unwrap();
    let err = cluster::run_in_process(&KnnConfig::new(1, 5), &common::line(), &queries, 2).unwrap_err();
    assert!(matches!(err, KnnError::Config(_)), "{err}");
}
