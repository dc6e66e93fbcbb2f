use core::time::Duration;
use std::net::TcpListener;

use rand::prelude::*;
use tempdir::TempDir;

use shard_knn::{
    cluster,
    data::{io, Table, TrainingShard},
    mesh::TcpMesh,
    synthetic::{random_rows, random_table, TestFunction, LOWER, UPPER},
    KnnConfig, KnnError, Partition, Worker,
};

fn write_dataset(dir: &TempDir, dim: usize, train: usize, queries: usize) -> (std::path::PathBuf, std::path::PathBuf) {
    let mut rng = StdRng::seed_from_u64(42);
    let train_path = dir.path().join("train.bin");
    let query_path = dir.path().join("query.bin");
    io::store_binary(&train_path, &random_rows(train, dim, (LOWER, UPPER), TestFunction::Circle, &mut rng)).unwrap();
    io::store_binary(&query_path, &random_rows(queries, dim, (LOWER, UPPER), TestFunction::Circle, &mut rng)).unwrap();
    (train_path, query_path)
}

#[test]
fn files_match_memory() {
    let tmp = TempDir::new("knn-files").unwrap();
    let (train_path, query_path) = write_dataset(&tmp, 4, 500, 30);
    let config = KnnConfig::new(4, 8).with_threads(2);

    let from_files = cluster::run_files(&config, &train_path, &query_path, None, 3).unwrap();

    let training = Table::new(io::load_binary(&train_path, 500 * 5, 0).unwrap(), 4, true).unwrap();
    let queries = Table::new(io::load_binary(&query_path, 30 * 5, 0).unwrap(), 4, true).unwrap();
    let in_memory = cluster::run_in_process(&config, &training, &queries, 3).unwrap();

    for (a, b) in from_files.iter().zip(&in_memory) {
        assert_eq!(a.owned, b.owned);
        assert_eq!(a.neighbors, b.neighbors);
        assert_eq!(a.predictions, b.predictions);
    }
    assert_eq!(from_files[0].summary.as_ref().unwrap().queries, 30);
}

#[test]
fn prediction_dump_is_in_query_order() {
    let tmp = TempDir::new("knn-dump").unwrap();
    let (train_path, query_path) = write_dataset(&tmp, 2, 200, 17);
    let dump_path = tmp.path().join("predictions.txt");

    // Leftovers from a longer dump must not survive.
    std::fs::write(&dump_path, "x".repeat(10_000)).unwrap();

    let config = KnnConfig::new(2, 4).with_threads(1);
    let outputs = cluster::run_files(&config, &train_path, &query_path, Some(&dump_path), 4).unwrap();

    let text = std::fs::read_to_string(&dump_path).unwrap();
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 17);
    assert!(text.ends_with('\n'));

    let predictions = outputs.iter().flat_map(|o| o.predictions.iter().copied()).collect::<Vec<_>>();
    let queries = io::load_rows(&query_path, 2, true, Partition { offset: 0, count: 17 }).unwrap();
    for (q, line) in lines.iter().enumerate() {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        assert_eq!(fields.len(), 3, "{line}");
        assert_eq!(fields[0], format!("{:.5}", queries.output(q)));
        assert_eq!(fields[1], format!("{:.5}", predictions[q]));
    }
}

#[test]
fn explicit_counts_must_match_the_files() {
    let tmp = TempDir::new("knn-counts").unwrap();
    let (train_path, query_path) = write_dataset(&tmp, 2, 50, 5);

    let ok = KnnConfig::new(2, 3).with_counts(50, 5).with_threads(1);
    assert!(cluster::run_files(&ok, &train_path, &query_path, None, 2).is_ok());

    let wrong = KnnConfig::new(2, 3).with_counts(60, 5).with_threads(1);
    let err = cluster::run_files(&wrong, &train_path, &query_path, None, 2).unwrap_err();
    assert!(matches!(err, KnnError::SizeMismatch { .. }), "{err}");

    // Rows of 4 values do not divide a file of 50 * 3 values.
    let err = cluster::run_files(&KnnConfig::new(3, 3), &train_path, &query_path, None, 2).unwrap_err();
    assert!(matches!(err, KnnError::SizeMismatch { .. }), "{err}");
}

#[test]
fn missing_file_is_an_io_error() {
    let tmp = TempDir::new("knn-missing").unwrap();
    let (train_path, _) = write_dataset(&tmp, 2, 10, 2);
    let missing = tmp.path().join("nope.bin");

    let err = cluster::run_files(&KnnConfig::new(2, 1), &train_path, &missing, None, 1).unwrap_err();
    assert!(matches!(err, KnnError::Io { .. }), "{err}");
    assert!(err.to_string().contains("nope.bin"), "{err}");
}

#[test]
fn tcp_mesh_matches_in_process() {
    let (dim, k, workers) = (3, 5, 3);
    let training = random_table(120, dim, TestFunction::Rosenbrock, 8).unwrap();
    let queries = random_table(10, dim, TestFunction::Rosenbrock, 9).unwrap();
    let config = KnnConfig::new(dim, k)
        .with_threads(2)
        .with_recv_timeout(Duration::from_secs(30));

    let expected = cluster::run_in_process(&config, &training, &queries, workers).unwrap();

    let listeners = (0..workers)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect::<Vec<_>>();
    let peers = listeners.iter().map(|l| l.local_addr().unwrap()).collect::<Vec<_>>();

    let actual = std::thread::scope(|s| {
        let handles = listeners
            .into_iter()
            .zip(Partition::split(training.len(), workers))
            .enumerate()
            .map(|(worker, (listener, partition))| {
                let (config, training, queries, peers) = (&config, &training, &queries, &peers);
                s.spawn(move || {
                    let mesh = TcpMesh::with_listener(worker, listener, peers, Duration::from_secs(30)).unwrap();
                    let shard = TrainingShard::from_full(training, partition).unwrap();
                    Worker::new(config.clone(), shard, queries.clone(), mesh).unwrap().run().unwrap()
                })
            })
            .collect::<Vec<_>>();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });

    for (a, b) in actual.iter().zip(&expected) {
        assert_eq!(a.owned, b.owned);
        assert_eq!(a.neighbors, b.neighbors);
        assert_eq!(a.predictions, b.predictions);
    }
    assert_eq!(actual[0].summary.as_ref().unwrap().queries, 10);
}
