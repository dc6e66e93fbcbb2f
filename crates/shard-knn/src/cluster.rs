//! Running every worker of a mesh as a thread of one process.

use std::path::Path;

use crate::{
    data::{Table, TrainingShard},
    mesh::ChannelMesh,
    KnnConfig, KnnError, Partition, Result, Worker, WorkerOutput,
};

/// Splits `training` among `workers` in-process workers and runs a search
/// for every query. Returns each worker's output, in worker order.
///
/// # Errors
///
/// * If `workers` is zero.
/// * If there are fewer training points than `k`.
/// * Any error from [`Worker::new`] or [`Worker::run`]. When several workers
///   fail, the error of the lowest-numbered one is returned.
pub fn run_in_process(config: &KnnConfig, training: &Table, queries: &Table, workers: usize) -> Result<Vec<WorkerOutput>> {
    if workers == 0 {
        return Err(KnnError::Config("there must be at least one worker".to_string()));
    }
    if training.len() < config.k {
        return Err(KnnError::Config(format!(
            "k ({}) exceeds the number of training points ({})",
            config.k,
            training.len()
        )));
    }

    let endpoints = ChannelMesh::build(workers);
    let members = Partition::split(training.len(), workers)
        .into_iter()
        .zip(endpoints)
        .map(|(partition, endpoint)| {
            let shard = TrainingShard::from_full(training, partition)?;
            Worker::new(config.clone(), shard, queries.clone(), endpoint)
        })
        .collect::<Result<Vec<_>>>()?;

    run_all(members)
}

/// Like [`run_in_process`], but every worker loads its own shard from
/// `train_path` and all queries from `query_path`, optionally writing the
/// prediction dump to `predictions_path`.
///
/// Every worker loads before any starts running, so a bad file fails the
/// run before any message is sent.
///
/// # Errors
///
/// * If `workers` is zero.
/// * Any error from [`Worker::load`] or [`Worker::run`].
pub fn run_files<P: AsRef<Path>>(
    config: &KnnConfig,
    train_path: P,
    query_path: P,
    predictions_path: Option<P>,
    workers: usize,
) -> Result<Vec<WorkerOutput>> {
    if workers == 0 {
        return Err(KnnError::Config("there must be at least one worker".to_string()));
    }

    let members = ChannelMesh::build(workers)
        .into_iter()
        .map(|endpoint| {
            let worker = Worker::load(config.clone(), train_path.as_ref(), query_path.as_ref(), endpoint)?;
            Ok(match &predictions_path {
                Some(path) => worker.with_predictions_path(path),
                None => worker,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    run_all(members)
}

/// Runs each worker on its own thread and collects the outputs in worker
/// order.
fn run_all(members: Vec<Worker<ChannelMesh>>) -> Result<Vec<WorkerOutput>> {
    ftlog::info!("Running {} in-process workers", members.len());
    let results = std::thread::scope(|s| {
        let handles = members.into_iter().map(|w| s.spawn(move || w.run())).collect::<Vec<_>>();
        handles
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                h.join()
                    .unwrap_or_else(|_| Err(KnnError::Transport(format!("worker {i} panicked"))))
            })
            .collect::<Vec<_>>()
    });

    results.into_iter().collect()
}
