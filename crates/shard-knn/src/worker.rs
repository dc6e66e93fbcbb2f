//! One worker of a run: its data, its mailbox, and the pipeline it runs.

use core::time::Duration;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use crate::{
    data::{io, Table, TrainingShard},
    knn::LocalScan,
    mesh::{Mailbox, Transport},
    metrics::{PartialMetrics, Summary},
    protocol, report, KnnConfig, KnnError, Neighbor, Ownership, Partition, Result, ShardScanner,
};

/// What a worker hands back at the end of a run.
#[derive(Clone, Debug)]
pub struct WorkerOutput {
    /// The worker's number.
    pub worker: usize,
    /// The queries this worker owns.
    pub owned: Partition,
    /// The global neighbors of each owned query, sorted by ascending
    /// distance.
    pub neighbors: Vec<Vec<Neighbor>>,
    /// The prediction for each owned query.
    pub predictions: Vec<f64>,
    /// The run's metrics. Only the coordinator has them.
    pub summary: Option<Summary>,
}

/// Everything one worker needs for a run, built once and consumed by
/// [`Worker::run`].
pub struct Worker<T: Transport> {
    /// The run configuration.
    config: KnnConfig,
    /// This worker's slice of the training set.
    shard: TrainingShard,
    /// Every query, with its true output if the rows carry one.
    queries: Table,
    /// The connection to the other workers.
    mailbox: Mailbox<T>,
    /// Which worker owns which query.
    ownership: Ownership,
    /// Where to write the prediction dump, if anywhere.
    predictions_path: Option<PathBuf>,
}

impl<T: Transport> Worker<T> {
    /// Assembles a worker from data already in memory.
    ///
    /// # Errors
    ///
    /// * If the configuration is invalid.
    /// * If the shard or the queries do not have `config.dim` dimensions.
    /// * If there are no queries.
    pub fn new(config: KnnConfig, shard: TrainingShard, queries: Table, transport: T) -> Result<Self> {
        config.validate()?;
        if shard.table().dim() != config.dim {
            return Err(KnnError::size("training dimensions", config.dim, shard.table().dim()));
        }
        if queries.dim() != config.dim {
            return Err(KnnError::size("query dimensions", config.dim, queries.dim()));
        }
        if queries.is_empty() {
            return Err(KnnError::Config("there are no queries".to_string()));
        }

        let ownership = Ownership::new(queries.len(), transport.num_workers());
        let mailbox = Mailbox::new(transport, config.recv_timeout);
        Ok(Self {
            config,
            shard,
            queries,
            mailbox,
            ownership,
            predictions_path: None,
        })
    }

    /// Loads this worker's training shard and every query from files in the
    /// flat binary format, then assembles the worker.
    ///
    /// Row counts missing from the configuration are inferred from the file
    /// lengths. Counts that are given must match the files exactly.
    ///
    /// # Errors
    ///
    /// * If the configuration is invalid.
    /// * If a file cannot be read or does not hold whole rows.
    /// * If a file does not hold the configured number of rows.
    /// * If there are fewer training points than `k`.
    pub fn load<P: AsRef<Path>>(config: KnnConfig, train_path: P, query_path: P, transport: T) -> Result<Self> {
        config.validate()?;
        let (train_path, query_path) = (train_path.as_ref(), query_path.as_ref());
        let stride = config.stride();

        let train_total = rows_in(train_path, config.train_count, stride)?;
        if train_total < config.k {
            return Err(KnnError::Config(format!(
                "k ({}) exceeds the number of training points ({train_total}) in {train_path:?}",
                config.k
            )));
        }
        let query_total = rows_in(query_path, config.query_count, stride)?;

        let me = transport.worker();
        let partition = Partition::of(train_total, transport.num_workers(), me);
        ftlog::info!(
            "Worker {me} loading training rows {:?} of {train_total} from {train_path:?}...",
            partition.range()
        );
        let shard = TrainingShard::new(io::load_rows(train_path, config.dim, config.surrogates, partition)?, partition.offset);

        ftlog::info!("Worker {me} loading {query_total} queries from {query_path:?}...");
        let queries = io::load_rows(
            query_path,
            config.dim,
            config.surrogates,
            Partition {
                offset: 0,
                count: query_total,
            },
        )?;

        Self::new(config, shard, queries, transport)
    }

    /// Also writes the per-query predictions to `path` during the run.
    #[must_use]
    pub fn with_predictions_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.predictions_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// This worker's number.
    pub fn worker(&self) -> usize {
        self.mailbox.worker()
    }

    /// Runs the whole pipeline: scan the shard, exchange and merge candidate
    /// sets, predict and score the owned queries, and reduce the scores on
    /// the coordinator. Ends at a barrier, so no worker returns before every
    /// worker has finished sending.
    ///
    /// # Errors
    ///
    /// * If the thread pool cannot be built.
    /// * Any transport, protocol, or timeout error from the exchange.
    /// * If the prediction dump cannot be written.
    pub fn run(mut self) -> Result<WorkerOutput> {
        let start = Instant::now();
        let me = self.worker();
        let KnnConfig {
            k,
            norm,
            threads,
            prediction,
            ..
        } = self.config;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| KnnError::Config(format!("cannot build a pool of {threads} threads: {e}")))?;

        let scanner = ShardScanner::new(&self.shard, norm, k);
        let LocalScan { candidates, elapsed } = pool.install(|| scanner.scan(&self.queries, threads));
        ftlog::info!(
            "Worker {me} scanned {} queries against {} training points with {threads} threads in {:.3?}",
            self.queries.len(),
            self.shard.table().len(),
            start.elapsed()
        );

        let owned = self.ownership.owned_by(me);
        let merged = protocol::exchange(&mut self.mailbox, &self.ownership, candidates)?;
        ftlog::info!(
            "Worker {me} merged candidates for queries {:?}, the first after {:.3?}",
            owned.range(),
            merged.first_wait
        );

        let mut partial = PartialMetrics::new();
        let mut neighbors = Vec::with_capacity(owned.count);
        let mut predictions = Vec::with_capacity(owned.count);
        let mut first_query = Duration::ZERO;
        for (query, top_k) in owned.range().zip(merged.owned) {
            let predict_start = Instant::now();
            let sorted = top_k.into_sorted();
            let value = prediction.predict(&sorted, norm);
            if query == owned.offset {
                first_query = elapsed[query] + merged.first_wait + predict_start.elapsed();
            }

            partial.record(self.queries.output(query), value);
            neighbors.push(sorted);
            predictions.push(value);
        }

        if let Some(path) = self.predictions_path.take() {
            let truths = owned.range().map(|q| self.queries.output(q)).collect::<Vec<_>>();
            let text = report::format_predictions(&truths, &predictions);
            report::write_predictions(&mut self.mailbox, path, &text)?;
        }

        let partial = partial.with_timings(start.elapsed(), first_query);
        let summary = self
            .mailbox
            .reduce_to_coordinator(partial)?
            .map(|total| Summary::from_partial(&total, &self.queries.outputs()));
        if summary.is_some() {
            ftlog::info!("Worker {me} reduced the metrics of every worker");
        }

        self.mailbox.barrier()?;
        ftlog::info!("Worker {me} finished in {:.3?}", start.elapsed());

        Ok(WorkerOutput {
            worker: me,
            owned,
            neighbors,
            predictions,
            summary,
        })
    }
}

/// The number of rows in a file: checked against `expected` when given,
/// inferred from the file length otherwise.
fn rows_in(path: &Path, expected: Option<usize>, stride: usize) -> Result<usize> {
    match expected {
        Some(rows) => io::check_rows(path, rows, stride).map(|()| rows),
        None => io::count_rows(path, stride),
    }
}
