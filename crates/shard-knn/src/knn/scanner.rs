//! Brute-force scan of one worker's training shard.

use std::time::{Duration, Instant};

use distances::Norm;
use rayon::prelude::*;

use crate::{data::Table, data::TrainingShard, Partition};

use super::{Neighbor, TopK};

/// Scans every query against every point of one training shard.
pub struct ShardScanner<'a> {
    /// The shard to scan.
    shard: &'a TrainingShard,
    /// The norm used to rank neighbors.
    norm: Norm,
    /// Number of neighbors per query.
    k: usize,
}

/// The result of scanning a block of queries.
#[derive(Clone, Debug, Default)]
pub struct LocalScan {
    /// One selector per query, in query order.
    pub candidates: Vec<TopK>,
    /// Time spent on each query, in query order.
    pub elapsed: Vec<Duration>,
}

impl<'a> ShardScanner<'a> {
    /// A scanner over `shard`.
    #[must_use]
    pub const fn new(shard: &'a TrainingShard, norm: Norm, k: usize) -> Self {
        Self { shard, norm, k }
    }

    /// The local top-k for one query point, tagged with global indices.
    #[must_use]
    pub fn scan_one(&self, query: &[f64]) -> TopK {
        let table = self.shard.table();
        let mut top_k = TopK::new(self.k);
        for (i, point) in table.points().enumerate() {
            let distance = self.norm.distance(query, point);
            if distance < top_k.threshold() {
                top_k.offer(Neighbor::new(self.shard.global_index(i), distance, table.output(i)));
            }
        }
        top_k
    }

    /// Parallel version of [`ShardScanner::scan_one`], splitting the shard
    /// across threads and merging the per-thread selectors.
    ///
    /// The kept set matches [`ShardScanner::scan_one`] up to ties at the k-th
    /// distance.
    #[must_use]
    pub fn par_scan_one(&self, query: &[f64]) -> TopK {
        let table = self.shard.table();
        (0..table.len())
            .into_par_iter()
            .fold(
                || TopK::new(self.k),
                |mut top_k, i| {
                    let distance = self.norm.distance(query, table.point(i));
                    if distance < top_k.threshold() {
                        top_k.offer(Neighbor::new(self.shard.global_index(i), distance, table.output(i)));
                    }
                    top_k
                },
            )
            .reduce(
                || TopK::new(self.k),
                |mut a, b| {
                    a.merge(b.slots());
                    a
                },
            )
    }

    /// Scans every query, splitting the queries into `blocks` contiguous
    /// blocks that run in parallel on the current rayon pool. Each block
    /// keeps its own selectors, so nothing is shared between threads but the
    /// read-only data.
    ///
    /// With fewer queries than blocks, each query is scanned with
    /// [`ShardScanner::par_scan_one`] instead.
    #[must_use]
    pub fn scan(&self, queries: &Table, blocks: usize) -> LocalScan {
        let blocks = blocks.max(1);
        let timed = if queries.len() < blocks {
            queries
                .points()
                .map(|q| {
                    let start = Instant::now();
                    (self.par_scan_one(q), start.elapsed())
                })
                .collect::<Vec<_>>()
        } else {
            Partition::split(queries.len(), blocks)
                .into_par_iter()
                .map(|block| {
                    block
                        .range()
                        .map(|i| {
                            let start = Instant::now();
                            (self.scan_one(queries.point(i)), start.elapsed())
                        })
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        };

        let (candidates, elapsed) = timed.into_iter().unzip();
        LocalScan { candidates, elapsed }
    }
}
