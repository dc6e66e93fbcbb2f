//! Splitting index ranges among workers and threads.
//!
//! Both the training set and the query set are cut into contiguous blocks of
//! `total / parts` indices, with the last block also taking the remaining
//! `total % parts`.

use core::ops::Range;

use serde::{Deserialize, Serialize};

/// A contiguous range `[offset, offset + count)` of a global index space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// First global index in the range.
    pub offset: usize,
    /// Number of indices in the range.
    pub count: usize,
}

impl Partition {
    /// The block owned by `part` when `total` indices are split into `parts`
    /// blocks.
    ///
    /// When `total < parts`, every block but the last is empty.
    ///
    /// # Panics
    ///
    /// If `part >= parts`.
    #[must_use]
    pub fn of(total: usize, parts: usize, part: usize) -> Self {
        assert!(part < parts, "part {part} is out of range for {parts} parts");
        let base = total / parts;
        let offset = part * base;
        let count = if part == parts - 1 { base + total % parts } else { base };
        Self { offset, count }
    }

    /// All blocks, in order, when `total` indices are split into `parts`
    /// blocks.
    #[must_use]
    pub fn split(total: usize, parts: usize) -> Vec<Self> {
        (0..parts).map(|part| Self::of(total, parts, part)).collect()
    }

    /// One past the last index in the range.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.count
    }

    /// The indices in the range.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Whether `index` is in the range.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        self.offset <= index && index < self.end()
    }

    /// Whether the range is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// The worker responsible for query `query` when queries are assigned in
/// blocks of `block_size`, with the last worker absorbing the remainder.
///
/// A `block_size` of zero (fewer queries than workers) assigns every query to
/// the last worker.
#[must_use]
pub const fn owner_of(query: usize, block_size: usize, workers: usize) -> usize {
    let last = workers.saturating_sub(1);
    if block_size == 0 {
        return last;
    }
    let owner = query / block_size;
    if owner > last {
        last
    } else {
        owner
    }
}

/// The query-to-worker assignment agreed by every worker before a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ownership {
    /// Total number of queries.
    queries: usize,
    /// Number of workers.
    workers: usize,
}

impl Ownership {
    /// Assigns `queries` queries to `workers` workers.
    ///
    /// # Panics
    ///
    /// If `workers` is zero.
    #[must_use]
    pub fn new(queries: usize, workers: usize) -> Self {
        assert!(workers > 0, "there must be at least one worker");
        Self { queries, workers }
    }

    /// Number of workers.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Total number of queries.
    #[must_use]
    pub const fn queries(&self) -> usize {
        self.queries
    }

    /// The size of every block except possibly the last.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.queries / self.workers
    }

    /// The worker that owns `query`.
    #[must_use]
    pub const fn owner(&self, query: usize) -> usize {
        owner_of(query, self.block_size(), self.workers)
    }

    /// The queries owned by `worker`.
    #[must_use]
    pub fn owned_by(&self, worker: usize) -> Partition {
        Partition::of(self.queries, self.workers, worker)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{owner_of, Ownership, Partition};

    #[test_case(0, 1)]
    #[test_case(4, 2)]
    #[test_case(10, 3)]
    #[test_case(3, 5)]
    #[test_case(1_000_003, 7)]
    fn split_covers_every_index_once(total: usize, parts: usize) {
        let blocks = Partition::split(total, parts);
        assert_eq!(blocks.len(), parts);

        let mut next = 0;
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.offset, next, "block {i} leaves a gap or overlaps");
            if i + 1 < parts {
                assert_eq!(block.count, total / parts);
            }
            next = block.end();
        }
        assert_eq!(next, total);
        assert_eq!(blocks[parts - 1].count, total / parts + total % parts);
    }

    #[test]
    fn owner_matches_owned_blocks() {
        for (queries, workers) in [(10, 3), (4, 2), (3, 5), (17, 4), (1, 1)] {
            let ownership = Ownership::new(queries, workers);
            for worker in 0..workers {
                for q in ownership.owned_by(worker).range() {
                    assert_eq!(ownership.owner(q), worker, "query {q} of {queries} with {workers} workers");
                }
            }
        }
    }

    #[test]
    fn remainder_goes_to_last() {
        assert_eq!(owner_of(9, 3, 3), 2);
        assert_eq!(owner_of(5, 3, 3), 1);
        assert_eq!(owner_of(0, 0, 4), 3);
    }
}
