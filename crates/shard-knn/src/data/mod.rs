//! Training and query data held by a worker.

pub mod io;
mod table;

pub use table::Table;

use crate::Partition;

/// The slice of the global training set held by one worker.
#[derive(Clone, Debug)]
pub struct TrainingShard {
    /// The rows of this shard.
    table: Table,
    /// Global index of the first row.
    offset: usize,
}

impl TrainingShard {
    /// Wraps the rows of a shard whose first row has global index `offset`.
    #[must_use]
    pub const fn new(table: Table, offset: usize) -> Self {
        Self { table, offset }
    }

    /// Cuts the rows of `partition` out of the full training set.
    ///
    /// # Errors
    ///
    /// If `partition` runs past the end of `full`.
    pub fn from_full(full: &Table, partition: Partition) -> crate::Result<Self> {
        Ok(Self::new(full.slice(partition)?, partition.offset))
    }

    /// The rows of this shard.
    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// The global index range covered by this shard.
    #[must_use]
    pub fn partition(&self) -> Partition {
        Partition {
            offset: self.offset,
            count: self.table.len(),
        }
    }

    /// Maps a row index within the shard to its global index.
    #[must_use]
    pub const fn global_index(&self, local: usize) -> usize {
        local + self.offset
    }
}
