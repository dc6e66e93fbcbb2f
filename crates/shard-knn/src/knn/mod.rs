//! Bounded top-k selection and the local scan of one worker's shard.

mod candidates;
mod scanner;
mod selector;

pub use candidates::CandidateSet;
pub use scanner::{LocalScan, ShardScanner};
pub use selector::{Neighbor, TopK};
