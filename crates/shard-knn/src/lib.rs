#![deny(clippy::correctness)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::nursery,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::cast_lossless
)]
#![doc = include_str!("../README.md")]

pub mod cluster;
mod config;
pub mod data;
mod error;
pub mod knn;
pub mod mesh;
pub mod metrics;
pub mod partition;
pub mod predict;
pub mod protocol;
pub mod report;
pub mod synthetic;
mod worker;

pub use config::KnnConfig;
pub use distances::Norm;
pub use error::{KnnError, Result};
pub use knn::{CandidateSet, Neighbor, ShardScanner, TopK};
pub use partition::{Ownership, Partition};
pub use predict::Prediction;
pub use worker::{Worker, WorkerOutput};

/// The current version of the crate.
pub const VERSION: &str = "0.1.0";
