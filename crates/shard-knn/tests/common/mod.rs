//! Helpers shared by the integration tests.
#![allow(dead_code)]

use shard_knn::{data::Table, Norm};

/// The four points `0, 1, 2, 3` on a line, each with its coordinate as its
/// output.
pub fn line() -> Table {
    Table::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]], Some(&[0.0, 1.0, 2.0, 3.0])).unwrap()
}

/// The indices and distances of the `k` nearest training points to `query`,
/// found by sorting every distance.
pub fn brute_force(training: &Table, query: &[f64], k: usize, norm: Norm) -> Vec<(usize, f64)> {
    let mut all = training
        .points()
        .enumerate()
        .map(|(i, p)| (i, norm.distance(query, p)))
        .collect::<Vec<_>>();
    all.sort_by(|a, b| a.1.total_cmp(&b.1));
    all.truncate(k);
    all
}
