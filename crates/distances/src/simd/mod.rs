//! Fixed-width lanes for batched reductions over `f64` slices.
//!
//! [`Lanes`] is a plain array with lane-by-lane arithmetic. Vectorization is
//! left to the compiler. What the lanes fix is the order of accumulation:
//! values go into `N` independent partial sums, the partial sums are folded
//! pairwise, and any remainder is added one value at a time.

#[macro_use]
mod macros;

mod lanes;

pub use lanes::{Lanes, F64x2, F64x4};

/// Vectors at least this long use four lanes, shorter ones two.
const WIDE_FROM: usize = 16;

/// Squared euclidean distance between two vectors.
#[must_use]
pub fn euclidean_sq_f64(a: &[f64], b: &[f64]) -> f64 {
    if a.len() >= WIDE_FROM {
        F64x4::squared_euclidean(a, b)
    } else {
        F64x2::squared_euclidean(a, b)
    }
}

/// Euclidean distance between two vectors.
#[must_use]
pub fn euclidean_f64(a: &[f64], b: &[f64]) -> f64 {
    euclidean_sq_f64(a, b).sqrt()
}

/// Sum of a slice in 4-wide batches.
///
/// Agrees with a left-to-right sum up to floating-point reassociation, and
/// is identical from run to run for the same input.
#[must_use]
pub fn batched_sum(values: &[f64]) -> f64 {
    F64x4::sum(values)
}

/// Arithmetic mean of a slice via [`batched_sum`]. Empty slices have a mean
/// of zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn batched_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        batched_sum(values) / values.len() as f64
    }
}

/// Left-to-right squared euclidean distance.
fn naive_squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Left-to-right sum.
fn naive_sum(values: &[f64]) -> f64 {
    values.iter().sum()
}
