//! Utility functions for vector based distance calculations.

/// An iterator over the absolute differences between the corresponding elements
/// of two vectors.
pub fn abs_diff_iter<'a>(x: &'a [f64], y: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
    x.iter().zip(y.iter()).map(|(&a, &b)| (a - b).abs())
}
