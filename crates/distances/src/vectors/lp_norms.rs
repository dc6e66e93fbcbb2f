//! Provides functions for calculating Lp-norms between two vectors.

use super::utils::abs_diff_iter;

/// Euclidean distance between two vectors.
///
/// This is the square root of [`euclidean_sq`].
///
/// # Examples
///
/// ```
/// use distances::vectors::euclidean;
///
/// let x = [1.0, 2.0, 3.0];
/// let y = [4.0, 5.0, 6.0];
///
/// assert!((euclidean(&x, &y) - 27_f64.sqrt()).abs() <= f64::EPSILON);
/// ```
#[must_use]
pub fn euclidean(x: &[f64], y: &[f64]) -> f64 {
    euclidean_sq(x, y).sqrt()
}

/// Squared Euclidean distance between two vectors.
///
/// Also known as the squared L2-norm, this is the sum of the squares of the
/// absolute differences between the corresponding elements of the two
/// vectors. It orders points exactly as [`euclidean`] does and skips the
/// square root, so it is the default for neighbor selection.
///
/// See the [`crate::vectors`] module documentation for information on this
/// function's potentially unexpected behaviors
///
/// # Examples
///
/// ```
/// use distances::vectors::euclidean_sq;
///
/// let x = [1.0, 2.0, 3.0];
/// let y = [4.0, 5.0, 6.0];
///
/// assert!((euclidean_sq(&x, &y) - 27.0).abs() <= f64::EPSILON);
/// ```
#[must_use]
pub fn euclidean_sq(x: &[f64], y: &[f64]) -> f64 {
    abs_diff_iter(x, y).map(|v| v * v).sum()
}

/// Manhattan distance between two vectors.
///
/// Also known as the L1-norm or the taxicab distance, the Manhattan distance is
/// defined as the sum of the absolute differences between the corresponding
/// elements of the two vectors.
///
/// # Examples
///
/// ```
/// use distances::vectors::manhattan;
///
/// let x = [1.0, 2.0, 3.0];
/// let y = [4.0, 5.0, 6.0];
///
/// assert!((manhattan(&x, &y) - 9.0).abs() <= f64::EPSILON);
/// ```
#[must_use]
pub fn manhattan(x: &[f64], y: &[f64]) -> f64 {
    abs_diff_iter(x, y).sum()
}

/// Chebyshev distance between two vectors.
///
/// Also known as the L-infinity norm, this is the maximum of the absolute
/// differences between the corresponding elements of the two vectors. Empty
/// vectors are at distance zero.
///
/// # Examples
///
/// ```
/// use distances::vectors::chebyshev;
///
/// let x = [1.0, 2.0, 3.0];
/// let y = [4.0, 7.0, 3.0];
///
/// assert!((chebyshev(&x, &y) - 5.0).abs() <= f64::EPSILON);
/// ```
#[must_use]
pub fn chebyshev(x: &[f64], y: &[f64]) -> f64 {
    abs_diff_iter(x, y).fold(0.0, f64::max)
}

/// The sum of the `p`-th powers of the absolute differences between two
/// vectors.
///
/// This is the general Lp-norm without its final `p`-th root.
///
/// # Examples
///
/// ```
/// use distances::vectors::minkowski_sum;
///
/// let x = [1.0, 2.0, 3.0];
/// let y = [2.0, 4.0, 3.0];
///
/// assert!((minkowski_sum(&x, &y, 3) - 9.0).abs() <= f64::EPSILON);
/// ```
#[must_use]
pub fn minkowski_sum(x: &[f64], y: &[f64], p: u32) -> f64 {
    let p = i32::try_from(p).unwrap_or(i32::MAX);
    abs_diff_iter(x, y).map(|v| v.powi(p)).sum()
}
