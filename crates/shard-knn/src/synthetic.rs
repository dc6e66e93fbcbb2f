//! Synthetic datasets: points drawn uniformly from a box, with outputs from
//! a standard optimization test function.

use core::{f64::consts::PI, fmt::Display, str::FromStr};

use rand::prelude::*;

use crate::{data::Table, Result};

/// Default lower bound of every coordinate.
pub const LOWER: f64 = -1.0;

/// Default upper bound of every coordinate.
pub const UPPER: f64 = 1.0;

/// The function that gives a synthetic point its output value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TestFunction {
    /// Sum of squares.
    #[default]
    Circle,
    /// Himmelblau's function, summed over consecutive coordinate pairs.
    Himmelblau,
    /// Rosenbrock's function, summed over consecutive coordinate pairs.
    Rosenbrock,
    /// Rastrigin's function.
    Rastrigin,
}

impl TestFunction {
    /// Evaluates the function at `x`.
    #[must_use]
    pub fn eval(self, x: &[f64]) -> f64 {
        match self {
            Self::Circle => x.iter().map(|v| v * v).sum(),
            Self::Himmelblau => x
                .windows(2)
                .map(|w| (w[0] * w[0] + w[1] - 11.0).powi(2) + (w[0] + w[1] * w[1] - 7.0).powi(2))
                .sum(),
            Self::Rosenbrock => x
                .windows(2)
                .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (w[0] - 1.0).powi(2))
                .sum(),
            Self::Rastrigin => x.iter().map(|v| v * v + 10.0 - 10.0 * (2.0 * PI * v).cos()).sum(),
        }
    }
}

impl Display for TestFunction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Circle => write!(f, "circle"),
            Self::Himmelblau => write!(f, "himmelblau"),
            Self::Rosenbrock => write!(f, "rosenbrock"),
            Self::Rastrigin => write!(f, "rastrigin"),
        }
    }
}

impl FromStr for TestFunction {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "circle" | "sphere" => Ok(Self::Circle),
            "himmelblau" => Ok(Self::Himmelblau),
            "rosenbrock" => Ok(Self::Rosenbrock),
            "rastrigin" => Ok(Self::Rastrigin),
            _ => Err(format!("Unknown test function: {s}")),
        }
    }
}

/// Flat rows of `dim` coordinates drawn uniformly from `[min, max)`, each
/// followed by the value of `function` at that point.
///
/// # Panics
///
/// If `min >= max`.
#[must_use]
pub fn random_rows<R: Rng>(rows: usize, dim: usize, (min, max): (f64, f64), function: TestFunction, rng: &mut R) -> Vec<f64> {
    let mut buffer = Vec::with_capacity(rows * (dim + 1));
    let mut point = vec![0.0; dim];
    for _ in 0..rows {
        for v in &mut point {
            *v = rng.gen_range(min..max);
        }
        buffer.extend_from_slice(&point);
        buffer.push(function.eval(&point));
    }
    buffer
}

/// A seeded table of `rows` random points in the default box, with outputs.
///
/// # Errors
///
/// If `dim` is zero.
pub fn random_table(rows: usize, dim: usize, function: TestFunction, seed: u64) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(seed);
    Table::new(random_rows(rows, dim, (LOWER, UPPER), function, &mut rng), dim, true)
}
