//! Scoring predictions against the known outputs of the queries.
//!
//! Each worker scores the queries it owns into a [`PartialMetrics`]. The
//! partials are summed on the coordinator and turned into a [`Summary`].
//!
//! Percentage error is undefined when the true value is zero. Such queries
//! are left out of the percentage-error sum and counted in
//! [`PartialMetrics::zero_truth`]. Their squared error still counts.

use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Squared error of one prediction.
#[must_use]
pub fn squared_error(truth: f64, prediction: f64) -> f64 {
    let diff = prediction - truth;
    diff * diff
}

/// Absolute percentage error of one prediction, or `None` when the true
/// value is zero.
#[must_use]
pub fn percentage_error(truth: f64, prediction: f64) -> Option<f64> {
    if truth == 0.0 {
        None
    } else {
        Some(100.0 * ((prediction - truth) / truth).abs())
    }
}

/// One or more workers' contribution to the metrics of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialMetrics {
    /// Number of queries scored.
    pub queries: usize,
    /// Sum of squared errors.
    pub sse: f64,
    /// Sum of percentage errors over queries with a non-zero true value.
    pub ape_sum: f64,
    /// Number of queries contributing to `ape_sum`.
    pub scored: usize,
    /// Number of queries left out of `ape_sum` for a zero true value.
    pub zero_truth: usize,
    /// Wall-clock time of the run. Combined by maximum.
    pub elapsed: Duration,
    /// Latency of each worker's first query. Combined by sum.
    pub first_query: Duration,
    /// Number of workers combined into this partial.
    pub workers: usize,
}

impl Default for PartialMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialMetrics {
    /// An empty partial for one worker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queries: 0,
            sse: 0.0,
            ape_sum: 0.0,
            scored: 0,
            zero_truth: 0,
            elapsed: Duration::ZERO,
            first_query: Duration::ZERO,
            workers: 1,
        }
    }

    /// Scores one prediction.
    pub fn record(&mut self, truth: f64, prediction: f64) {
        self.queries += 1;
        self.sse += squared_error(truth, prediction);
        match percentage_error(truth, prediction) {
            Some(ape) => {
                self.ape_sum += ape;
                self.scored += 1;
            }
            None => self.zero_truth += 1,
        }
    }

    /// Sets the timings of this worker.
    #[must_use]
    pub const fn with_timings(mut self, elapsed: Duration, first_query: Duration) -> Self {
        self.elapsed = elapsed;
        self.first_query = first_query;
        self
    }

    /// Combines two partials: counts and error sums add up, elapsed time is
    /// the maximum, and first-query latencies add up.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            queries: self.queries + other.queries,
            sse: self.sse + other.sse,
            ape_sum: self.ape_sum + other.ape_sum,
            scored: self.scored + other.scored,
            zero_truth: self.zero_truth + other.zero_truth,
            elapsed: self.elapsed.max(other.elapsed),
            first_query: self.first_query + other.first_query,
            workers: self.workers + other.workers,
        }
    }
}

/// The final metrics of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    /// Number of queries scored.
    pub queries: usize,
    /// Mean squared error.
    pub mse: f64,
    /// Mean absolute percentage error over queries with a non-zero true
    /// value, or `None` if there are none.
    pub mape: Option<f64>,
    /// Coefficient of determination, `1 - mse / var`, or `None` when the
    /// true values have no variance.
    pub r2: Option<f64>,
    /// Number of queries left out of the percentage error.
    pub zero_truth: usize,
    /// Wall-clock time of the slowest worker.
    pub elapsed: Duration,
    /// Sum over workers of the latency of their first query.
    pub first_query: Duration,
    /// Number of workers.
    pub workers: usize,
}

#[allow(clippy::cast_precision_loss)]
impl Summary {
    /// Finishes the combined partial of every worker. `truths` are the true
    /// outputs of all queries, used for the variance in R².
    #[must_use]
    pub fn from_partial(total: &PartialMetrics, truths: &[f64]) -> Self {
        let mse = if total.queries == 0 {
            f64::NAN
        } else {
            total.sse / total.queries as f64
        };
        let mape = (total.scored > 0).then(|| total.ape_sum / total.scored as f64);

        let var = variance(truths);
        let r2 = (var > 0.0).then(|| 1.0 - mse / var);

        Self {
            queries: total.queries,
            mse,
            mape,
            r2,
            zero_truth: total.zero_truth,
            elapsed: total.elapsed,
            first_query: total.first_query,
            workers: total.workers,
        }
    }

    /// Mean first-query latency per worker.
    #[must_use]
    pub fn mean_first_query(&self) -> Duration {
        self.first_query / u32::try_from(self.workers.max(1)).unwrap_or(u32::MAX)
    }

    /// Time spent on everything after the first query.
    #[must_use]
    pub fn steady_state(&self) -> Duration {
        self.elapsed.saturating_sub(self.first_query)
    }

    /// Mean time per query.
    #[must_use]
    pub fn per_query(&self) -> Duration {
        if self.queries == 0 {
            Duration::ZERO
        } else {
            self.elapsed.div_f64(self.queries as f64)
        }
    }
}

/// Population variance, or zero for fewer than two values.
#[allow(clippy::cast_precision_loss)]
fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}
