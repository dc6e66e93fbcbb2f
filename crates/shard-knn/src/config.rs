//! Run configuration for a kNN search.

use core::time::Duration;

use distances::Norm;

use crate::{predict::Prediction, KnnError, Result};

/// Everything a worker needs to know about the problem before it loads data.
///
/// Every worker of a run must use the same configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct KnnConfig {
    /// Dimensionality of every point.
    pub dim: usize,
    /// Number of neighbors to find per query.
    pub k: usize,
    /// The norm used to rank neighbors.
    pub norm: Norm,
    /// Number of training rows. Inferred from the file length when `None`.
    pub train_count: Option<usize>,
    /// Number of query rows. Inferred from the file length when `None`.
    pub query_count: Option<usize>,
    /// Whether each row ends with one output value after its `dim` features.
    pub surrogates: bool,
    /// Number of threads scanning queries inside one worker.
    pub threads: usize,
    /// How neighbor outputs are turned into a prediction.
    pub prediction: Prediction,
    /// Bounded wait for mesh receives. `None` blocks forever.
    pub recv_timeout: Option<Duration>,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            dim: 2,
            k: 32,
            norm: Norm::SquaredEuclidean,
            train_count: None,
            query_count: None,
            surrogates: true,
            threads: std::thread::available_parallelism().map_or(1, core::num::NonZeroUsize::get),
            prediction: Prediction::Mean,
            recv_timeout: None,
        }
    }
}

impl KnnConfig {
    /// A configuration for `dim`-dimensional points and `k` neighbors, with
    /// defaults for everything else.
    #[must_use]
    pub fn new(dim: usize, k: usize) -> Self {
        Self {
            dim,
            k,
            ..Self::default()
        }
    }

    /// Sets the norm.
    #[must_use]
    pub const fn with_norm(mut self, norm: Norm) -> Self {
        self.norm = norm;
        self
    }

    /// Sets the number of scanning threads.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the prediction policy.
    #[must_use]
    pub const fn with_prediction(mut self, prediction: Prediction) -> Self {
        self.prediction = prediction;
        self
    }

    /// Sets whether rows carry a trailing output value.
    #[must_use]
    pub const fn with_surrogates(mut self, surrogates: bool) -> Self {
        self.surrogates = surrogates;
        self
    }

    /// Fixes the training and query row counts.
    #[must_use]
    pub const fn with_counts(mut self, train_count: usize, query_count: usize) -> Self {
        self.train_count = Some(train_count);
        self.query_count = Some(query_count);
        self
    }

    /// Sets a bounded wait for mesh receives.
    #[must_use]
    pub const fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }

    /// Number of `f64` values per row in the data files.
    #[must_use]
    pub const fn stride(&self) -> usize {
        if self.surrogates {
            self.dim + 1
        } else {
            self.dim
        }
    }

    /// Checks that the configuration can run.
    ///
    /// # Errors
    ///
    /// * If `dim`, `k`, or `threads` is zero.
    /// * If an explicit training count is smaller than `k`.
    /// * If an explicit query count is zero.
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(KnnError::Config("dim must be positive".to_string()));
        }
        if self.k == 0 {
            return Err(KnnError::Config("k must be positive".to_string()));
        }
        if self.threads == 0 {
            return Err(KnnError::Config("threads must be positive".to_string()));
        }
        if let Some(n) = self.train_count {
            if n < self.k {
                return Err(KnnError::Config(format!(
                    "k ({}) exceeds the number of training points ({n})",
                    self.k
                )));
            }
        }
        if self.query_count == Some(0) {
            return Err(KnnError::Config("query count must be positive".to_string()));
        }
        Ok(())
    }
}
