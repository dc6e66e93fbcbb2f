//! The norm selector used by neighbor search.

use core::{fmt::Display, str::FromStr};

use super::{chebyshev, manhattan, minkowski_sum};

/// Which Lp-norm to use when comparing two points.
///
/// The numeric selector (see [`Norm::from_selector`]) is `0` for Chebyshev,
/// `1` for Manhattan, `2` for squared Euclidean and any larger `p` for the
/// root-less Minkowski sum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Norm {
    /// Maximum absolute difference.
    Chebyshev,
    /// Sum of absolute differences.
    Manhattan,
    /// Sum of squared differences.
    #[default]
    SquaredEuclidean,
    /// Sum of the `p`-th powers of absolute differences. Values of `p` below
    /// `3` act as the named norm with that selector.
    Minkowski(u32),
}

impl Norm {
    /// Maps a numeric selector to a `Norm`.
    #[must_use]
    pub const fn from_selector(p: u32) -> Self {
        match p {
            0 => Self::Chebyshev,
            1 => Self::Manhattan,
            2 => Self::SquaredEuclidean,
            p => Self::Minkowski(p),
        }
    }

    /// The same norm under its named variant, so that `Minkowski(p)` with
    /// `p <= 2` behaves exactly like `Norm::from_selector(p)`.
    #[must_use]
    pub const fn canonical(self) -> Self {
        match self {
            Self::Minkowski(p) => Self::from_selector(p),
            n => n,
        }
    }

    /// The numeric selector for this `Norm`.
    #[must_use]
    pub const fn selector(self) -> u32 {
        match self {
            Self::Chebyshev => 0,
            Self::Manhattan => 1,
            Self::SquaredEuclidean => 2,
            Self::Minkowski(p) => p,
        }
    }

    /// Computes the distance between `x` and `y` under this norm, without the
    /// final root.
    ///
    /// The result is non-negative, symmetric in `x` and `y`, and zero when the
    /// vectors are identical.
    #[must_use]
    pub fn distance(self, x: &[f64], y: &[f64]) -> f64 {
        match self.canonical() {
            Self::Chebyshev => chebyshev(x, y),
            Self::Manhattan => manhattan(x, y),
            Self::SquaredEuclidean => crate::simd::euclidean_sq_f64(x, y),
            Self::Minkowski(p) => minkowski_sum(x, y, p),
        }
    }

    /// Recovers the true metric value from a distance computed by
    /// [`Norm::distance`].
    #[must_use]
    pub fn root(self, distance: f64) -> f64 {
        if distance == 0.0 {
            return 0.0;
        }
        match self.canonical() {
            Self::Chebyshev | Self::Manhattan => distance,
            Self::SquaredEuclidean => distance.sqrt(),
            Self::Minkowski(p) => distance.powf(1.0 / f64::from(p)),
        }
    }
}

impl Display for Norm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.canonical() {
            Self::Chebyshev => write!(f, "chebyshev"),
            Self::Manhattan => write!(f, "manhattan"),
            Self::SquaredEuclidean => write!(f, "euclidean-sq"),
            Self::Minkowski(p) => write!(f, "minkowski-{p}"),
        }
    }
}

impl FromStr for Norm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chebyshev" | "linf" => Ok(Self::Chebyshev),
            "manhattan" | "l1" => Ok(Self::Manhattan),
            "euclidean-sq" | "euclidean" | "l2" => Ok(Self::SquaredEuclidean),
            other => {
                let p = other
                    .strip_prefix("minkowski-")
                    .or_else(|| other.strip_prefix('l'))
                    .unwrap_or(other);
                p.parse::<u32>()
                    .map(Self::from_selector)
                    .map_err(|_| format!("Unknown norm: {s}"))
            }
        }
    }
}
