//! Turning a query's neighbors into a predicted value.

use core::{fmt::Display, str::FromStr};

use distances::{simd::batched_mean, Norm};

use crate::Neighbor;

/// How the output values of a query's neighbors are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Prediction {
    /// Unweighted mean of the neighbors' values.
    #[default]
    Mean,
    /// Mean weighted by the inverse of the true distance. If any neighbor is
    /// at distance zero, the mean of the values of those neighbors.
    InverseDistance,
    /// The value of the closest neighbor.
    Nearest,
}

impl Prediction {
    /// Predicts a value from `neighbors`, which must be sorted by ascending
    /// distance. Empty slots are ignored. With no neighbors at all, the
    /// prediction is NaN.
    ///
    /// `norm` is the norm the distances were computed under, used to recover
    /// true distances for weighting.
    #[must_use]
    pub fn predict(self, neighbors: &[Neighbor], norm: Norm) -> f64 {
        let found = neighbors.iter().filter(|n| !n.is_sentinel());
        match self {
            Self::Mean => {
                let values = found.map(|n| n.value).collect::<Vec<_>>();
                if values.is_empty() {
                    f64::NAN
                } else {
                    batched_mean(&values)
                }
            }
            Self::InverseDistance => {
                let (exact, near): (Vec<&Neighbor>, Vec<&Neighbor>) = found.partition(|n| n.distance == 0.0);
                if !exact.is_empty() {
                    return batched_mean(&exact.iter().map(|n| n.value).collect::<Vec<_>>());
                }
                if near.is_empty() {
                    return f64::NAN;
                }
                let weights = near.iter().map(|n| 1.0 / norm.root(n.distance)).collect::<Vec<_>>();
                let weighted = near.iter().zip(&weights).map(|(n, w)| n.value * w).collect::<Vec<_>>();
                distances::simd::batched_sum(&weighted) / distances::simd::batched_sum(&weights)
            }
            Self::Nearest => found
                .min_by(|a, b| a.distance.total_cmp(&b.distance))
                .map_or(f64::NAN, |n| n.value),
        }
    }
}

impl Display for Prediction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::InverseDistance => write!(f, "inverse-distance"),
            Self::Nearest => write!(f, "nearest"),
        }
    }
}

impl FromStr for Prediction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "inverse-distance" | "idw" => Ok(Self::InverseDistance),
            "nearest" | "closest" => Ok(Self::Nearest),
            _ => Err(format!("Unknown prediction policy: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use distances::Norm;
    use float_cmp::assert_approx_eq;
    use rand::prelude::*;
    use test_case::test_case;

    use super::Prediction;
    use crate::Neighbor;

    fn neighbors() -> Vec<Neighbor> {
        vec![Neighbor::new(1, 0.16, 1.0), Neighbor::new(2, 0.36, 2.0)]
    }

    #[test_case(Prediction::Mean, 1.5; "mean")]
    #[test_case(Prediction::Nearest, 1.0; "nearest")]
    #[test_case(Prediction::InverseDistance, (1.0 / 0.4 + 2.0 / 0.6) / (1.0 / 0.4 + 1.0 / 0.6); "inverse_distance")]
    fn policies(policy: Prediction, expected: f64) {
        assert_approx_eq!(f64, policy.predict(&neighbors(), Norm::SquaredEuclidean), expected, epsilon = 1e-12);
    }

    #[test]
    fn sentinels_are_ignored() {
        let mut list = neighbors();
        list.push(Neighbor::SENTINEL);
        assert_approx_eq!(f64, Prediction::Mean.predict(&list, Norm::SquaredEuclidean), 1.5, epsilon = 1e-12);
        assert!(Prediction::Mean.predict(&[Neighbor::SENTINEL], Norm::SquaredEuclidean).is_nan());
        assert!(Prediction::Nearest.predict(&[], Norm::SquaredEuclidean).is_nan());
    }

    #[test]
    fn exact_matches_dominate_inverse_distance() {
        let list = vec![
            Neighbor::new(0, 0.0, 4.0),
            Neighbor::new(3, 0.0, 6.0),
            Neighbor::new(1, 0.5, 100.0),
        ];
        assert_approx_eq!(f64, Prediction::InverseDistance.predict(&list, Norm::Manhattan), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn mean_is_deterministic_and_close_to_naive() {
        let mut rng = StdRng::seed_from_u64(42);
        let list = (0..97)
            .map(|i| Neighbor::new(i, rng.gen_range(0.0..1.0), rng.gen_range(-1e3..1e3)))
            .collect::<Vec<_>>();

        let first = Prediction::Mean.predict(&list, Norm::SquaredEuclidean);
        for _ in 0..10 {
            assert_eq!(Prediction::Mean.predict(&list, Norm::SquaredEuclidean).to_bits(), first.to_bits());
        }

        let naive = list.iter().map(|n| n.value).sum::<f64>() / 97.0;
        assert_approx_eq!(f64, first, naive, epsilon = 1e-9);
    }

    #[test]
    fn parse() {
        for policy in [Prediction::Mean, Prediction::InverseDistance, Prediction::Nearest] {
            assert_eq!(policy.to_string().parse::<Prediction>(), Ok(policy));
        }
        assert!("median".parse::<Prediction>().is_err());
    }
}
