//! `N` independent `f64` accumulators.

use core::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

/// `N` values operated on together. Arithmetic is lane by lane.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Lanes<const N: usize>(pub [f64; N]);

/// Two lanes, used for short vectors.
pub type F64x2 = Lanes<2>;

/// Four lanes, used for sums and long vectors.
pub type F64x4 = Lanes<4>;

impl_lane_op!(Add, add, AddAssign, add_assign, +);
impl_lane_op!(Sub, sub, SubAssign, sub_assign, -);
impl_lane_op!(Mul, mul, MulAssign, mul_assign, *);

impl<const N: usize> Lanes<N> {
    /// Number of lanes.
    pub const LANES: usize = N;

    /// Every lane set to `value`.
    #[inline]
    pub const fn splat(value: f64) -> Self {
        Self([value; N])
    }

    /// The first `N` values of `slice`.
    ///
    /// # Panics
    ///
    /// If `slice` has fewer than `N` values.
    #[inline]
    pub fn from_slice(slice: &[f64]) -> Self {
        let mut lanes = [0.0; N];
        lanes.copy_from_slice(&slice[..N]);
        Self(lanes)
    }

    /// Folds adjacent lanes pairwise until one value is left. For four
    /// lanes this is `(x0 + x1) + (x2 + x3)`.
    #[inline]
    pub fn horizontal_add(self) -> f64 {
        let mut v = self.0;
        let mut width = N;
        while width > 1 {
            let half = width / 2;
            for i in 0..half {
                v[i] = v[2 * i] + v[2 * i + 1];
            }
            if width % 2 == 1 {
                v[half] = v[width - 1];
                width = half + 1;
            } else {
                width = half;
            }
        }
        v.first().copied().unwrap_or(0.0)
    }

    /// Squared euclidean distance between two slices of equal length.
    /// Whole groups of `N` go through the lanes, the rest is added one
    /// value at a time.
    ///
    /// # Panics
    ///
    /// If the slices differ in length.
    pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
        assert_eq!(a.len(), b.len());
        let (xs, ys) = (a.chunks_exact(N), b.chunks_exact(N));
        let tail = super::naive_squared_euclidean(xs.remainder(), ys.remainder());

        let mut acc = Self::splat(0.0);
        for (x, y) in xs.zip(ys) {
            let d = Self::from_slice(x) - Self::from_slice(y);
            acc += d * d;
        }
        acc.horizontal_add() + tail
    }

    /// Sum of a slice, in groups of `N` with the rest added one value at a
    /// time.
    pub fn sum(values: &[f64]) -> f64 {
        let groups = values.chunks_exact(N);
        let tail = super::naive_sum(groups.remainder());

        let mut acc = Self::splat(0.0);
        for g in groups {
            acc += Self::from_slice(g);
        }
        acc.horizontal_add() + tail
    }
}
