/// Implements a binary operator and its compound-assignment form lane by
/// lane for every `Lanes<N>`.
macro_rules! impl_lane_op {
    ($op_trait:ident, $op_fn:ident, $assign_trait:ident, $assign_fn:ident, $op:tt) => {
        impl<const N: usize> $assign_trait for Lanes<N> {
            #[inline]
            fn $assign_fn(&mut self, rhs: Self) {
                for (l, r) in self.0.iter_mut().zip(rhs.0) {
                    *l = *l $op r;
                }
            }
        }

        impl<const N: usize> $op_trait for Lanes<N> {
            type Output = Self;

            #[inline]
            fn $op_fn(mut self, rhs: Self) -> Self {
                self.$assign_fn(rhs);
                self
            }
        }
    };
}
