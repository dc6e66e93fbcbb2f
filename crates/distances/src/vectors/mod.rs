//! Distance functions for vectors.
//!
//! # Potentially unexpected behaviors
//! Computing these distances with vectors of differing or zero
//! dimensionality may give unexpected results. Specifically, when one vector is
//! shorter than the other, elements in the longer vector past the end of the
//! shorter vector will be ignored.
//!
//! None of the functions here take the final root of the norm. Use
//! [`Norm::root`] for that.

mod lp_norms;
mod norm;
pub(crate) mod utils;

pub use lp_norms::{chebyshev, euclidean, euclidean_sq, manhattan, minkowski_sum};
pub use norm::Norm;
