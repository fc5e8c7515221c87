//! Regression models over the long-format table
//!
//! The models are stated as formula strings, the way analysts write them:
//! a response, `+`-separated fixed-effect terms, `C(...)` for categorical
//! expansion. Mixed models add a grouping column, an optional
//! random-effects formula and named variance components. Fitting is OLS
//! via singular value decomposition and REML via an EM iteration for the
//! mixed models; there is no ecosystem crate for the latter.

pub mod design;
pub mod formula;
pub mod mixed;
pub mod ols;

pub use design::{Design, design_matrix, response};
pub use formula::{Formula, Term};
pub use mixed::{MixedFit, MixedModel};
pub use ols::{Ols, OlsFit};

/// Relative parameter-change tolerance for iterative fits
pub const FIT_TOL: f64 = 1e-6;

/// Iteration cap for the EM loop; hitting it is a convergence error
pub const MAX_ITER: usize = 1000;
