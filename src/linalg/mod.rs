//! Small-matrix direct solvers and dispatch
//!
//! This module provides the dense linear-algebra kernels used by the
//! portfolio engine including:
//! - Closed-form determinant, inverse and solve kernels for 1x1 through 5x5
//!   systems (general and symmetric families)
//! - Dispatch factories selecting between the closed-form kernels and
//!   decomposition-based fallbacks (LU, Cholesky, QR, SVD)
//! - Positive-semidefinite repair of correlation matrices
//!
//! The closed-form kernels trade conditioning checks for speed: a singular
//! input produces NaN or infinite entries instead of an error. The
//! decomposition fallbacks selected by the dispatch layer do check
//! conditioning and report `LinalgError::SingularMatrix` or
//! `LinalgError::NotSolvable`.

pub mod determinant;
pub mod dispatch;
pub mod inverse;
pub mod psd;
pub mod solve;

pub use determinant::{
    determinant_1x1, determinant_2x2, determinant_3x3, determinant_4x4, determinant_5x5,
    symmetric_determinant_2x2, symmetric_determinant_3x3, symmetric_determinant_4x4,
    symmetric_determinant_5x5,
};
pub use dispatch::{DeterminantPlan, InversePlan, SolvePlan, StructureHints};
pub use inverse::{
    invert_1x1_into, invert_2x2_into, invert_3x3_into, invert_4x4_into, invert_5x5_into,
    symmetric_invert_2x2_into, symmetric_invert_3x3_into, symmetric_invert_4x4_into,
    symmetric_invert_5x5_into,
};
pub use psd::{
    correlations_and_volatilities, covariances_from, repair_correlations, EIGENVALUE_FLOOR,
};
pub use solve::{
    solve_1x1, solve_2x2, solve_3x3, solve_4x4, solve_5x5, symmetric_solve_2x2,
    symmetric_solve_3x3, symmetric_solve_4x4, symmetric_solve_5x5,
};

use thiserror::Error;

/// Largest dimension served by the closed-form kernels. Above this the
/// dispatch layer falls back to decomposition-based solvers.
pub const MAX_CLOSED_FORM_DIM: usize = 5;

/// Singular-value cutoff used by the SVD-based fallback paths.
pub const SVD_EPSILON: f64 = 1e-10;

/// Linear-algebra errors raised by the dispatch layer.
///
/// The closed-form kernels never return these: degenerate input shows up as
/// NaN/infinite entries in their output instead (callers needing a hard
/// guarantee route through the checked decomposition fallbacks).
#[derive(Debug, Error)]
pub enum LinalgError {
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("matrix is singular to working precision: {0}")]
    SingularMatrix(String),

    #[error("matrix is not positive definite: {0}")]
    NotPositiveDefinite(String),

    #[error("system could not be solved: {0}")]
    NotSolvable(String),
}
