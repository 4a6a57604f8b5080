//! Quadratic programming layer
//!
//! This module provides the optimization machinery behind the portfolio
//! adapters including:
//! - The `QuadraticProgram` model representation built by `make_model`-style
//!   adapters
//! - The `QpSolver` oracle seam with its in-band `OptimizationState`
//!   taxonomy
//! - A bundled projected-gradient solver and a branch-and-bound layer for
//!   binary indicator variables
//!
//! Solvers never raise errors for infeasible or non-converged programs;
//! those facts travel in the returned `SolveOutcome` so callers can expose
//! them as model state. A malformed model is different: `validate` reports
//! bad indices and inverted bounds as `OptimizerError` before any solve.

use thiserror::Error;

pub mod integer;
pub mod program;
pub mod solver;

pub use integer::{BranchAndBound, INTEGRALITY_TOLERANCE};
pub use program::{Expression, LowerUpper, QuadraticProgram, Variable};
pub use solver::{
    OptimizationState, ProjectedGradientQp, QpSolver, SolveOutcome, SolverOptions,
    FEASIBILITY_TOLERANCE,
};

/// Structural defects of a model, caught before solving.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("variable index out of range: {0}")]
    IndexOutOfRange(String),
    #[error("inverted limits: {0}")]
    InvertedLimits(String),
}
