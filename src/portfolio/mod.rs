//! Portfolio construction and analysis
//!
//! This module provides the modeling layer on top of the linear-algebra
//! kernels and the quadratic-programming machinery including:
//! - `MarketEquilibrium`: covariances plus risk aversion, mapping between
//!   weights and implied returns in both directions
//! - Fixed-input models, the constrained `MarkowitzModel` with target
//!   search, the `EfficientFrontier` sweep and `BlackLittermanModel` view
//!   blending
//! - `PortfolioMixer`: component mixing under a cardinality cap
//!
//! Construction and mutation validate dimensions and inputs eagerly and
//! return `PortfolioError`. Solver trouble is not an error: infeasible or
//! failed optimizations surface as `OptimizationState` on the model, with
//! zero weights standing in for the missing solution.

use thiserror::Error;

pub mod black_litterman;
pub mod equilibrium;
pub mod frontier;
pub mod markowitz;
pub mod mixer;
pub mod model;

pub use black_litterman::{BlackLittermanModel, View, ViewConfidence};
pub use equilibrium::{MarketEquilibrium, DEFAULT_RISK_AVERSION};
pub use frontier::{EfficientFrontier, FrontierPoint};
pub use markowitz::{MarkowitzModel, OptimizationTarget, BISECTION_TOLERANCE};
pub use mixer::PortfolioMixer;
pub use model::{
    FixedReturnsPortfolio, FixedWeightsPortfolio, MarketContext, PortfolioModel, SimplePortfolio,
};

use crate::linalg::LinalgError;
use crate::optimizer::OptimizerError;

/// Errors from portfolio construction, mutation and derived computations.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("numerical failure: {0}")]
    Numerical(#[from] LinalgError),
    #[error("model build failed: {0}")]
    ModelBuild(#[from] OptimizerError),
}
