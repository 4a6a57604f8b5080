//! Portfolio optimization toolkit: closed-form linear algebra kernels for
//! small systems, mean-variance portfolio models and mixed-integer
//! portfolio mixing.

// Export modules
pub mod linalg;
pub mod optimizer;
pub mod portfolio;

pub use linalg::LinalgError;
pub use optimizer::{OptimizationState, SolveOutcome, SolverOptions};
pub use portfolio::{
    BlackLittermanModel, EfficientFrontier, FixedReturnsPortfolio, FixedWeightsPortfolio,
    MarketContext, MarketEquilibrium, MarkowitzModel, PortfolioError, PortfolioMixer,
    PortfolioModel, SimplePortfolio,
};
