//! Efficient frontier sweep
//!
//! This module implements frontier tracing over the risk-aversion factor:
//! each factor gets a fresh unconstrained mean-variance solve (budget and
//! shorting policy only) and yields one `FrontierPoint`. Sweeps run the
//! factors in parallel; results come back in input order.

use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::optimizer::{
    OptimizationState, ProjectedGradientQp, QpSolver, SolverOptions,
};

use super::equilibrium::MarketEquilibrium;
use super::markowitz::build_mean_variance_program;
use super::PortfolioError;

/// One solved point of the frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub risk_aversion: f64,
    pub weights: DVector<f64>,
    pub mean_return: f64,
    pub variance: f64,
    pub state: OptimizationState,
}

/// Traces the mean-variance frontier of an asset universe.
///
/// Unlike `MarkowitzModel` this type is stateless between calls: no cache,
/// no warm start, no stored outcome. That keeps `point` callable from
/// parallel sweeps.
pub struct EfficientFrontier {
    equilibrium: MarketEquilibrium,
    expected_returns: DVector<f64>,
    shorting_allowed: bool,
    solver: Box<dyn QpSolver + Send + Sync>,
    options: SolverOptions,
}

impl std::fmt::Debug for EfficientFrontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EfficientFrontier")
            .field("assets", &self.equilibrium.size())
            .field("shorting_allowed", &self.shorting_allowed)
            .finish_non_exhaustive()
    }
}

impl EfficientFrontier {
    pub fn new(
        equilibrium: MarketEquilibrium,
        expected_returns: DVector<f64>,
    ) -> Result<Self, PortfolioError> {
        if expected_returns.len() != equilibrium.size() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} expected returns for {} assets",
                expected_returns.len(),
                equilibrium.size()
            )));
        }
        Ok(Self {
            equilibrium,
            expected_returns,
            shorting_allowed: false,
            solver: Box::new(ProjectedGradientQp::new()),
            options: SolverOptions::default(),
        })
    }

    pub fn set_shorting_allowed(&mut self, allowed: bool) {
        self.shorting_allowed = allowed;
    }

    pub fn set_solver(&mut self, solver: Box<dyn QpSolver + Send + Sync>) {
        self.solver = solver;
    }

    pub fn set_solver_options(&mut self, options: SolverOptions) {
        self.options = options;
    }

    /// Solves one frontier point at the given risk-aversion factor.
    pub fn point(&self, risk_aversion: f64) -> Result<FrontierPoint, PortfolioError> {
        if !risk_aversion.is_finite() || risk_aversion <= 0.0 {
            return Err(PortfolioError::InvalidInput(format!(
                "risk aversion must be positive and finite, got {}",
                risk_aversion
            )));
        }

        let program = build_mean_variance_program(
            &self.equilibrium,
            &self.expected_returns,
            self.shorting_allowed,
            &[],
            &[],
            None,
            risk_aversion,
        )?;
        let outcome = self.solver.minimize(&program, &self.options);

        let weights = if outcome.state.is_feasible() {
            let mut weights = outcome.values;
            if !self.shorting_allowed {
                for w in weights.iter_mut() {
                    *w = w.max(0.0);
                }
            }
            weights
        } else {
            DVector::zeros(self.equilibrium.size())
        };

        let mean_return = self.expected_returns.dot(&weights);
        let variance = self.equilibrium.calculate_portfolio_variance(&weights)?;
        Ok(FrontierPoint {
            risk_aversion,
            weights,
            mean_return,
            variance,
            state: outcome.state,
        })
    }

    /// Solves every factor in parallel. Points come back in the order the
    /// factors were given.
    pub fn sweep(&self, risk_aversions: &[f64]) -> Result<Vec<FrontierPoint>, PortfolioError> {
        debug!(points = risk_aversions.len(), "sweeping frontier");
        risk_aversions
            .par_iter()
            .map(|&factor| self.point(factor))
            .collect()
    }
}
