//! Portfolio mixing with a component cardinality cap
//!
//! This module implements tracking-error mixing: given a target portfolio
//! and a set of candidate component portfolios over the same assets, find
//! component weights on the simplex minimizing the squared tracking error
//! against the target, using at most a given number of components.
//!
//! Each component gets a weight in [0, 1] and a binary indicator; a
//! linkage constraint keeps a weight at zero unless its indicator is on,
//! and the indicator sum is capped. A small quadratic penalty on the
//! indicators breaks ties toward fewer active components. The resulting
//! mixed-integer program runs through branch-and-bound over the
//! projected-gradient relaxation.

use nalgebra::DVector;
use tracing::{debug, warn};

use crate::optimizer::{
    BranchAndBound, LowerUpper, OptimizationState, ProjectedGradientQp, QpSolver,
    QuadraticProgram, SolverOptions, Variable,
};

use super::model::SimplePortfolio;
use super::PortfolioError;

/// Objective factor of the indicator penalty; small enough to never
/// outweigh a real tracking-error difference.
const SWITCH_PENALTY: f64 = 0.001;

/// Mixes component portfolios toward a target.
#[derive(Debug)]
pub struct PortfolioMixer {
    target: SimplePortfolio,
    components: Vec<SimplePortfolio>,
    asset_exposures: Vec<(usize, LowerUpper)>,
    component_limits: Vec<(usize, LowerUpper)>,
    solver: BranchAndBound<ProjectedGradientQp>,
    options: SolverOptions,
    state: OptimizationState,
}

impl PortfolioMixer {
    pub fn new(
        target: SimplePortfolio,
        components: Vec<SimplePortfolio>,
    ) -> Result<Self, PortfolioError> {
        if components.is_empty() {
            return Err(PortfolioError::InvalidInput(
                "mixing needs at least one component".to_string(),
            ));
        }
        let assets = target.weights().len();
        for (i, component) in components.iter().enumerate() {
            if component.weights().len() != assets {
                return Err(PortfolioError::DimensionMismatch(format!(
                    "component {} holds {} assets, the target holds {}",
                    i,
                    component.weights().len(),
                    assets
                )));
            }
        }
        Ok(Self {
            target,
            components,
            asset_exposures: Vec::new(),
            component_limits: Vec::new(),
            solver: BranchAndBound::new(ProjectedGradientQp::new()),
            options: SolverOptions::default(),
            state: OptimizationState::Unexplored,
        })
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// State of the most recent mix.
    pub fn optimization_state(&self) -> OptimizationState {
        self.state
    }

    pub fn set_solver_options(&mut self, options: SolverOptions) {
        self.options = options;
        self.state = OptimizationState::Unexplored;
    }

    /// Bounds the mixed portfolio's resulting exposure to one asset.
    pub fn add_asset_exposure(
        &mut self,
        asset: usize,
        bounds: LowerUpper,
    ) -> Result<(), PortfolioError> {
        if asset >= self.target.weights().len() {
            return Err(PortfolioError::InvalidInput(format!(
                "exposure references asset {} of {}",
                asset,
                self.target.weights().len()
            )));
        }
        self.asset_exposures.push((asset, bounds));
        self.state = OptimizationState::Unexplored;
        Ok(())
    }

    /// Bounds one component's weight, inside its [0, 1] range.
    pub fn add_component_limit(
        &mut self,
        component: usize,
        bounds: LowerUpper,
    ) -> Result<(), PortfolioError> {
        if component >= self.components.len() {
            return Err(PortfolioError::InvalidInput(format!(
                "limit references component {} of {}",
                component,
                self.components.len()
            )));
        }
        self.component_limits.push((component, bounds));
        self.state = OptimizationState::Unexplored;
        Ok(())
    }

    /// Variables 0..c are component weights, c..2c the indicators.
    fn build_program(&self, max_components: usize) -> Result<QuadraticProgram, PortfolioError> {
        let c = self.components.len();
        let mut program = QuadraticProgram::new();

        for (i, component) in self.components.iter().enumerate() {
            let mut lower = 0.0_f64;
            let mut upper = 1.0_f64;
            for (index, bounds) in &self.component_limits {
                if *index == i {
                    if let Some(l) = bounds.lower {
                        lower = lower.max(l);
                    }
                    if let Some(u) = bounds.upper {
                        upper = upper.min(u);
                    }
                }
            }
            let target_affinity = self.target.weights().dot(component.weights());
            program.add_variable(
                Variable::new(format!("Weight{}", i))
                    .with_lower_limit(lower)
                    .with_upper_limit(upper)
                    .with_weight(-2.0 * target_affinity),
            );
        }
        for i in 0..c {
            program.add_variable(Variable::binary(format!("Active{}", i)));
        }

        // || t - Σ wᵢ pᵢ ||² expanded; the constant ||t||² is dropped and
        // the linear part lives on the variables.
        let tracking = program.add_expression("TrackingError");
        {
            let expression = program.expression_mut(tracking);
            for col in 0..c {
                let column_weights = self.components[col].weights();
                expression.set_quadratic(col, col, column_weights.dot(column_weights));
                for row in 0..col {
                    let cross = self.components[row].weights().dot(column_weights);
                    expression.set_quadratic(row, col, 2.0 * cross);
                }
            }
            expression.set_weight(1.0);
        }

        // (Σ aᵢ)², discouraging needless switches.
        let penalty = program.add_expression("SwitchPenalty");
        {
            let expression = program.expression_mut(penalty);
            for col in 0..c {
                expression.set_quadratic(c + col, c + col, 1.0);
                for row in 0..col {
                    expression.set_quadratic(c + row, c + col, 2.0);
                }
            }
            expression.set_weight(SWITCH_PENALTY);
        }

        let budget = program.add_expression("Budget");
        {
            let expression = program.expression_mut(budget);
            for i in 0..c {
                expression.set_linear(i, 1.0);
            }
            expression.set_bounds(LowerUpper::level(1.0));
        }

        for i in 0..c {
            let linkage = program.add_expression(format!("Linkage{}", i));
            program
                .expression_mut(linkage)
                .set_linear(i, 1.0)
                .set_linear(c + i, -1.0)
                .set_bounds(LowerUpper::upper(0.0));
        }

        let cardinality = program.add_expression("Cardinality");
        {
            let expression = program.expression_mut(cardinality);
            for i in 0..c {
                expression.set_linear(c + i, 1.0);
            }
            expression.set_bounds(LowerUpper::upper(max_components as f64));
        }

        for (asset, bounds) in &self.asset_exposures {
            let exposure = program.add_expression(format!("Exposure{}", asset));
            let expression = program.expression_mut(exposure);
            for (i, component) in self.components.iter().enumerate() {
                let coefficient = component.weights()[*asset];
                if coefficient != 0.0 {
                    expression.set_linear(i, coefficient);
                }
            }
            expression.set_bounds(*bounds);
        }

        program.validate()?;
        Ok(program)
    }

    /// Solves the mix with at most `max_components` active components.
    ///
    /// Returns one weight per component. Infeasibility is not an error:
    /// the state records it and the weights come back all zero.
    pub fn mix(&mut self, max_components: usize) -> Result<DVector<f64>, PortfolioError> {
        let program = self.build_program(max_components)?;
        let outcome = self.solver.minimize(&program, &self.options);
        debug!(
            max_components,
            state = ?outcome.state,
            objective = outcome.objective,
            "mix solved"
        );
        self.state = outcome.state;

        let c = self.components.len();
        if !outcome.state.is_feasible() {
            warn!(state = ?outcome.state, "mix infeasible, returning zero weights");
            return Ok(DVector::zeros(c));
        }
        Ok(DVector::from_fn(c, |i, _| {
            outcome.values[i].clamp(0.0, 1.0)
        }))
    }

    /// The asset weights the mixed portfolio ends up holding.
    pub fn mixed_asset_weights(&self, component_weights: &DVector<f64>) -> DVector<f64> {
        let assets = self.target.weights().len();
        let mut mixed = DVector::zeros(assets);
        for (i, component) in self.components.iter().enumerate() {
            mixed.axpy(component_weights[i], component.weights(), 1.0);
        }
        mixed
    }
}
