//! Markowitz mean-variance optimization
//!
//! This module implements the constrained mean-variance model including:
//! - Assembly of the quadratic program: negated returns as linear weights,
//!   the covariance form as a weighted variance expression, a unit budget,
//!   per-asset weight limits and optional asset-subset constraints
//! - A geometric bisection over the risk-aversion factor that steers the
//!   optimal portfolio toward a target return or target variance
//! - In-band infeasibility: the model reports its `OptimizationState` and
//!   yields zero weights instead of erroring
//!
//! The program is built once per optimization; during a target search only
//! the variance expression's objective weight changes between trials.

use nalgebra::DVector;
use tracing::{debug, warn};

use crate::optimizer::{
    LowerUpper, OptimizationState, ProjectedGradientQp, QpSolver, QuadraticProgram, SolveOutcome,
    SolverOptions, Variable,
};

use super::equilibrium::{MarketEquilibrium, DEFAULT_RISK_AVERSION};
use super::model::{DerivedCache, MarketContext, PortfolioModel};
use super::PortfolioError;

/// Relative tolerance for the risk-aversion bracket.
pub const BISECTION_TOLERANCE: f64 = 1e-5;

/// Trial cap for a target search.
const MAX_BISECTION_TRIALS: usize = 100;

/// Consecutive infeasible trials tolerated before a search concludes the
/// constraints themselves are infeasible.
const MAX_BRACKET_WIDENINGS: usize = 3;

const VARIANCE_EXPRESSION: &str = "Variance";
const BUDGET_EXPRESSION: &str = "Budget";

/// What a risk-aversion search steers the optimal portfolio toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizationTarget {
    /// Expected portfolio return `wᵀr`.
    Return(f64),
    /// Portfolio variance `wᵀCw`.
    Variance(f64),
}

impl OptimizationTarget {
    fn value(&self) -> f64 {
        match *self {
            Self::Return(v) | Self::Variance(v) => v,
        }
    }
}

/// Builds the mean-variance program shared by `MarkowitzModel` and the
/// efficient-frontier sweep.
///
/// Each asset becomes a variable weighted by its negated expected return;
/// the variance expression carries the covariance upper triangle (doubled
/// off the diagonal) and is weighted `ra / 2`; the budget expression pins
/// the weight sum to one. An asset's explicit limits override the shorting
/// default: a set lower limit is used as is, otherwise shorting off forces
/// zero.
pub(crate) fn build_mean_variance_program(
    equilibrium: &MarketEquilibrium,
    expected_returns: &DVector<f64>,
    shorting_allowed: bool,
    asset_limits: &[LowerUpper],
    constraints: &[(Vec<usize>, LowerUpper)],
    warm_start: Option<&DVector<f64>>,
    risk_aversion: f64,
) -> Result<QuadraticProgram, PortfolioError> {
    let n = equilibrium.size();
    let mut program = QuadraticProgram::new();

    for (i, key) in equilibrium.asset_keys().iter().enumerate() {
        let limits = asset_limits.get(i).copied().unwrap_or_default();
        let mut variable = Variable::new(key.clone()).with_weight(-expected_returns[i]);
        match limits.lower {
            Some(lower) => variable = variable.with_lower_limit(lower),
            None if !shorting_allowed => variable = variable.with_lower_limit(0.0),
            None => {}
        }
        if let Some(upper) = limits.upper {
            variable = variable.with_upper_limit(upper);
        }
        if let Some(start) = warm_start {
            variable = variable.with_initial(start[i]);
        }
        program.add_variable(variable);
    }

    let variance = program.add_expression(VARIANCE_EXPRESSION);
    {
        let expression = program.expression_mut(variance);
        let covariances = equilibrium.covariances();
        for col in 0..n {
            expression.set_quadratic(col, col, covariances[(col, col)]);
            for row in 0..col {
                expression.set_quadratic(row, col, 2.0 * covariances[(row, col)]);
            }
        }
        expression.set_weight(risk_aversion / 2.0);
    }

    let budget = program.add_expression(BUDGET_EXPRESSION);
    {
        let expression = program.expression_mut(budget);
        for i in 0..n {
            expression.set_linear(i, 1.0);
        }
        expression.set_bounds(LowerUpper::level(1.0));
    }

    for (index, (assets, bounds)) in constraints.iter().enumerate() {
        let handle = program.add_expression(format!("Constraint{}", index));
        let expression = program.expression_mut(handle);
        for &asset in assets {
            expression.set_linear(asset, 1.0);
        }
        expression.set_bounds(*bounds);
    }

    program.validate()?;
    Ok(program)
}

/// The constrained mean-variance model.
///
/// Without a target the model solves once at the equilibrium's own
/// risk-aversion factor. With a target it searches the factor by geometric
/// bisection and stores the winning factor back into the equilibrium, so a
/// follow-up search starts from a narrow bracket around it.
pub struct MarkowitzModel {
    equilibrium: MarketEquilibrium,
    expected_returns: DVector<f64>,
    shorting_allowed: bool,
    asset_limits: Vec<LowerUpper>,
    constraints: Vec<(Vec<usize>, LowerUpper)>,
    target: Option<OptimizationTarget>,
    solver: Box<dyn QpSolver + Send + Sync>,
    options: SolverOptions,
    state: OptimizationState,
    warm_start: Option<DVector<f64>>,
    cache: DerivedCache,
}

impl std::fmt::Debug for MarkowitzModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkowitzModel")
            .field("assets", &self.equilibrium.size())
            .field("shorting_allowed", &self.shorting_allowed)
            .field("target", &self.target)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl MarkowitzModel {
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
        let assets = equilibrium.size();
        Ok(Self {
            equilibrium,
            expected_returns,
            shorting_allowed: false,
            asset_limits: vec![LowerUpper::default(); assets],
            constraints: Vec::new(),
            target: None,
            solver: Box::new(ProjectedGradientQp::new()),
            options: SolverOptions::default(),
            state: OptimizationState::Unexplored,
            warm_start: None,
            cache: DerivedCache::default(),
        })
    }

    /// Builds a model from any market context, at the default risk
    /// aversion.
    pub fn from_context(context: &impl MarketContext) -> Result<Self, PortfolioError> {
        let equilibrium = MarketEquilibrium::new(
            context.assets().to_vec(),
            context.covariances(),
            DEFAULT_RISK_AVERSION,
        )?;
        Self::new(equilibrium, context.asset_returns())
    }

    pub fn equilibrium(&self) -> &MarketEquilibrium {
        &self.equilibrium
    }

    /// State of the most recent optimization, `Unexplored` before the
    /// first and after any mutation.
    pub fn optimization_state(&self) -> OptimizationState {
        self.state
    }

    pub fn is_shorting_allowed(&self) -> bool {
        self.shorting_allowed
    }

    fn reset(&mut self) {
        self.cache.invalidate();
        self.state = OptimizationState::Unexplored;
    }

    /// Permits negative weights. Off by default; when off, every asset
    /// variable gets a zero lower limit.
    pub fn set_shorting_allowed(&mut self, allowed: bool) {
        self.shorting_allowed = allowed;
        self.reset();
    }

    pub fn set_risk_aversion(&mut self, factor: f64) {
        self.equilibrium.set_risk_aversion(factor);
        self.reset();
    }

    /// Targets an expected portfolio return. Replaces any variance target.
    pub fn set_target_return(&mut self, target: f64) {
        self.target = Some(OptimizationTarget::Return(target));
        self.reset();
    }

    /// Targets a portfolio variance. Replaces any return target.
    pub fn set_target_variance(&mut self, target: f64) {
        self.target = Some(OptimizationTarget::Variance(target));
        self.reset();
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.reset();
    }

    /// Bounds the summed weight of an asset subset.
    pub fn add_constraint(
        &mut self,
        assets: Vec<usize>,
        bounds: LowerUpper,
    ) -> Result<(), PortfolioError> {
        if assets.is_empty() {
            return Err(PortfolioError::InvalidInput(
                "constraint needs at least one asset".to_string(),
            ));
        }
        let n = self.equilibrium.size();
        if let Some(&bad) = assets.iter().find(|&&a| a >= n) {
            return Err(PortfolioError::InvalidInput(format!(
                "constraint references asset {} of {}",
                bad, n
            )));
        }
        self.constraints.push((assets, bounds));
        self.reset();
        Ok(())
    }

    /// Bounds one asset's weight directly. An explicit lower limit
    /// overrides the shorting default for that asset, so a negative lower
    /// permits shorting it while the rest stay long-only.
    pub fn set_asset_limits(
        &mut self,
        asset: usize,
        limits: LowerUpper,
    ) -> Result<(), PortfolioError> {
        let n = self.equilibrium.size();
        if asset >= n {
            return Err(PortfolioError::InvalidInput(format!(
                "asset limits reference asset {} of {}",
                asset, n
            )));
        }
        if let (Some(lower), Some(upper)) = (limits.lower, limits.upper) {
            if lower > upper {
                return Err(PortfolioError::InvalidInput(format!(
                    "asset {} limits have lower {} above upper {}",
                    asset, lower, upper
                )));
            }
        }
        self.asset_limits[asset] = limits;
        self.reset();
        Ok(())
    }

    /// Limits for one asset, unconstrained unless set.
    pub fn asset_limits(&self, asset: usize) -> LowerUpper {
        self.asset_limits.get(asset).copied().unwrap_or_default()
    }

    pub fn set_solver(&mut self, solver: Box<dyn QpSolver + Send + Sync>) {
        self.solver = solver;
        self.reset();
    }

    pub fn set_solver_options(&mut self, options: SolverOptions) {
        self.options = options;
        self.reset();
    }

    fn solve_at(&self, risk_aversion: f64) -> Result<SolveOutcome, PortfolioError> {
        let program = build_mean_variance_program(
            &self.equilibrium,
            &self.expected_returns,
            self.shorting_allowed,
            &self.asset_limits,
            &self.constraints,
            self.warm_start.as_ref(),
            risk_aversion,
        )?;
        let outcome = self.solver.minimize(&program, &self.options);
        debug!(
            risk_aversion,
            state = ?outcome.state,
            objective = outcome.objective,
            "mean-variance solve"
        );
        Ok(outcome)
    }

    fn measured_value(
        &self,
        target: OptimizationTarget,
        values: &DVector<f64>,
    ) -> Result<f64, PortfolioError> {
        match target {
            OptimizationTarget::Return(_) => Ok(self.expected_returns.dot(values)),
            OptimizationTarget::Variance(_) => {
                self.equilibrium.calculate_portfolio_variance(values)
            }
        }
    }

    /// The search bracket: wide open at the default factor, one decade
    /// around any explicitly set or previously found factor.
    fn initial_bracket(&self) -> (f64, f64) {
        let sqrt_ten = 10.0_f64.sqrt();
        let current = self.equilibrium.risk_aversion();
        if current == DEFAULT_RISK_AVERSION {
            (0.01 / sqrt_ten, 100.0 * 100.0 * sqrt_ten)
        } else {
            (current / sqrt_ten, current * sqrt_ten)
        }
    }

    /// Geometric bisection over the risk-aversion factor.
    ///
    /// Raising the factor lowers both the optimal return and the optimal
    /// variance, so one bracket-narrowing rule serves both target kinds.
    /// An infeasible trial carries no target information; the bracket is
    /// widened and the trial repeated, a bounded number of times, because
    /// feasibility does not depend on the factor.
    fn bisect_to_target(
        &mut self,
        target: OptimizationTarget,
    ) -> Result<SolveOutcome, PortfolioError> {
        let sqrt_ten = 10.0_f64.sqrt();
        let (mut low, mut high) = self.initial_bracket();
        let mut program = build_mean_variance_program(
            &self.equilibrium,
            &self.expected_returns,
            self.shorting_allowed,
            &self.asset_limits,
            &self.constraints,
            self.warm_start.as_ref(),
            self.equilibrium.risk_aversion(),
        )?;

        let mut widenings = 0usize;
        let mut trials = 0usize;
        let mut best: Option<(f64, f64, SolveOutcome)> = None;

        while trials < MAX_BISECTION_TRIALS && high / low >= 1.0 + BISECTION_TOLERANCE {
            trials += 1;
            let trial = (low * high).sqrt();
            if let Some(expression) = program.expression_named_mut(VARIANCE_EXPRESSION) {
                expression.set_weight(trial / 2.0);
            }
            let outcome = self.solver.minimize(&program, &self.options);

            if !outcome.state.is_feasible() {
                widenings += 1;
                if widenings > MAX_BRACKET_WIDENINGS {
                    warn!(trials, "target search abandoned, constraints appear infeasible");
                    return Ok(outcome);
                }
                low /= sqrt_ten;
                high *= sqrt_ten;
                warn!(trial, low, high, "infeasible trial skipped, bracket widened");
                continue;
            }
            widenings = 0;

            for (i, &value) in outcome.values.iter().enumerate() {
                program.variable_mut(i).initial = Some(value);
            }

            let measured = self.measured_value(target, &outcome.values)?;
            let error =
                (measured - target.value()).abs() / target.value().abs().max(BISECTION_TOLERANCE);
            debug!(trial, measured, error, low, high, "target search trial");

            if best.as_ref().map_or(true, |(e, _, _)| error < *e) {
                best = Some((error, trial, outcome));
            }

            if measured > target.value() {
                low = trial;
            } else {
                high = trial;
            }
        }

        match best {
            Some((error, factor, outcome)) => {
                debug!(trials, risk_aversion = factor, error, "target search finished");
                self.equilibrium.set_risk_aversion(factor);
                Ok(outcome)
            }
            None => {
                warn!(trials, "target search found no feasible trial");
                Ok(SolveOutcome::infeasible(self.equilibrium.size()))
            }
        }
    }

    /// Records the outcome state and extracts the weights: a feasible
    /// solve yields the solver point, clamped to each asset's floor (zero
    /// unless an explicit lower limit says otherwise) when shorting is
    /// off; anything else yields the zero vector.
    fn accept(&mut self, outcome: SolveOutcome) -> DVector<f64> {
        self.state = outcome.state;
        if !outcome.state.is_feasible() {
            warn!(state = ?outcome.state, "no usable weights, returning zeros");
            return DVector::zeros(self.equilibrium.size());
        }
        let mut weights = outcome.values;
        if !self.shorting_allowed {
            for (w, limits) in weights.iter_mut().zip(self.asset_limits.iter()) {
                *w = w.max(limits.lower.unwrap_or(0.0));
            }
        }
        self.warm_start = Some(weights.clone());
        weights
    }

    fn optimize_weights(&mut self) -> Result<DVector<f64>, PortfolioError> {
        let outcome = match self.target {
            Some(target) => self.bisect_to_target(target)?,
            None => self.solve_at(self.equilibrium.risk_aversion())?,
        };
        Ok(self.accept(outcome))
    }
}

impl PortfolioModel for MarkowitzModel {
    fn asset_returns(&mut self) -> Result<DVector<f64>, PortfolioError> {
        Ok(self.expected_returns.clone())
    }

    fn asset_weights(&mut self) -> Result<DVector<f64>, PortfolioError> {
        if let Some(weights) = self.cache.asset_weights_cached() {
            return Ok(weights);
        }
        let weights = self.optimize_weights()?;
        self.cache.store_asset_weights(weights.clone());
        Ok(weights)
    }

    fn mean_return(&mut self) -> Result<f64, PortfolioError> {
        let weights = self.asset_weights()?;
        let returns = &self.expected_returns;
        self.cache.mean_return_or(|| Ok(weights.dot(returns)))
    }

    fn return_variance(&mut self) -> Result<f64, PortfolioError> {
        let weights = self.asset_weights()?;
        let equilibrium = &self.equilibrium;
        self.cache
            .return_variance_or(|| equilibrium.calculate_portfolio_variance(&weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn two_asset_equilibrium(risk_aversion: f64) -> MarketEquilibrium {
        let covariances = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
        MarketEquilibrium::from_covariances(covariances, risk_aversion).unwrap()
    }

    #[test]
    fn test_solve_recovers_equilibrium_weights() {
        // Returns chosen so the unconstrained optimum (0.6, 0.4) already
        // sums to one; the budget constraint is consistent with it.
        let equilibrium = two_asset_equilibrium(2.0);
        let target = DVector::from_vec(vec![0.6, 0.4]);
        let returns = equilibrium.covariances() * &target * 2.0;

        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();
        model.set_shorting_allowed(true);
        let weights = model.asset_weights().unwrap();

        assert!(model.optimization_state().is_optimal());
        assert!(
            (&weights - &target).abs().max() < 1e-5,
            "weights {:?}",
            weights
        );
        assert!((weights.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_shorting_zeroes_poor_asset() {
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.10, -0.05]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();

        let weights = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());
        assert!((weights[0] - 1.0).abs() < 1e-5, "weights {:?}", weights);
        assert!(weights[1] >= 0.0);
        assert!(weights[1] < 1e-5);
    }

    #[test]
    fn test_subset_constraint_binds() {
        let covariances = DMatrix::from_row_slice(
            3,
            3,
            &[0.04, 0.0, 0.0, 0.0, 0.09, 0.0, 0.0, 0.0, 0.16],
        );
        let equilibrium = MarketEquilibrium::from_covariances(covariances, 1.0).unwrap();
        let returns = DVector::from_vec(vec![0.08, 0.06, 0.01]);

        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();
        model
            .add_constraint(vec![0, 1], LowerUpper::upper(0.3))
            .unwrap();

        let weights = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());
        assert!(weights[0] + weights[1] <= 0.3 + 1e-5, "weights {:?}", weights);
        assert!((weights.sum() - 1.0).abs() < 1e-5);
        // The budget forces the remainder into the capped-out asset.
        assert!((weights[2] - 0.7).abs() < 1e-4);
        assert!(weights[0] > weights[1]);
    }

    #[test]
    fn test_asset_limits_permit_single_asset_shorting() {
        // Shorting stays off globally; asset 1 alone gets an explicit
        // [-0.5, 1.0] box. The stationary point on the budget line is far
        // below -0.5, so the explicit floor binds at (1.5, -0.5) instead
        // of the forced-zero answer (1.0, 0.0).
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.20, 0.02]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();
        model
            .set_asset_limits(1, LowerUpper::range(-0.5, 1.0))
            .unwrap();

        let weights = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());
        assert!((weights[0] - 1.5).abs() < 1e-5, "weights {:?}", weights);
        assert!((weights[1] + 0.5).abs() < 1e-5, "weights {:?}", weights);
        assert!(weights[1] < 0.0);
    }

    #[test]
    fn test_asset_upper_limit_binds() {
        // Asset 0 would take the whole budget; capping it at 0.6 forces
        // the remainder into asset 1.
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.10, -0.05]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();
        model.set_asset_limits(0, LowerUpper::upper(0.6)).unwrap();

        let weights = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());
        assert!((weights[0] - 0.6).abs() < 1e-5, "weights {:?}", weights);
        assert!((weights[1] - 0.4).abs() < 1e-5, "weights {:?}", weights);
    }

    #[test]
    fn test_asset_limit_validation() {
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.08, 0.05]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();

        assert!(model.asset_limits(0).is_unconstrained());
        model
            .set_asset_limits(0, LowerUpper::range(0.1, 0.9))
            .unwrap();
        assert_eq!(model.asset_limits(0).lower, Some(0.1));
        assert_eq!(model.asset_limits(0).upper, Some(0.9));

        assert!(model.set_asset_limits(2, LowerUpper::upper(0.5)).is_err());
        assert!(model
            .set_asset_limits(0, LowerUpper::range(0.9, 0.1))
            .is_err());

        let _ = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());
        model.set_asset_limits(1, LowerUpper::lower(0.2)).unwrap();
        assert_eq!(model.optimization_state(), OptimizationState::Unexplored);
    }

    #[test]
    fn test_target_return_search() {
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.10, 0.02]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();
        model.set_target_return(0.09);

        let weights = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());

        let mean = model.mean_return().unwrap();
        assert!((mean - 0.09).abs() < 1e-4, "mean {}", mean);
        assert!((weights.sum() - 1.0).abs() < 1e-5);
        // The search stores the factor it found.
        assert_ne!(model.equilibrium().risk_aversion(), 1.0);
    }

    #[test]
    fn test_target_variance_search() {
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.10, 0.02]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();
        model.set_target_variance(0.036);

        let _ = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());

        let variance = model.return_variance().unwrap();
        assert!((variance - 0.036).abs() < 1e-4, "variance {}", variance);
    }

    #[test]
    fn test_infeasible_constraints_yield_zero_weights() {
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.08, 0.05]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();
        // Caps sum to 0.4, the budget needs 1.
        model
            .add_constraint(vec![0], LowerUpper::upper(0.2))
            .unwrap();
        model
            .add_constraint(vec![1], LowerUpper::upper(0.2))
            .unwrap();

        let weights = model.asset_weights().unwrap();
        assert_eq!(model.optimization_state(), OptimizationState::Infeasible);
        assert!(weights.iter().all(|&w| w == 0.0));
        assert_eq!(model.mean_return().unwrap(), 0.0);
    }

    #[test]
    fn test_mutation_resets_state() {
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.08, 0.05]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();

        let _ = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());

        model.set_shorting_allowed(true);
        assert_eq!(model.optimization_state(), OptimizationState::Unexplored);

        let _ = model.asset_weights().unwrap();
        assert!(model.optimization_state().is_feasible());
    }

    #[test]
    fn test_constraint_validation() {
        let equilibrium = two_asset_equilibrium(1.0);
        let returns = DVector::from_vec(vec![0.08, 0.05]);
        let mut model = MarkowitzModel::new(equilibrium, returns).unwrap();

        assert!(model.add_constraint(vec![], LowerUpper::upper(0.5)).is_err());
        assert!(model
            .add_constraint(vec![2], LowerUpper::upper(0.5))
            .is_err());

        let short = DVector::from_vec(vec![0.08]);
        assert!(MarkowitzModel::new(two_asset_equilibrium(1.0), short).is_err());
    }
}
