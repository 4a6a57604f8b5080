//! Solver seam and bundled quadratic-program oracle
//!
//! This module implements the interface between portfolio adapters and
//! whatever actually minimizes their programs including:
//! - The `OptimizationState` taxonomy in which infeasibility is a reported
//!   state, never an error
//! - The `QpSolver` trait hiding the concrete solver behind an opaque seam
//! - `ProjectedGradientQp`, the bundled default: projected gradient descent
//!   over box bounds, one exact budget-style equality and general linear
//!   side constraints
//!
//! The bundled solver is tuned for the convex programs the adapters emit
//! (positive-semidefinite quadratic objective, simplex-like feasible set).
//! It is not a general-purpose QP code; anything with quadratic constraint
//! expressions is reported as `Failed`.

use std::time::{Duration, Instant};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::program::{LowerUpper, QuadraticProgram};

/// Largest constraint violation still considered feasible.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Passes of cyclic constraint projection per gradient step.
const MAX_PROJECTION_PASSES: usize = 100;

/// Violation at which cyclic projection stops early.
const PROJECTION_EXIT: f64 = 1e-12;

/// Terminal (or initial) state of an optimization attempt.
///
/// An infeasible program is a legitimate answer about the inputs, so it is
/// carried here in-band; errors are reserved for malformed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationState {
    /// No solve has happened yet.
    Unexplored,
    /// Converged and feasible.
    Optimal,
    /// Integral-feasible but optimality not proven.
    Feasible,
    /// Feasible but the iteration budget ran out before convergence.
    Approximate,
    /// The constraints admit no solution.
    Infeasible,
    /// The solver broke down, typically on non-finite arithmetic.
    Failed,
}

impl OptimizationState {
    /// Whether the associated values satisfy the constraints and are usable.
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible | Self::Approximate)
    }

    /// Whether the solver proved optimality.
    pub fn is_optimal(&self) -> bool {
        matches!(self, Self::Optimal)
    }
}

/// Result of one solve: terminal state, variable values and objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOutcome {
    pub state: OptimizationState,
    pub values: DVector<f64>,
    pub objective: f64,
}

impl SolveOutcome {
    pub fn new(state: OptimizationState, values: DVector<f64>, objective: f64) -> Self {
        Self {
            state,
            values,
            objective,
        }
    }

    /// An infeasible outcome carrying zeroed values.
    pub fn infeasible(variable_count: usize) -> Self {
        Self::new(
            OptimizationState::Infeasible,
            DVector::zeros(variable_count),
            f64::NAN,
        )
    }

    /// A failed outcome carrying zeroed values.
    pub fn failed(variable_count: usize) -> Self {
        Self::new(
            OptimizationState::Failed,
            DVector::zeros(variable_count),
            f64::NAN,
        )
    }
}

/// Iteration and termination controls for a solve.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Wall-clock budget passed through to the solver. `None` means no
    /// limit; iteration caps still apply.
    pub time_limit: Option<Duration>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-8,
            time_limit: None,
        }
    }
}

impl SolverOptions {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

/// The oracle interface the portfolio layer talks to. Implementations
/// minimize the objective; adapters negate whatever they want maximized.
pub trait QpSolver {
    fn minimize(&self, program: &QuadraticProgram, options: &SolverOptions) -> SolveOutcome;
}

/// A general linear constraint extracted from a bounded expression.
struct LinearConstraint {
    coefficients: DVector<f64>,
    squared_norm: f64,
    bounds: LowerUpper,
    /// Zero/one coefficients with a level bound: eligible for the exact
    /// budget projection over the touched variables.
    is_budget: bool,
}

/// Projected gradient descent for the adapter-emitted program family.
///
/// Each iteration takes a gradient step (optionally with momentum) and then
/// re-projects onto the feasible set by cyclic projection: box clamp for
/// variables no budget equality touches, hyperplane correction per general
/// constraint, then an exact bisection-based projection for the budget
/// equality. The bisection runs from the unclamped iterate and enforces the
/// participating boxes itself, so that step is the true Euclidean
/// projection onto the budget-and-box intersection. The feasible set of
/// these programs is an intersection of convex sets, so the cycle settles
/// onto it; a cycle that cannot get the violation down signals an
/// infeasible program.
#[derive(Debug, Clone)]
pub struct ProjectedGradientQp {
    /// Step size. `None` derives one from the objective curvature.
    pub learning_rate: Option<f64>,
    pub momentum: f64,
}

impl Default for ProjectedGradientQp {
    fn default() -> Self {
        Self {
            learning_rate: None,
            momentum: 0.0,
        }
    }
}

impl ProjectedGradientQp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = Some(learning_rate);
        self
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    fn extract_constraints(program: &QuadraticProgram) -> Option<Vec<LinearConstraint>> {
        let n = program.variable_count();
        let mut constraints = Vec::new();
        for expression in program.expressions() {
            if expression.bounds.is_unconstrained() {
                continue;
            }
            if !expression.is_linear() {
                return None;
            }
            let mut coefficients = DVector::zeros(n);
            for &(i, c) in expression.linear_coefficients() {
                coefficients[i] += c;
            }
            let squared_norm = coefficients.norm_squared();
            let is_budget = expression.bounds.lower == expression.bounds.upper
                && expression.bounds.lower.is_some()
                && coefficients.iter().all(|&c| c == 0.0 || c == 1.0)
                && coefficients.iter().any(|&c| c == 1.0);
            constraints.push(LinearConstraint {
                coefficients,
                squared_norm,
                bounds: expression.bounds,
                is_budget,
            });
        }
        Some(constraints)
    }

    /// Derives a safe step size from the Frobenius norm of the assembled
    /// Hessian, which bounds its spectral radius.
    fn derive_learning_rate(program: &QuadraticProgram) -> f64 {
        let n = program.variable_count();
        let mut hessian = nalgebra::DMatrix::<f64>::zeros(n, n);
        for expression in program.expressions() {
            if let Some(w) = expression.weight() {
                for &(i, j, q) in expression.quadratic_coefficients() {
                    hessian[(i, j)] += w * q;
                    hessian[(j, i)] += w * q;
                }
            }
        }
        let curvature = hessian.norm();
        if curvature > 1e-12 && curvature.is_finite() {
            1.0 / curvature
        } else {
            0.1
        }
    }

    fn initial_point(program: &QuadraticProgram) -> DVector<f64> {
        DVector::from_fn(program.variable_count(), |i, _| {
            let variable = program.variable(i);
            let limits = variable.limits();
            match variable.initial {
                Some(initial) => limits.clamp(initial),
                None => match (variable.lower, variable.upper) {
                    (Some(l), Some(u)) => 0.5 * (l + u),
                    (Some(l), None) => l,
                    (None, Some(u)) => u.min(0.0),
                    (None, None) => 0.0,
                },
            }
        })
    }

    /// Flags the variables a budget equality touches. Their box is enforced
    /// inside the budget bisection, never by the standalone clamp.
    fn budget_covered(constraints: &[LinearConstraint], n: usize) -> Vec<bool> {
        let mut covered = vec![false; n];
        for constraint in constraints.iter().filter(|c| c.is_budget) {
            for (flag, &c) in covered.iter_mut().zip(constraint.coefficients.iter()) {
                *flag |= c == 1.0;
            }
        }
        covered
    }

    /// Exact projection onto {Σ selected xᵢ = level} ∩ box via bisection on
    /// the shift multiplier; `selected` holds the 0/1 budget coefficients.
    /// Saturates at the box when the level is out of reach, leaving a
    /// macroscopic violation for the caller to detect.
    fn project_budget(
        values: &mut DVector<f64>,
        boxes: &[LowerUpper],
        selected: &DVector<f64>,
        level: f64,
    ) {
        let reference = values.clone();
        let sum_at = |shift: f64| -> f64 {
            reference
                .iter()
                .zip(boxes.iter())
                .zip(selected.iter())
                .filter(|&(_, &s)| s == 1.0)
                .map(|((y, b), _)| b.clamp(y - shift))
                .sum()
        };

        let mut lo = -1.0;
        let mut hi = 1.0;
        for _ in 0..200 {
            if sum_at(lo) >= level {
                break;
            }
            lo *= 2.0;
        }
        for _ in 0..200 {
            if sum_at(hi) <= level {
                break;
            }
            hi *= 2.0;
        }
        for _ in 0..80 {
            let mid = 0.5 * (lo + hi);
            if sum_at(mid) >= level {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let shift = 0.5 * (lo + hi);
        for ((value, (y, b)), &s) in values
            .iter_mut()
            .zip(reference.iter().zip(boxes.iter()))
            .zip(selected.iter())
        {
            if s == 1.0 {
                *value = b.clamp(y - shift);
            }
        }
    }

    /// Cyclic projection onto the intersection of box, general linear
    /// constraints and budget equalities. Returns the residual violation.
    /// Variables flagged `covered` get their box enforced inside the budget
    /// bisection, which must see the unclamped iterate to stay an exact
    /// projection.
    fn project_feasible(
        values: &mut DVector<f64>,
        boxes: &[LowerUpper],
        covered: &[bool],
        constraints: &[LinearConstraint],
        program: &QuadraticProgram,
    ) -> f64 {
        for _ in 0..MAX_PROJECTION_PASSES {
            for ((value, limits), &in_budget) in
                values.iter_mut().zip(boxes.iter()).zip(covered.iter())
            {
                if !in_budget {
                    *value = limits.clamp(*value);
                }
            }
            for constraint in constraints {
                if constraint.is_budget || constraint.squared_norm == 0.0 {
                    continue;
                }
                let attained = constraint.coefficients.dot(values);
                let target = if let Some(upper) = constraint.bounds.upper {
                    if attained > upper {
                        Some(upper)
                    } else {
                        None
                    }
                } else {
                    None
                }
                .or_else(|| {
                    constraint.bounds.lower.and_then(|lower| {
                        if attained < lower {
                            Some(lower)
                        } else {
                            None
                        }
                    })
                });
                if let Some(target) = target {
                    let correction = (target - attained) / constraint.squared_norm;
                    values.axpy(correction, &constraint.coefficients, 1.0);
                }
            }
            for constraint in constraints {
                if constraint.is_budget {
                    if let Some(level) = constraint.bounds.lower {
                        Self::project_budget(values, boxes, &constraint.coefficients, level);
                    }
                }
            }
            let violation = program.max_violation(values);
            if violation < PROJECTION_EXIT {
                return violation;
            }
        }
        program.max_violation(values)
    }
}

impl QpSolver for ProjectedGradientQp {
    fn minimize(&self, program: &QuadraticProgram, options: &SolverOptions) -> SolveOutcome {
        let n = program.variable_count();
        if n == 0 {
            return SolveOutcome::new(OptimizationState::Optimal, DVector::zeros(0), 0.0);
        }

        let constraints = match Self::extract_constraints(program) {
            Some(constraints) => constraints,
            None => {
                warn!("bounded quadratic expression is outside the bundled solver's scope");
                return SolveOutcome::failed(n);
            }
        };
        let boxes: Vec<LowerUpper> = program.variables().iter().map(|v| v.limits()).collect();
        let covered = Self::budget_covered(&constraints, n);

        let mut values = Self::initial_point(program);
        let violation = Self::project_feasible(&mut values, &boxes, &covered, &constraints, program);
        if violation > FEASIBILITY_TOLERANCE {
            debug!(violation, "no feasible point found during projection");
            let objective = program.objective(&values);
            return SolveOutcome::new(OptimizationState::Infeasible, values, objective);
        }

        let learning_rate = self
            .learning_rate
            .unwrap_or_else(|| Self::derive_learning_rate(program));
        let mut velocity = DVector::zeros(n);
        let mut converged = false;
        let started = Instant::now();

        for iteration in 0..options.max_iterations {
            if let Some(limit) = options.time_limit {
                if started.elapsed() >= limit {
                    debug!(iteration, "time limit reached");
                    break;
                }
            }

            let gradient = program.objective_gradient(&values);
            if gradient.iter().any(|g| !g.is_finite()) {
                warn!(iteration, "non-finite gradient, aborting");
                return SolveOutcome::failed(n);
            }

            let previous = values.clone();
            velocity = self.momentum * &velocity - learning_rate * &gradient;
            values += &velocity;
            Self::project_feasible(&mut values, &boxes, &covered, &constraints, program);

            let step = (&values - &previous).abs().max();
            if step < options.tolerance {
                converged = true;
                debug!(iteration, step, "projected gradient converged");
                break;
            }
        }

        let objective = program.objective(&values);
        if !objective.is_finite() || values.iter().any(|v| !v.is_finite()) {
            return SolveOutcome::failed(n);
        }
        let state = if program.max_violation(&values) > FEASIBILITY_TOLERANCE {
            OptimizationState::Infeasible
        } else if converged {
            OptimizationState::Optimal
        } else {
            OptimizationState::Approximate
        };
        SolveOutcome::new(state, values, objective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::program::Variable;

    fn simplex_program(weights: &[f64], quadratic: &[(usize, usize, f64)]) -> QuadraticProgram {
        let mut program = QuadraticProgram::new();
        for (i, &w) in weights.iter().enumerate() {
            program.add_variable(
                Variable::new(format!("x{}", i))
                    .with_lower_limit(0.0)
                    .with_weight(w),
            );
        }
        let q = program.add_expression("Quadratic");
        for &(i, j, c) in quadratic {
            program.expression_mut(q).set_quadratic(i, j, c);
        }
        program.expression_mut(q).set_weight(1.0);

        let budget = program.add_expression("Budget");
        for i in 0..weights.len() {
            program.expression_mut(budget).set_linear(i, 1.0);
        }
        program
            .expression_mut(budget)
            .set_bounds(LowerUpper::level(1.0));
        program
    }

    #[test]
    fn test_symmetric_quadratic_on_simplex() {
        // minimize x0^2 + x1^2 on the simplex: (0.5, 0.5).
        let program = simplex_program(&[0.0, 0.0], &[(0, 0, 1.0), (1, 1, 1.0)]);
        let outcome = ProjectedGradientQp::new().minimize(&program, &SolverOptions::default());

        assert_eq!(outcome.state, OptimizationState::Optimal);
        assert!((outcome.values[0] - 0.5).abs() < 1e-6);
        assert!((outcome.values[1] - 0.5).abs() < 1e-6);
        assert!((outcome.values.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_variance_recovers_equilibrium_weights() {
        // With returns set to risk_aversion * C * w_eq, minimizing
        // (ra/2) x'Cx - r'x on the simplex lands back on w_eq.
        let risk_aversion = 2.0;
        let c = [[0.04, 0.01], [0.01, 0.09]];
        let w_eq = [0.5, 0.5];
        let r: Vec<f64> = (0..2)
            .map(|i| risk_aversion * (c[i][0] * w_eq[0] + c[i][1] * w_eq[1]))
            .collect();

        let mut quadratic = Vec::new();
        for i in 0..2 {
            for j in 0..2 {
                quadratic.push((i, j, 0.5 * risk_aversion * c[i][j]));
            }
        }
        let program = simplex_program(&[-r[0], -r[1]], &quadratic);
        let outcome = ProjectedGradientQp::new().minimize(&program, &SolverOptions::default());

        assert!(outcome.state.is_feasible());
        assert!((outcome.values[0] - 0.5).abs() < 1e-5, "{:?}", outcome.values);
        assert!((outcome.values[1] - 0.5).abs() < 1e-5, "{:?}", outcome.values);
    }

    #[test]
    fn test_high_risk_aversion_mean_variance_is_exact() {
        // minimize (ra/2) x'Cx - r'x on the simplex at ra = 1000. On the
        // budget line the stationary point is x0 = (0.16 + 0.16/ra) / 0.22,
        // and near it the raw gradient step leaves the box, so the budget
        // projection only lands back on the optimum if it sees the
        // unclamped iterate.
        let risk_aversion = 1000.0;
        let c = [[0.04, 0.01], [0.01, 0.09]];
        let r = [0.10, 0.02];
        let mut quadratic = Vec::new();
        for i in 0..2 {
            for j in 0..2 {
                quadratic.push((i, j, 0.5 * risk_aversion * c[i][j]));
            }
        }
        let program = simplex_program(&[-r[0], -r[1]], &quadratic);
        let outcome = ProjectedGradientQp::new().minimize(&program, &SolverOptions::default());

        let expected = (0.16 + 0.16 / risk_aversion) / 0.22;
        assert_eq!(outcome.state, OptimizationState::Optimal);
        assert!(
            (outcome.values[0] - expected).abs() < 1e-6,
            "{:?}",
            outcome.values
        );
        assert!((outcome.values.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nonnegativity_clamps_unattractive_asset() {
        // Asset 1 has a negative expected return and no covariance link, so
        // without shorting everything goes into asset 0.
        let program = simplex_program(
            &[-0.1, 0.05],
            &[(0, 0, 0.5 * 0.04), (1, 1, 0.5 * 0.09)],
        );
        let outcome = ProjectedGradientQp::new().minimize(&program, &SolverOptions::default());

        assert!(outcome.state.is_feasible());
        assert!((outcome.values[0] - 1.0).abs() < 1e-6, "{:?}", outcome.values);
        assert!(outcome.values[1].abs() < 1e-6, "{:?}", outcome.values);
    }

    #[test]
    fn test_conflicting_bounds_report_infeasible() {
        let mut program = simplex_program(&[0.0, 0.0], &[(0, 0, 1.0), (1, 1, 1.0)]);
        // Cap both variables at 0.3: the budget of 1 is unreachable.
        for i in 0..2 {
            program.variable_mut(i).upper = Some(0.3);
        }
        let outcome = ProjectedGradientQp::new().minimize(&program, &SolverOptions::default());

        assert_eq!(outcome.state, OptimizationState::Infeasible);
        assert!(!outcome.state.is_feasible());
    }

    #[test]
    fn test_general_linear_side_constraint() {
        // minimize x0^2 + x1^2 on the simplex with x1 <= 0.2.
        let mut program = simplex_program(&[0.0, 0.0], &[(0, 0, 1.0), (1, 1, 1.0)]);
        let cap = program.add_expression("Cap");
        program
            .expression_mut(cap)
            .set_linear(1, 1.0)
            .set_bounds(LowerUpper::upper(0.2));
        let outcome = ProjectedGradientQp::new().minimize(&program, &SolverOptions::default());

        assert!(outcome.state.is_feasible());
        assert!((outcome.values[0] - 0.8).abs() < 1e-5, "{:?}", outcome.values);
        assert!((outcome.values[1] - 0.2).abs() < 1e-5, "{:?}", outcome.values);
    }

    #[test]
    fn test_zero_time_limit_returns_projected_point() {
        let program = simplex_program(&[0.0, 0.0], &[(0, 0, 1.0), (1, 1, 1.0)]);
        let options = SolverOptions::default().with_time_limit(Duration::ZERO);
        let outcome = ProjectedGradientQp::new().minimize(&program, &options);

        assert_eq!(outcome.state, OptimizationState::Approximate);
        assert!((outcome.values.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_objective_is_failed() {
        let program = simplex_program(&[f64::NAN, 0.0], &[(0, 0, 1.0), (1, 1, 1.0)]);
        let outcome = ProjectedGradientQp::new().minimize(&program, &SolverOptions::default());
        assert_eq!(outcome.state, OptimizationState::Failed);
    }

    #[test]
    fn test_state_predicates() {
        assert!(OptimizationState::Optimal.is_feasible());
        assert!(OptimizationState::Feasible.is_feasible());
        assert!(OptimizationState::Approximate.is_feasible());
        assert!(!OptimizationState::Infeasible.is_feasible());
        assert!(!OptimizationState::Failed.is_feasible());
        assert!(!OptimizationState::Unexplored.is_feasible());
        assert!(OptimizationState::Optimal.is_optimal());
        assert!(!OptimizationState::Feasible.is_optimal());
    }
}
