//! Branch-and-bound over binary indicator variables
//!
//! This module implements the mixed-integer layer used by the portfolio
//! mixer including:
//! - Continuous relaxation of binary variables to [0, 1], solved by the
//!   wrapped inner solver
//! - Depth-first search fixing one indicator per level, rounded-nearest
//!   child first
//! - Pruning by relaxation bound against the incumbent and by infeasibility
//!
//! The relaxation of a convex program is a valid lower bound for every
//! completion of its partial assignment, so a node whose relaxation cannot
//! beat the incumbent is dropped with its whole subtree.

use std::cmp::Ordering;
use std::time::Instant;

use tracing::{debug, warn};

use super::program::QuadraticProgram;
use super::solver::{OptimizationState, QpSolver, SolveOutcome, SolverOptions};

/// Distance from the nearest integer within which a relaxed binary counts
/// as integral.
pub const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Hard cap on explored nodes; past it the incumbent is returned as
/// `Feasible` instead of `Optimal`.
const MAX_NODES: usize = 10_000;

/// Branch-and-bound wrapper around an inner continuous solver.
#[derive(Debug, Clone)]
pub struct BranchAndBound<S> {
    relaxation: S,
}

impl<S: QpSolver> BranchAndBound<S> {
    pub fn new(relaxation: S) -> Self {
        Self { relaxation }
    }

    pub fn inner(&self) -> &S {
        &self.relaxation
    }
}

impl<S: QpSolver> QpSolver for BranchAndBound<S> {
    fn minimize(&self, program: &QuadraticProgram, options: &SolverOptions) -> SolveOutcome {
        let binaries = program.binary_variables();
        if binaries.is_empty() {
            return self.relaxation.minimize(program, options);
        }

        let n = program.variable_count();
        let deadline = options.time_limit.map(|limit| Instant::now() + limit);
        let mut incumbent: Option<SolveOutcome> = None;
        let mut stack: Vec<Vec<(usize, bool)>> = vec![Vec::new()];
        let mut nodes = 0usize;
        let mut exhausted = true;
        let mut any_failed = false;

        while let Some(assignment) = stack.pop() {
            if nodes >= MAX_NODES {
                warn!(nodes, "node cap reached, stopping search");
                exhausted = false;
                break;
            }
            let node_options = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(nodes, "time limit reached, stopping search");
                        exhausted = false;
                        break;
                    }
                    options.clone().with_time_limit(deadline - now)
                }
                None => options.clone(),
            };
            nodes += 1;

            let mut node_program = program.clone();
            for &(index, value) in &assignment {
                let fixed = if value { 1.0 } else { 0.0 };
                let variable = node_program.variable_mut(index);
                variable.lower = Some(fixed);
                variable.upper = Some(fixed);
                variable.initial = Some(fixed);
            }

            let relaxed = self.relaxation.minimize(&node_program, &node_options);
            match relaxed.state {
                OptimizationState::Infeasible => continue,
                OptimizationState::Failed | OptimizationState::Unexplored => {
                    any_failed = true;
                    continue;
                }
                _ => {}
            }
            if let Some(best) = &incumbent {
                if relaxed.objective >= best.objective - 1e-12 {
                    continue;
                }
            }

            let most_fractional = binaries
                .iter()
                .map(|&i| (i, (relaxed.values[i] - relaxed.values[i].round()).abs()))
                .filter(|&(_, distance)| distance > INTEGRALITY_TOLERANCE)
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

            match most_fractional {
                None => {
                    let mut values = relaxed.values;
                    for &i in &binaries {
                        values[i] = values[i].round();
                    }
                    let objective = program.objective(&values);
                    let improves = incumbent
                        .as_ref()
                        .map_or(true, |best| objective < best.objective);
                    if improves {
                        debug!(nodes, objective, "new incumbent");
                        incumbent = Some(SolveOutcome::new(relaxed.state, values, objective));
                    }
                }
                Some((index, _)) => {
                    // The rounded-nearest child goes on top of the stack so
                    // depth-first search dives toward an integral point.
                    let near_value = relaxed.values[index] >= 0.5;
                    let mut away = assignment.clone();
                    away.push((index, !near_value));
                    let mut near = assignment;
                    near.push((index, near_value));
                    stack.push(away);
                    stack.push(near);
                }
            }
        }

        match incumbent {
            Some(mut outcome) => {
                outcome.state = if exhausted {
                    OptimizationState::Optimal
                } else {
                    OptimizationState::Feasible
                };
                outcome
            }
            None if any_failed || !exhausted => SolveOutcome::failed(n),
            None => SolveOutcome::infeasible(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::program::{LowerUpper, Variable};
    use crate::optimizer::solver::ProjectedGradientQp;

    fn solver() -> BranchAndBound<ProjectedGradientQp> {
        BranchAndBound::new(ProjectedGradientQp::new())
    }

    #[test]
    fn test_single_binary_rounds_to_better_integer() {
        // minimize (x - 0.7)^2 over x in {0, 1}: relaxation is fractional,
        // x = 1 wins after branching.
        let mut program = QuadraticProgram::new();
        let x = program.add_variable(Variable::binary("x"));
        let q = program.add_expression("Distance");
        program
            .expression_mut(q)
            .set_quadratic(x, x, 1.0)
            .set_linear(x, -1.4)
            .set_weight(1.0);

        let outcome = solver().minimize(&program, &SolverOptions::default());
        assert_eq!(outcome.state, OptimizationState::Optimal);
        assert_eq!(outcome.values[0], 1.0);
        assert!((outcome.objective - (1.0 - 1.4)).abs() < 1e-12);
    }

    #[test]
    fn test_cardinality_constrained_selection() {
        // Two component weights on the simplex, each usable only when its
        // indicator is on, at most one indicator on.
        let mut program = QuadraticProgram::new();
        let w0 = program.add_variable(Variable::new("w0").with_lower_limit(0.0));
        let w1 = program.add_variable(Variable::new("w1").with_lower_limit(0.0));
        let a0 = program.add_variable(Variable::binary("a0"));
        let a1 = program.add_variable(Variable::binary("a1"));

        let q = program.add_expression("Tracking");
        program
            .expression_mut(q)
            .set_quadratic(w0, w0, 1.0)
            .set_linear(w0, -1.0)
            .set_quadratic(w1, w1, 1.0)
            .set_linear(w1, -1.0)
            .set_weight(1.0);

        let budget = program.add_expression("Budget");
        program
            .expression_mut(budget)
            .set_linear(w0, 1.0)
            .set_linear(w1, 1.0)
            .set_bounds(LowerUpper::level(1.0));

        for (w, a, name) in [(w0, a0, "Link0"), (w1, a1, "Link1")] {
            let link = program.add_expression(name);
            program
                .expression_mut(link)
                .set_linear(w, 1.0)
                .set_linear(a, -1.0)
                .set_bounds(LowerUpper::upper(0.0));
        }

        let cardinality = program.add_expression("Cardinality");
        program
            .expression_mut(cardinality)
            .set_linear(a0, 1.0)
            .set_linear(a1, 1.0)
            .set_bounds(LowerUpper::upper(1.0));

        let outcome = solver().minimize(&program, &SolverOptions::default());
        assert_eq!(outcome.state, OptimizationState::Optimal);

        // Exactly one component carries the whole budget.
        let weights = [outcome.values[w0], outcome.values[w1]];
        let indicators = [outcome.values[a0], outcome.values[a1]];
        assert!((weights[0] + weights[1] - 1.0).abs() < 1e-6);
        assert_eq!(indicators[0] + indicators[1], 1.0);
        let active = if indicators[0] == 1.0 { 0 } else { 1 };
        assert!((weights[active] - 1.0).abs() < 1e-5, "{:?}", weights);
        assert!(weights[1 - active].abs() < 1e-5, "{:?}", weights);
    }

    #[test]
    fn test_no_integral_completion_is_infeasible() {
        let mut program = QuadraticProgram::new();
        let a = program.add_variable(Variable::binary("a"));
        let pin = program.add_expression("Pin");
        program
            .expression_mut(pin)
            .set_linear(a, 1.0)
            .set_bounds(LowerUpper::level(0.5));

        let outcome = solver().minimize(&program, &SolverOptions::default());
        assert_eq!(outcome.state, OptimizationState::Infeasible);
    }

    #[test]
    fn test_no_binaries_delegates_to_inner_solver() {
        let mut program = QuadraticProgram::new();
        let x = program.add_variable(
            Variable::new("x")
                .with_lower_limit(0.0)
                .with_upper_limit(2.0),
        );
        let q = program.add_expression("Square");
        program
            .expression_mut(q)
            .set_quadratic(x, x, 1.0)
            .set_linear(x, -2.0)
            .set_weight(1.0);

        let outcome = solver().minimize(&program, &SolverOptions::default());
        assert_eq!(outcome.state, OptimizationState::Optimal);
        assert!((outcome.values[0] - 1.0).abs() < 1e-6);
    }
}
