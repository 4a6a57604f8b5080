//! Quadratic program representation
//!
//! This module implements the model objects the portfolio adapters build
//! including:
//! - Bounded, optionally binary decision variables with linear objective
//!   weights
//! - Named expressions mixing linear and quadratic coefficients, usable as
//!   constraints (bounded) or objective contributions (weighted)
//! - The assembled `QuadraticProgram` with objective, gradient and
//!   feasibility evaluation at a point
//!
//! An expression's objective weight is settable after construction, so a
//! model can be built once and re-weighted per solve. Variable and
//! expression indices are handed out by the program; using an out-of-range
//! index is a programming error and panics.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::OptimizerError;

/// An optional lower and upper limit pair. Both absent means unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LowerUpper {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl LowerUpper {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    pub fn lower(limit: f64) -> Self {
        Self {
            lower: Some(limit),
            upper: None,
        }
    }

    pub fn upper(limit: f64) -> Self {
        Self {
            lower: None,
            upper: Some(limit),
        }
    }

    pub fn range(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// Fixes the value exactly: lower == upper == `level`.
    pub fn level(level: f64) -> Self {
        Self::range(level, level)
    }

    pub fn is_unconstrained(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Clamps `value` into the limits.
    pub fn clamp(&self, value: f64) -> f64 {
        let mut v = value;
        if let Some(lower) = self.lower {
            v = v.max(lower);
        }
        if let Some(upper) = self.upper {
            v = v.min(upper);
        }
        v
    }

    /// Signed violation of `value` against the limits: 0.0 when inside.
    pub fn violation(&self, value: f64) -> f64 {
        if let Some(lower) = self.lower {
            if value < lower {
                return lower - value;
            }
        }
        if let Some(upper) = self.upper {
            if value > upper {
                return value - upper;
            }
        }
        0.0
    }
}

/// A decision variable of a quadratic program.
///
/// `weight` is the linear objective coefficient; portfolio adapters store
/// the negated expected excess return here. `binary` restricts the variable
/// to {0, 1} when solved through the mixed-integer layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub initial: Option<f64>,
    pub weight: f64,
    pub binary: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: None,
            upper: None,
            initial: None,
            weight: 0.0,
            binary: false,
        }
    }

    /// A variable restricted to {0, 1}, relaxed to [0, 1] outside the
    /// mixed-integer layer.
    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: Some(0.0),
            upper: Some(1.0),
            initial: None,
            weight: 0.0,
            binary: true,
        }
    }

    pub fn with_lower_limit(mut self, limit: f64) -> Self {
        self.lower = Some(limit);
        self
    }

    pub fn with_upper_limit(mut self, limit: f64) -> Self {
        self.upper = Some(limit);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Warm-start value, clamped into the limits before use.
    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn limits(&self) -> LowerUpper {
        LowerUpper::new(self.lower, self.upper)
    }
}

/// A named linear/quadratic form over the program's variables.
///
/// The value at a point x is `Σ lᵢxᵢ + Σ q_ij xᵢxⱼ`, one term per stored
/// coefficient. Bounds turn the expression into a constraint; a weight turns
/// it into an objective contribution. Both at once is permitted by the
/// representation but not produced by the portfolio adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub name: String,
    linear: Vec<(usize, f64)>,
    quadratic: Vec<(usize, usize, f64)>,
    pub bounds: LowerUpper,
    weight: Option<f64>,
}

impl Expression {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            linear: Vec::new(),
            quadratic: Vec::new(),
            bounds: LowerUpper::default(),
            weight: None,
        }
    }

    pub fn set_linear(&mut self, index: usize, coefficient: f64) -> &mut Self {
        self.linear.push((index, coefficient));
        self
    }

    pub fn set_quadratic(&mut self, row: usize, col: usize, coefficient: f64) -> &mut Self {
        self.quadratic.push((row, col, coefficient));
        self
    }

    pub fn set_bounds(&mut self, bounds: LowerUpper) -> &mut Self {
        self.bounds = bounds;
        self
    }

    /// Sets the objective factor. Callable after the model is built, which
    /// is how a variance expression is re-weighted per solve.
    pub fn set_weight(&mut self, weight: f64) -> &mut Self {
        self.weight = Some(weight);
        self
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    pub fn linear_coefficients(&self) -> &[(usize, f64)] {
        &self.linear
    }

    pub fn quadratic_coefficients(&self) -> &[(usize, usize, f64)] {
        &self.quadratic
    }

    pub fn is_linear(&self) -> bool {
        self.quadratic.is_empty()
    }

    /// Value of the expression at `point`.
    pub fn evaluate(&self, point: &DVector<f64>) -> f64 {
        let mut value = 0.0;
        for &(i, l) in &self.linear {
            value += l * point[i];
        }
        for &(i, j, q) in &self.quadratic {
            value += q * point[i] * point[j];
        }
        value
    }

    /// Adds `factor` times the expression gradient at `point` into `out`.
    pub fn add_gradient(&self, point: &DVector<f64>, factor: f64, out: &mut DVector<f64>) {
        for &(i, l) in &self.linear {
            out[i] += factor * l;
        }
        for &(i, j, q) in &self.quadratic {
            out[i] += factor * q * point[j];
            out[j] += factor * q * point[i];
        }
    }
}

/// A quadratic program assembled by an adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuadraticProgram {
    variables: Vec<Variable>,
    expressions: Vec<Expression>,
}

impl QuadraticProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable and returns its index.
    pub fn add_variable(&mut self, variable: Variable) -> usize {
        self.variables.push(variable);
        self.variables.len() - 1
    }

    /// Adds an empty expression and returns its index.
    pub fn add_expression(&mut self, name: impl Into<String>) -> usize {
        self.expressions.push(Expression::new(name));
        self.expressions.len() - 1
    }

    pub fn variable(&self, index: usize) -> &Variable {
        &self.variables[index]
    }

    pub fn variable_mut(&mut self, index: usize) -> &mut Variable {
        &mut self.variables[index]
    }

    pub fn expression(&self, index: usize) -> &Expression {
        &self.expressions[index]
    }

    pub fn expression_mut(&mut self, index: usize) -> &mut Expression {
        &mut self.expressions[index]
    }

    /// Looks an expression up by name.
    pub fn expression_named(&self, name: &str) -> Option<&Expression> {
        self.expressions.iter().find(|e| e.name == name)
    }

    pub fn expression_named_mut(&mut self, name: &str) -> Option<&mut Expression> {
        self.expressions.iter_mut().find(|e| e.name == name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Indices of variables marked binary.
    pub fn binary_variables(&self) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.binary)
            .map(|(i, _)| i)
            .collect()
    }

    /// Objective value at `point`: variable weights plus weighted
    /// expressions.
    pub fn objective(&self, point: &DVector<f64>) -> f64 {
        let mut value = 0.0;
        for (i, v) in self.variables.iter().enumerate() {
            value += v.weight * point[i];
        }
        for e in &self.expressions {
            if let Some(w) = e.weight() {
                value += w * e.evaluate(point);
            }
        }
        value
    }

    /// Objective gradient at `point`.
    pub fn objective_gradient(&self, point: &DVector<f64>) -> DVector<f64> {
        let mut gradient = DVector::zeros(self.variables.len());
        for (i, v) in self.variables.iter().enumerate() {
            gradient[i] = v.weight;
        }
        for e in &self.expressions {
            if let Some(w) = e.weight() {
                e.add_gradient(point, w, &mut gradient);
            }
        }
        gradient
    }

    /// Largest constraint violation at `point`, over variable limits and
    /// bounded expressions.
    pub fn max_violation(&self, point: &DVector<f64>) -> f64 {
        let mut worst = 0.0_f64;
        for (i, v) in self.variables.iter().enumerate() {
            worst = worst.max(v.limits().violation(point[i]));
        }
        for e in &self.expressions {
            if !e.bounds.is_unconstrained() {
                worst = worst.max(e.bounds.violation(e.evaluate(point)));
            }
        }
        worst
    }

    /// Whether `point` satisfies every limit within `tolerance`.
    pub fn is_feasible_point(&self, point: &DVector<f64>, tolerance: f64) -> bool {
        self.max_violation(point) <= tolerance
    }

    /// Checks coefficient indices and limit ordering across the whole
    /// model. Adapters call this once after assembly.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        let n = self.variables.len();
        for v in &self.variables {
            if let (Some(lower), Some(upper)) = (v.lower, v.upper) {
                if lower > upper {
                    return Err(OptimizerError::InvertedLimits(format!(
                        "variable {:?} has lower {} above upper {}",
                        v.name, lower, upper
                    )));
                }
            }
        }
        for e in &self.expressions {
            for &(i, _) in &e.linear {
                if i >= n {
                    return Err(OptimizerError::IndexOutOfRange(format!(
                        "expression {:?} references variable {} of {}",
                        e.name, i, n
                    )));
                }
            }
            for &(i, j, _) in &e.quadratic {
                if i >= n || j >= n {
                    return Err(OptimizerError::IndexOutOfRange(format!(
                        "expression {:?} references variables ({}, {}) of {}",
                        e.name, i, j, n
                    )));
                }
            }
            if let (Some(lower), Some(upper)) = (e.bounds.lower, e.bounds.upper) {
                if lower > upper {
                    return Err(OptimizerError::InvertedLimits(format!(
                        "expression {:?} has lower {} above upper {}",
                        e.name, lower, upper
                    )));
                }
            }
        }
        Ok(())
    }
}
