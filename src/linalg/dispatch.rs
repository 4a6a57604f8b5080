//! Kernel selection for determinant, inverse and solve requests
//!
//! This module implements the dispatch layer that routes a request to the
//! cheapest applicable strategy including:
//! - Closed-form kernels for square systems up to dimension 5
//! - Cholesky for larger symmetric positive-definite systems
//! - LU for larger general square systems
//! - QR least squares for tall systems and SVD for fat ones
//!
//! Plan selection is a pure function of the shape and structure hints; it
//! never inspects matrix values. The decomposition paths check conditioning
//! and return errors, while the closed-form paths keep the in-band NaN
//! contract of the kernels they wrap.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::determinant::{
    determinant_1x1, determinant_2x2, determinant_3x3, determinant_4x4, determinant_5x5,
    symmetric_determinant_2x2, symmetric_determinant_3x3, symmetric_determinant_4x4,
    symmetric_determinant_5x5,
};
use super::inverse::{
    invert_1x1_into, invert_2x2_into, invert_3x3_into, invert_4x4_into, invert_5x5_into,
    symmetric_invert_2x2_into, symmetric_invert_3x3_into, symmetric_invert_4x4_into,
    symmetric_invert_5x5_into,
};
use super::solve::{
    solve_1x1, solve_2x2, solve_3x3, solve_4x4, solve_5x5, symmetric_solve_2x2,
    symmetric_solve_3x3, symmetric_solve_4x4, symmetric_solve_5x5,
};
use super::{LinalgError, MAX_CLOSED_FORM_DIM, SVD_EPSILON};

/// Structural properties the caller asserts about a matrix.
///
/// The dispatch layer trusts these hints; it never verifies them. A
/// positive-definite hint implies symmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructureHints {
    pub symmetric: bool,
    pub positive_definite: bool,
}

impl StructureHints {
    /// No structure assumed.
    pub fn general() -> Self {
        Self::default()
    }

    /// Symmetric but not necessarily positive definite.
    pub fn symmetric() -> Self {
        Self {
            symmetric: true,
            positive_definite: false,
        }
    }

    /// Symmetric positive definite, e.g. a full-rank covariance matrix.
    pub fn symmetric_positive_definite() -> Self {
        Self {
            symmetric: true,
            positive_definite: true,
        }
    }

    fn is_symmetric(&self) -> bool {
        self.symmetric || self.positive_definite
    }

    fn is_positive_definite(&self) -> bool {
        self.positive_definite
    }
}

fn require_square(rows: usize, cols: usize, what: &str) -> Result<(), LinalgError> {
    if rows == 0 || cols == 0 {
        return Err(LinalgError::DimensionMismatch(format!(
            "{} requires a non-empty matrix, got {}x{}",
            what, rows, cols
        )));
    }
    if rows != cols {
        return Err(LinalgError::DimensionMismatch(format!(
            "{} requires a square matrix, got {}x{}",
            what, rows, cols
        )));
    }
    Ok(())
}

fn require_shape(
    matrix: &DMatrix<f64>,
    rows: usize,
    cols: usize,
    what: &str,
) -> Result<(), LinalgError> {
    if matrix.nrows() != rows || matrix.ncols() != cols {
        return Err(LinalgError::DimensionMismatch(format!(
            "{} planned for a {}x{} matrix, got {}x{}",
            what,
            rows,
            cols,
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    Ok(())
}

/// Strategy for computing a determinant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeterminantPlan {
    /// Cofactor expansion, dimension 1 through 5.
    ClosedForm { dim: usize },
    /// Upper-triangle cofactor expansion, dimension 2 through 5.
    ClosedFormSymmetric { dim: usize },
    /// Product of Cholesky diagonal entries, squared.
    Cholesky { dim: usize },
    /// LU with partial pivoting.
    Lu { dim: usize },
}

impl DeterminantPlan {
    /// Selects the determinant strategy for the given shape and hints.
    pub fn select(rows: usize, cols: usize, hints: StructureHints) -> Result<Self, LinalgError> {
        require_square(rows, cols, "determinant")?;
        let plan = if rows <= MAX_CLOSED_FORM_DIM {
            // A 1x1 matrix has no off-diagonal structure to exploit.
            if hints.is_symmetric() && rows >= 2 {
                Self::ClosedFormSymmetric { dim: rows }
            } else {
                Self::ClosedForm { dim: rows }
            }
        } else if hints.is_positive_definite() {
            Self::Cholesky { dim: rows }
        } else {
            Self::Lu { dim: rows }
        };
        debug!(?plan, "determinant plan selected");
        Ok(plan)
    }

    /// Runs the planned strategy on `matrix`.
    pub fn evaluate(&self, matrix: &DMatrix<f64>) -> Result<f64, LinalgError> {
        match *self {
            Self::ClosedForm { dim } => {
                require_shape(matrix, dim, dim, "determinant")?;
                Ok(match dim {
                    1 => determinant_1x1(matrix),
                    2 => determinant_2x2(matrix),
                    3 => determinant_3x3(matrix),
                    4 => determinant_4x4(matrix),
                    _ => determinant_5x5(matrix),
                })
            }
            Self::ClosedFormSymmetric { dim } => {
                require_shape(matrix, dim, dim, "determinant")?;
                Ok(match dim {
                    2 => symmetric_determinant_2x2(matrix),
                    3 => symmetric_determinant_3x3(matrix),
                    4 => symmetric_determinant_4x4(matrix),
                    _ => symmetric_determinant_5x5(matrix),
                })
            }
            Self::Cholesky { dim } => {
                require_shape(matrix, dim, dim, "determinant")?;
                let chol = nalgebra::Cholesky::new(matrix.clone()).ok_or_else(|| {
                    LinalgError::NotPositiveDefinite(format!(
                        "Cholesky factorization failed for {}x{} matrix",
                        dim, dim
                    ))
                })?;
                let l = chol.l();
                let mut diag_product = 1.0;
                for i in 0..dim {
                    diag_product *= l[(i, i)];
                }
                Ok(diag_product * diag_product)
            }
            Self::Lu { dim } => {
                require_shape(matrix, dim, dim, "determinant")?;
                Ok(matrix.clone().lu().determinant())
            }
        }
    }
}

/// Strategy for inverting (or pseudo-inverting) a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InversePlan {
    /// Adjugate kernels, dimension 1 through 5.
    ClosedForm { dim: usize },
    /// Upper-triangle adjugate kernels, dimension 2 through 5.
    ClosedFormSymmetric { dim: usize },
    /// Cholesky-based inverse for symmetric positive-definite systems.
    Cholesky { dim: usize },
    /// LU-based inverse for general square systems.
    Lu { dim: usize },
    /// Left pseudo-inverse of a tall matrix via QR.
    TallQr { rows: usize, cols: usize },
    /// Pseudo-inverse of a fat matrix via SVD.
    FatSvd { rows: usize, cols: usize },
}

impl InversePlan {
    /// Selects the inversion strategy for the given shape and hints.
    pub fn select(rows: usize, cols: usize, hints: StructureHints) -> Result<Self, LinalgError> {
        if rows == 0 || cols == 0 {
            return Err(LinalgError::DimensionMismatch(format!(
                "inverse requires a non-empty matrix, got {}x{}",
                rows, cols
            )));
        }
        let plan = if rows == cols {
            if rows <= MAX_CLOSED_FORM_DIM {
                if hints.is_symmetric() && rows >= 2 {
                    Self::ClosedFormSymmetric { dim: rows }
                } else {
                    Self::ClosedForm { dim: rows }
                }
            } else if hints.is_positive_definite() {
                Self::Cholesky { dim: rows }
            } else {
                Self::Lu { dim: rows }
            }
        } else if rows > cols {
            Self::TallQr { rows, cols }
        } else {
            Self::FatSvd { rows, cols }
        };
        debug!(?plan, "inverse plan selected");
        Ok(plan)
    }

    /// Runs the planned strategy, returning a freshly allocated result.
    pub fn evaluate(&self, matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, LinalgError> {
        match *self {
            Self::ClosedForm { dim } => {
                require_shape(matrix, dim, dim, "inverse")?;
                let mut out = DMatrix::zeros(dim, dim);
                match dim {
                    1 => invert_1x1_into(matrix, &mut out),
                    2 => invert_2x2_into(matrix, &mut out),
                    3 => invert_3x3_into(matrix, &mut out),
                    4 => invert_4x4_into(matrix, &mut out),
                    _ => invert_5x5_into(matrix, &mut out),
                }
                Ok(out)
            }
            Self::ClosedFormSymmetric { dim } => {
                require_shape(matrix, dim, dim, "inverse")?;
                let mut out = DMatrix::zeros(dim, dim);
                match dim {
                    2 => symmetric_invert_2x2_into(matrix, &mut out),
                    3 => symmetric_invert_3x3_into(matrix, &mut out),
                    4 => symmetric_invert_4x4_into(matrix, &mut out),
                    _ => symmetric_invert_5x5_into(matrix, &mut out),
                }
                Ok(out)
            }
            Self::Cholesky { dim } => {
                require_shape(matrix, dim, dim, "inverse")?;
                let chol = nalgebra::Cholesky::new(matrix.clone()).ok_or_else(|| {
                    LinalgError::NotPositiveDefinite(format!(
                        "Cholesky factorization failed for {}x{} matrix",
                        dim, dim
                    ))
                })?;
                Ok(chol.inverse())
            }
            Self::Lu { dim } => {
                require_shape(matrix, dim, dim, "inverse")?;
                matrix.clone().lu().try_inverse().ok_or_else(|| {
                    LinalgError::SingularMatrix(format!("LU inverse failed for {}x{} matrix", dim, dim))
                })
            }
            Self::TallQr { rows, cols } => {
                require_shape(matrix, rows, cols, "pseudo-inverse")?;
                let qr = matrix.clone().qr();
                let qt = qr.q().transpose();
                qr.r().solve_upper_triangular(&qt).ok_or_else(|| {
                    LinalgError::SingularMatrix(format!(
                        "QR pseudo-inverse failed, {}x{} matrix is rank deficient",
                        rows, cols
                    ))
                })
            }
            Self::FatSvd { rows, cols } => {
                require_shape(matrix, rows, cols, "pseudo-inverse")?;
                matrix
                    .clone()
                    .svd(true, true)
                    .pseudo_inverse(SVD_EPSILON)
                    .map_err(|e| LinalgError::NotSolvable(e.to_string()))
            }
        }
    }
}

/// Strategy for solving a linear system with one right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePlan {
    /// Cramer kernels, dimension 1 through 5.
    ClosedForm { dim: usize },
    /// Upper-triangle Cramer kernels, dimension 2 through 5.
    ClosedFormSymmetric { dim: usize },
    /// Cholesky solve for symmetric positive-definite systems.
    Cholesky { dim: usize },
    /// LU solve for general square systems.
    Lu { dim: usize },
    /// Least-squares solve of a tall system via QR.
    TallQr { rows: usize, cols: usize },
    /// Minimum-norm solve of a fat system via SVD.
    FatSvd { rows: usize, cols: usize },
}

impl SolvePlan {
    /// Selects the solve strategy for the given shape and hints.
    pub fn select(rows: usize, cols: usize, hints: StructureHints) -> Result<Self, LinalgError> {
        if rows == 0 || cols == 0 {
            return Err(LinalgError::DimensionMismatch(format!(
                "solve requires a non-empty matrix, got {}x{}",
                rows, cols
            )));
        }
        let plan = if rows == cols {
            if rows <= MAX_CLOSED_FORM_DIM {
                if hints.is_symmetric() && rows >= 2 {
                    Self::ClosedFormSymmetric { dim: rows }
                } else {
                    Self::ClosedForm { dim: rows }
                }
            } else if hints.is_positive_definite() {
                Self::Cholesky { dim: rows }
            } else {
                Self::Lu { dim: rows }
            }
        } else if rows > cols {
            Self::TallQr { rows, cols }
        } else {
            Self::FatSvd { rows, cols }
        };
        debug!(?plan, "solve plan selected");
        Ok(plan)
    }

    /// Runs the planned strategy on `matrix` and `rhs`.
    pub fn evaluate(
        &self,
        matrix: &DMatrix<f64>,
        rhs: &DVector<f64>,
    ) -> Result<DVector<f64>, LinalgError> {
        let (rows, cols) = match *self {
            Self::ClosedForm { dim } | Self::ClosedFormSymmetric { dim } => (dim, dim),
            Self::Cholesky { dim } | Self::Lu { dim } => (dim, dim),
            Self::TallQr { rows, cols } | Self::FatSvd { rows, cols } => (rows, cols),
        };
        require_shape(matrix, rows, cols, "solve")?;
        if rhs.len() != rows {
            return Err(LinalgError::DimensionMismatch(format!(
                "right-hand side has {} entries, matrix has {} rows",
                rhs.len(),
                rows
            )));
        }

        match *self {
            Self::ClosedForm { dim } => Ok(match dim {
                1 => solve_1x1(matrix, rhs),
                2 => solve_2x2(matrix, rhs),
                3 => solve_3x3(matrix, rhs),
                4 => solve_4x4(matrix, rhs),
                _ => solve_5x5(matrix, rhs),
            }),
            Self::ClosedFormSymmetric { dim } => Ok(match dim {
                2 => symmetric_solve_2x2(matrix, rhs),
                3 => symmetric_solve_3x3(matrix, rhs),
                4 => symmetric_solve_4x4(matrix, rhs),
                _ => symmetric_solve_5x5(matrix, rhs),
            }),
            Self::Cholesky { dim } => {
                let chol = nalgebra::Cholesky::new(matrix.clone()).ok_or_else(|| {
                    LinalgError::NotPositiveDefinite(format!(
                        "Cholesky factorization failed for {}x{} matrix",
                        dim, dim
                    ))
                })?;
                Ok(chol.solve(rhs))
            }
            Self::Lu { dim } => matrix.clone().lu().solve(rhs).ok_or_else(|| {
                LinalgError::SingularMatrix(format!("LU solve failed for {}x{} matrix", dim, dim))
            }),
            Self::TallQr { .. } => {
                let qr = matrix.clone().qr();
                let projected = qr.q().transpose() * rhs;
                qr.r().solve_upper_triangular(&projected).ok_or_else(|| {
                    LinalgError::SingularMatrix(
                        "QR least squares failed, matrix is rank deficient".to_string(),
                    )
                })
            }
            Self::FatSvd { .. } => matrix
                .clone()
                .svd(true, true)
                .solve(rhs, SVD_EPSILON)
                .map_err(|e| LinalgError::NotSolvable(e.to_string())),
        }
    }
}

/// Computes a determinant, dispatching on shape and hints.
pub fn determinant(matrix: &DMatrix<f64>, hints: StructureHints) -> Result<f64, LinalgError> {
    DeterminantPlan::select(matrix.nrows(), matrix.ncols(), hints)?.evaluate(matrix)
}

/// Computes an inverse or pseudo-inverse, dispatching on shape and hints.
pub fn invert(matrix: &DMatrix<f64>, hints: StructureHints) -> Result<DMatrix<f64>, LinalgError> {
    InversePlan::select(matrix.nrows(), matrix.ncols(), hints)?.evaluate(matrix)
}

/// Solves a linear system, dispatching on shape and hints. Tall systems are
/// solved in the least-squares sense, fat ones minimum-norm.
pub fn solve(
    matrix: &DMatrix<f64>,
    rhs: &DVector<f64>,
    hints: StructureHints,
) -> Result<DVector<f64>, LinalgError> {
    SolvePlan::select(matrix.nrows(), matrix.ncols(), hints)?.evaluate(matrix, rhs)
}
