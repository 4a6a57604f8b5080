//! Positive-semidefinite repair of correlation matrices
//!
//! Correlation matrices estimated from noisy or incomplete market data are
//! often indefinite by a small margin, which breaks Cholesky-based solvers
//! and can give quadratic programs a negative curvature direction. This
//! module implements the repair used by market cleaning including:
//! - Decomposition of a covariance matrix into volatilities and correlations
//! - Eigenvalue clipping of a correlation matrix against a small positive
//!   floor, with rescaling back to a unit diagonal
//! - Recomposition of covariances from volatilities and correlations

use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Smallest eigenvalue allowed to survive correlation repair. Eigenvalues
/// below this are raised to it before recomposition.
pub const EIGENVALUE_FLOOR: f64 = 1e-6;

/// Splits a covariance matrix into per-asset volatilities and a correlation
/// matrix with a unit diagonal.
///
/// Volatilities are the square roots of the diagonal. Off-diagonal entries
/// are symmetrized by averaging the two mirrored covariances before
/// normalization. A zero variance propagates NaN into the affected row and
/// column, consistent with the in-band contract of the direct kernels.
pub fn correlations_and_volatilities(
    covariances: &DMatrix<f64>,
) -> (DMatrix<f64>, DVector<f64>) {
    let n = covariances.nrows();
    let volatilities = DVector::from_fn(n, |i, _| covariances[(i, i)].max(0.0).sqrt());

    let mut correlations = DMatrix::identity(n, n);
    for col in 0..n {
        for row in 0..col {
            let averaged = 0.5 * (covariances[(row, col)] + covariances[(col, row)]);
            let value = averaged / (volatilities[row] * volatilities[col]);
            correlations[(row, col)] = value;
            correlations[(col, row)] = value;
        }
    }

    (correlations, volatilities)
}

/// Rebuilds a covariance matrix from volatilities and correlations:
/// `cov[i][j] = vol[i] * corr[i][j] * vol[j]`.
pub fn covariances_from(
    correlations: &DMatrix<f64>,
    volatilities: &DVector<f64>,
) -> DMatrix<f64> {
    let n = volatilities.len();
    DMatrix::from_fn(n, n, |i, j| {
        volatilities[i] * correlations[(i, j)] * volatilities[j]
    })
}

/// Clips the eigenvalues of a correlation matrix to [`EIGENVALUE_FLOOR`]
/// and rescales the recomposed matrix back to a unit diagonal.
///
/// The result is symmetric positive definite with every diagonal entry
/// exactly 1.0. A matrix that is already comfortably positive definite
/// passes through with only round-off level changes.
pub fn repair_correlations(correlations: &DMatrix<f64>) -> DMatrix<f64> {
    let n = correlations.nrows();
    let eigen = SymmetricEigen::new(correlations.clone());

    let clipped = DVector::from_fn(n, |i, _| eigen.eigenvalues[i].max(EIGENVALUE_FLOOR));
    let recomposed =
        &eigen.eigenvectors * DMatrix::from_diagonal(&clipped) * eigen.eigenvectors.transpose();

    // Clipping inflates the diagonal away from 1; renormalize like a
    // covariance-to-correlation conversion.
    let mut repaired = DMatrix::identity(n, n);
    for col in 0..n {
        for row in 0..col {
            let scale = (recomposed[(row, row)] * recomposed[(col, col)]).sqrt();
            let value = recomposed[(row, col)] / scale;
            repaired[(row, col)] = value;
            repaired[(col, row)] = value;
        }
    }
    repaired
}
