//! Closed-form linear solve kernels
//!
//! This module implements Cramer-style solvers for 1x1 through 5x5 systems
//! with a single right-hand side including:
//! - General kernels substituting the right-hand side into each column
//! - Symmetric kernels reading only the upper triangle of the matrix
//! - Frobenius pre-scaling of both matrix and right-hand side for
//!   dimensions 3 and up
//!
//! No inverse is formed: each solution component is a ratio of two
//! determinants evaluated by the shared expansion helpers. Scaling the
//! matrix and the right-hand side by the same factor leaves the solution
//! unchanged, so no post-correction is needed. Singular systems produce
//! NaN or infinite components, never an error.

use nalgebra::{DMatrix, DVector};

use super::determinant::{det2, det3, det4, det5, scale_norm, upper_triangle_norm};

/// Solves a 1x1 system.
pub fn solve_1x1(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    DVector::from_vec(vec![rhs[0] / matrix[(0, 0)]])
}

/// Solves a 2x2 system by direct Cramer ratios.
pub fn solve_2x2(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let m00 = matrix[(0, 0)];
    let m01 = matrix[(0, 1)];
    let m10 = matrix[(1, 0)];
    let m11 = matrix[(1, 1)];
    let b0 = rhs[0];
    let b1 = rhs[1];

    let det = det2(m00, m01, m10, m11);

    DVector::from_vec(vec![
        det2(b0, m01, b1, m11) / det,
        det2(m00, b0, m10, b1) / det,
    ])
}

/// Solves a 3x3 system with pre-scaling applied to matrix and right-hand side.
pub fn solve_3x3(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let scale = scale_norm(matrix);
    let t00 = matrix[(0, 0)] / scale;
    let t01 = matrix[(0, 1)] / scale;
    let t02 = matrix[(0, 2)] / scale;
    let t10 = matrix[(1, 0)] / scale;
    let t11 = matrix[(1, 1)] / scale;
    let t12 = matrix[(1, 2)] / scale;
    let t20 = matrix[(2, 0)] / scale;
    let t21 = matrix[(2, 1)] / scale;
    let t22 = matrix[(2, 2)] / scale;
    let s0 = rhs[0] / scale;
    let s1 = rhs[1] / scale;
    let s2 = rhs[2] / scale;

    let det = det3(t00, t01, t02, t10, t11, t12, t20, t21, t22);

    DVector::from_vec(vec![
        det3(s0, t01, t02, s1, t11, t12, s2, t21, t22) / det,
        det3(t00, s0, t02, t10, s1, t12, t20, s2, t22) / det,
        det3(t00, t01, s0, t10, t11, s1, t20, t21, s2) / det,
    ])
}

/// Solves a 4x4 system with pre-scaling applied to matrix and right-hand side.
pub fn solve_4x4(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let scale = scale_norm(matrix);
    let t00 = matrix[(0, 0)] / scale;
    let t01 = matrix[(0, 1)] / scale;
    let t02 = matrix[(0, 2)] / scale;
    let t03 = matrix[(0, 3)] / scale;
    let t10 = matrix[(1, 0)] / scale;
    let t11 = matrix[(1, 1)] / scale;
    let t12 = matrix[(1, 2)] / scale;
    let t13 = matrix[(1, 3)] / scale;
    let t20 = matrix[(2, 0)] / scale;
    let t21 = matrix[(2, 1)] / scale;
    let t22 = matrix[(2, 2)] / scale;
    let t23 = matrix[(2, 3)] / scale;
    let t30 = matrix[(3, 0)] / scale;
    let t31 = matrix[(3, 1)] / scale;
    let t32 = matrix[(3, 2)] / scale;
    let t33 = matrix[(3, 3)] / scale;
    let s0 = rhs[0] / scale;
    let s1 = rhs[1] / scale;
    let s2 = rhs[2] / scale;
    let s3 = rhs[3] / scale;

    let det = det4(
        t00, t01, t02, t03, t10, t11, t12, t13, t20, t21, t22, t23, t30, t31, t32, t33,
    );

    DVector::from_vec(vec![
        det4(
            s0, t01, t02, t03, s1, t11, t12, t13, s2, t21, t22, t23, s3, t31, t32, t33,
        ) / det,
        det4(
            t00, s0, t02, t03, t10, s1, t12, t13, t20, s2, t22, t23, t30, s3, t32, t33,
        ) / det,
        det4(
            t00, t01, s0, t03, t10, t11, s1, t13, t20, t21, s2, t23, t30, t31, s3, t33,
        ) / det,
        det4(
            t00, t01, t02, s0, t10, t11, t12, s1, t20, t21, t22, s2, t30, t31, t32, s3,
        ) / det,
    ])
}

/// Solves a 5x5 system with pre-scaling applied to matrix and right-hand side.
pub fn solve_5x5(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let scale = scale_norm(matrix);
    let t00 = matrix[(0, 0)] / scale;
    let t01 = matrix[(0, 1)] / scale;
    let t02 = matrix[(0, 2)] / scale;
    let t03 = matrix[(0, 3)] / scale;
    let t04 = matrix[(0, 4)] / scale;
    let t10 = matrix[(1, 0)] / scale;
    let t11 = matrix[(1, 1)] / scale;
    let t12 = matrix[(1, 2)] / scale;
    let t13 = matrix[(1, 3)] / scale;
    let t14 = matrix[(1, 4)] / scale;
    let t20 = matrix[(2, 0)] / scale;
    let t21 = matrix[(2, 1)] / scale;
    let t22 = matrix[(2, 2)] / scale;
    let t23 = matrix[(2, 3)] / scale;
    let t24 = matrix[(2, 4)] / scale;
    let t30 = matrix[(3, 0)] / scale;
    let t31 = matrix[(3, 1)] / scale;
    let t32 = matrix[(3, 2)] / scale;
    let t33 = matrix[(3, 3)] / scale;
    let t34 = matrix[(3, 4)] / scale;
    let t40 = matrix[(4, 0)] / scale;
    let t41 = matrix[(4, 1)] / scale;
    let t42 = matrix[(4, 2)] / scale;
    let t43 = matrix[(4, 3)] / scale;
    let t44 = matrix[(4, 4)] / scale;
    let s0 = rhs[0] / scale;
    let s1 = rhs[1] / scale;
    let s2 = rhs[2] / scale;
    let s3 = rhs[3] / scale;
    let s4 = rhs[4] / scale;

    let det = det5(
        t00, t01, t02, t03, t04, t10, t11, t12, t13, t14, t20, t21, t22, t23, t24, t30, t31, t32,
        t33, t34, t40, t41, t42, t43, t44,
    );

    DVector::from_vec(vec![
        det5(
            s0, t01, t02, t03, t04, s1, t11, t12, t13, t14, s2, t21, t22, t23, t24, s3, t31, t32,
            t33, t34, s4, t41, t42, t43, t44,
        ) / det,
        det5(
            t00, s0, t02, t03, t04, t10, s1, t12, t13, t14, t20, s2, t22, t23, t24, t30, s3, t32,
            t33, t34, t40, s4, t42, t43, t44,
        ) / det,
        det5(
            t00, t01, s0, t03, t04, t10, t11, s1, t13, t14, t20, t21, s2, t23, t24, t30, t31, s3,
            t33, t34, t40, t41, s4, t43, t44,
        ) / det,
        det5(
            t00, t01, t02, s0, t04, t10, t11, t12, s1, t14, t20, t21, t22, s2, t24, t30, t31, t32,
            s3, t34, t40, t41, t42, s4, t44,
        ) / det,
        det5(
            t00, t01, t02, t03, s0, t10, t11, t12, t13, s1, t20, t21, t22, t23, s2, t30, t31, t32,
            t33, s3, t40, t41, t42, t43, s4,
        ) / det,
    ])
}

/// Solves a symmetric 2x2 system reading only the upper triangle.
pub fn symmetric_solve_2x2(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let d0 = matrix[(0, 0)];
    let u01 = matrix[(0, 1)];
    let d1 = matrix[(1, 1)];
    let b0 = rhs[0];
    let b1 = rhs[1];

    let det = d0 * d1 - u01 * u01;

    DVector::from_vec(vec![(b0 * d1 - b1 * u01) / det, (d0 * b1 - u01 * b0) / det])
}

/// Solves a symmetric 3x3 system reading only the upper triangle.
pub fn symmetric_solve_3x3(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let scale = upper_triangle_norm(matrix, 3);
    let t00 = matrix[(0, 0)] / scale;
    let t01 = matrix[(0, 1)] / scale;
    let t02 = matrix[(0, 2)] / scale;
    let t11 = matrix[(1, 1)] / scale;
    let t12 = matrix[(1, 2)] / scale;
    let t22 = matrix[(2, 2)] / scale;
    let s0 = rhs[0] / scale;
    let s1 = rhs[1] / scale;
    let s2 = rhs[2] / scale;

    let det = det3(t00, t01, t02, t01, t11, t12, t02, t12, t22);

    DVector::from_vec(vec![
        det3(s0, t01, t02, s1, t11, t12, s2, t12, t22) / det,
        det3(t00, s0, t02, t01, s1, t12, t02, s2, t22) / det,
        det3(t00, t01, s0, t01, t11, s1, t02, t12, s2) / det,
    ])
}

/// Solves a symmetric 4x4 system reading only the upper triangle.
pub fn symmetric_solve_4x4(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let scale = upper_triangle_norm(matrix, 4);
    let t00 = matrix[(0, 0)] / scale;
    let t01 = matrix[(0, 1)] / scale;
    let t02 = matrix[(0, 2)] / scale;
    let t03 = matrix[(0, 3)] / scale;
    let t11 = matrix[(1, 1)] / scale;
    let t12 = matrix[(1, 2)] / scale;
    let t13 = matrix[(1, 3)] / scale;
    let t22 = matrix[(2, 2)] / scale;
    let t23 = matrix[(2, 3)] / scale;
    let t33 = matrix[(3, 3)] / scale;
    let s0 = rhs[0] / scale;
    let s1 = rhs[1] / scale;
    let s2 = rhs[2] / scale;
    let s3 = rhs[3] / scale;

    let det = det4(
        t00, t01, t02, t03, t01, t11, t12, t13, t02, t12, t22, t23, t03, t13, t23, t33,
    );

    DVector::from_vec(vec![
        det4(
            s0, t01, t02, t03, s1, t11, t12, t13, s2, t12, t22, t23, s3, t13, t23, t33,
        ) / det,
        det4(
            t00, s0, t02, t03, t01, s1, t12, t13, t02, s2, t22, t23, t03, s3, t23, t33,
        ) / det,
        det4(
            t00, t01, s0, t03, t01, t11, s1, t13, t02, t12, s2, t23, t03, t13, s3, t33,
        ) / det,
        det4(
            t00, t01, t02, s0, t01, t11, t12, s1, t02, t12, t22, s2, t03, t13, t23, s3,
        ) / det,
    ])
}

/// Solves a symmetric 5x5 system reading only the upper triangle.
pub fn symmetric_solve_5x5(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    let scale = upper_triangle_norm(matrix, 5);
    let t00 = matrix[(0, 0)] / scale;
    let t01 = matrix[(0, 1)] / scale;
    let t02 = matrix[(0, 2)] / scale;
    let t03 = matrix[(0, 3)] / scale;
    let t04 = matrix[(0, 4)] / scale;
    let t11 = matrix[(1, 1)] / scale;
    let t12 = matrix[(1, 2)] / scale;
    let t13 = matrix[(1, 3)] / scale;
    let t14 = matrix[(1, 4)] / scale;
    let t22 = matrix[(2, 2)] / scale;
    let t23 = matrix[(2, 3)] / scale;
    let t24 = matrix[(2, 4)] / scale;
    let t33 = matrix[(3, 3)] / scale;
    let t34 = matrix[(3, 4)] / scale;
    let t44 = matrix[(4, 4)] / scale;
    let s0 = rhs[0] / scale;
    let s1 = rhs[1] / scale;
    let s2 = rhs[2] / scale;
    let s3 = rhs[3] / scale;
    let s4 = rhs[4] / scale;

    let det = det5(
        t00, t01, t02, t03, t04, t01, t11, t12, t13, t14, t02, t12, t22, t23, t24, t03, t13, t23,
        t33, t34, t04, t14, t24, t34, t44,
    );

    DVector::from_vec(vec![
        det5(
            s0, t01, t02, t03, t04, s1, t11, t12, t13, t14, s2, t12, t22, t23, t24, s3, t13, t23,
            t33, t34, s4, t14, t24, t34, t44,
        ) / det,
        det5(
            t00, s0, t02, t03, t04, t01, s1, t12, t13, t14, t02, s2, t22, t23, t24, t03, s3, t23,
            t33, t34, t04, s4, t24, t34, t44,
        ) / det,
        det5(
            t00, t01, s0, t03, t04, t01, t11, s1, t13, t14, t02, t12, s2, t23, t24, t03, t13, s3,
            t33, t34, t04, t14, s4, t34, t44,
        ) / det,
        det5(
            t00, t01, t02, s0, t04, t01, t11, t12, s1, t14, t02, t12, t22, s2, t24, t03, t13, t23,
            s3, t34, t04, t14, t24, s4, t44,
        ) / det,
        det5(
            t00, t01, t02, t03, s0, t01, t11, t12, t13, s1, t02, t12, t22, t23, s2, t03, t13, t23,
            t33, s3, t04, t14, t24, t34, s4,
        ) / det,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn test_matrix(dim: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(dim, dim, |_, _| rng.gen_range(-1.0..1.0))
    }

    fn test_rhs(dim: usize, seed: u64) -> DVector<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DVector::from_fn(dim, |_, _| rng.gen_range(-1.0..1.0))
    }

    fn diagonally_dominant(dim: usize, seed: u64) -> DMatrix<f64> {
        let mut m = test_matrix(dim, seed);
        for i in 0..dim {
            m[(i, i)] += dim as f64;
        }
        m
    }

    fn symmetric_posdef(dim: usize, seed: u64) -> DMatrix<f64> {
        let a = test_matrix(dim, seed);
        let mut m = &a * a.transpose();
        for i in 0..dim {
            m[(i, i)] += 1.0;
        }
        m
    }

    fn solve(dim: usize, m: &DMatrix<f64>, b: &DVector<f64>) -> DVector<f64> {
        match dim {
            1 => solve_1x1(m, b),
            2 => solve_2x2(m, b),
            3 => solve_3x3(m, b),
            4 => solve_4x4(m, b),
            5 => solve_5x5(m, b),
            _ => unreachable!(),
        }
    }

    fn symmetric_solve(dim: usize, m: &DMatrix<f64>, b: &DVector<f64>) -> DVector<f64> {
        match dim {
            2 => symmetric_solve_2x2(m, b),
            3 => symmetric_solve_3x3(m, b),
            4 => symmetric_solve_4x4(m, b),
            5 => symmetric_solve_5x5(m, b),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_solve_matches_lu_for_all_dimensions() {
        for dim in 1..=5 {
            let m = diagonally_dominant(dim, 11 + dim as u64);
            let b = test_rhs(dim, 900 + dim as u64);
            let x = solve(dim, &m, &b);
            let reference = m.clone().lu().solve(&b).unwrap();
            let err = (&x - &reference).abs().max();
            assert!(err < 1e-12, "dim {}: divergence {}", dim, err);
        }
    }

    #[test]
    fn test_solve_residual_is_small() {
        for dim in 1..=5 {
            let m = diagonally_dominant(dim, 21 + dim as u64);
            let b = test_rhs(dim, 910 + dim as u64);
            let x = solve(dim, &m, &b);
            let residual = (&m * &x - &b).abs().max();
            assert!(residual < 1e-12, "dim {}: residual {}", dim, residual);
        }
    }

    #[test]
    fn test_symmetric_solve_ignores_lower_triangle() {
        for dim in 2..=5 {
            let m = symmetric_posdef(dim, 31 + dim as u64);
            let b = test_rhs(dim, 920 + dim as u64);
            let mut garbage = m.clone();
            for col in 0..dim {
                for row in (col + 1)..dim {
                    garbage[(row, col)] = f64::NAN;
                }
            }
            let x = symmetric_solve(dim, &garbage, &b);
            let residual = (&m * &x - &b).abs().max();
            assert!(residual < 1e-10, "dim {}: residual {}", dim, residual);
        }
    }

    #[test]
    fn test_singular_system_reports_in_band() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 0.0]);
        let x = solve_2x2(&m, &b);
        assert!(x.iter().any(|v| v.is_nan() || v.is_infinite()));
    }

    #[test]
    fn test_extreme_magnitude_solve() {
        // Large enough that a naive sum of squares overflows while the
        // solution itself stays representable.
        let m = 1e155 * diagonally_dominant(5, 55);
        let b = test_rhs(5, 930);
        let x = solve_5x5(&m, &b);
        assert!(x.iter().all(|v| v.is_finite()), "solution {:?}", x);
        let residual = ((&m * &x - &b).abs().max()) / b.abs().max();
        assert!(residual < 1e-10, "residual {}", residual);
    }
}
