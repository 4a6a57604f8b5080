//! Closed-form inverse kernels
//!
//! This module implements adjugate-based inversion for 1x1 through 5x5
//! matrices including:
//! - General kernels computing the full cofactor matrix
//! - Symmetric kernels computing upper-triangle cofactors only and writing
//!   the mirrored result
//! - Frobenius pre-scaling for dimensions 3 and up
//!
//! Each kernel writes element-by-element into a caller-preallocated output
//! so hot loops can reuse buffers. Entry (row, col) of the inverse receives
//! cofactor (col, row) divided by the determinant; the determinant itself is
//! recovered from the scaled cofactors of the first column, so every minor
//! is computed exactly once. Singular input yields NaN or infinite entries,
//! never an error.

use nalgebra::DMatrix;

use super::determinant::{det2, det3, det4, scale_norm, upper_triangle_norm};

/// Inverse of a 1x1 matrix.
pub fn invert_1x1_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
    inverse[(0, 0)] = 1.0 / matrix[(0, 0)];
}

/// Inverse of a 2x2 matrix. No pre-scaling, matching the determinant kernel.
pub fn invert_2x2_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
    let m00 = matrix[(0, 0)];
    let m01 = matrix[(0, 1)];
    let m10 = matrix[(1, 0)];
    let m11 = matrix[(1, 1)];

    let det = det2(m00, m01, m10, m11);

    inverse[(0, 0)] = m11 / det;
    inverse[(1, 0)] = -m10 / det;
    inverse[(0, 1)] = -m01 / det;
    inverse[(1, 1)] = m00 / det;
}

/// Inverse of a 3x3 matrix with Frobenius pre-scaling.
pub fn invert_3x3_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
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

    let c00 = det2(t11, t12, t21, t22);
    let c01 = -det2(t10, t12, t20, t22);
    let c02 = det2(t10, t11, t20, t21);
    let c10 = -det2(t01, t02, t21, t22);
    let c11 = det2(t00, t02, t20, t22);
    let c12 = -det2(t00, t01, t20, t21);
    let c20 = det2(t01, t02, t11, t12);
    let c21 = -det2(t00, t02, t10, t12);
    let c22 = det2(t00, t01, t10, t11);

    let det = scale * (t00 * c00 + t10 * c10 + t20 * c20);

    inverse[(0, 0)] = c00 / det;
    inverse[(1, 0)] = c01 / det;
    inverse[(2, 0)] = c02 / det;
    inverse[(0, 1)] = c10 / det;
    inverse[(1, 1)] = c11 / det;
    inverse[(2, 1)] = c12 / det;
    inverse[(0, 2)] = c20 / det;
    inverse[(1, 2)] = c21 / det;
    inverse[(2, 2)] = c22 / det;
}

/// Inverse of a 4x4 matrix with Frobenius pre-scaling.
pub fn invert_4x4_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
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

    let c00 = det3(t11, t12, t13, t21, t22, t23, t31, t32, t33);
    let c01 = -det3(t10, t12, t13, t20, t22, t23, t30, t32, t33);
    let c02 = det3(t10, t11, t13, t20, t21, t23, t30, t31, t33);
    let c03 = -det3(t10, t11, t12, t20, t21, t22, t30, t31, t32);
    let c10 = -det3(t01, t02, t03, t21, t22, t23, t31, t32, t33);
    let c11 = det3(t00, t02, t03, t20, t22, t23, t30, t32, t33);
    let c12 = -det3(t00, t01, t03, t20, t21, t23, t30, t31, t33);
    let c13 = det3(t00, t01, t02, t20, t21, t22, t30, t31, t32);
    let c20 = det3(t01, t02, t03, t11, t12, t13, t31, t32, t33);
    let c21 = -det3(t00, t02, t03, t10, t12, t13, t30, t32, t33);
    let c22 = det3(t00, t01, t03, t10, t11, t13, t30, t31, t33);
    let c23 = -det3(t00, t01, t02, t10, t11, t12, t30, t31, t32);
    let c30 = -det3(t01, t02, t03, t11, t12, t13, t21, t22, t23);
    let c31 = det3(t00, t02, t03, t10, t12, t13, t20, t22, t23);
    let c32 = -det3(t00, t01, t03, t10, t11, t13, t20, t21, t23);
    let c33 = det3(t00, t01, t02, t10, t11, t12, t20, t21, t22);

    let det = scale * (t00 * c00 + t10 * c10 + t20 * c20 + t30 * c30);

    inverse[(0, 0)] = c00 / det;
    inverse[(1, 0)] = c01 / det;
    inverse[(2, 0)] = c02 / det;
    inverse[(3, 0)] = c03 / det;
    inverse[(0, 1)] = c10 / det;
    inverse[(1, 1)] = c11 / det;
    inverse[(2, 1)] = c12 / det;
    inverse[(3, 1)] = c13 / det;
    inverse[(0, 2)] = c20 / det;
    inverse[(1, 2)] = c21 / det;
    inverse[(2, 2)] = c22 / det;
    inverse[(3, 2)] = c23 / det;
    inverse[(0, 3)] = c30 / det;
    inverse[(1, 3)] = c31 / det;
    inverse[(2, 3)] = c32 / det;
    inverse[(3, 3)] = c33 / det;
}

/// Inverse of a 5x5 matrix with Frobenius pre-scaling.
pub fn invert_5x5_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
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

    let c00 = det4(
        t11, t12, t13, t14, t21, t22, t23, t24, t31, t32, t33, t34, t41, t42, t43, t44,
    );
    let c01 = -det4(
        t10, t12, t13, t14, t20, t22, t23, t24, t30, t32, t33, t34, t40, t42, t43, t44,
    );
    let c02 = det4(
        t10, t11, t13, t14, t20, t21, t23, t24, t30, t31, t33, t34, t40, t41, t43, t44,
    );
    let c03 = -det4(
        t10, t11, t12, t14, t20, t21, t22, t24, t30, t31, t32, t34, t40, t41, t42, t44,
    );
    let c04 = det4(
        t10, t11, t12, t13, t20, t21, t22, t23, t30, t31, t32, t33, t40, t41, t42, t43,
    );
    let c10 = -det4(
        t01, t02, t03, t04, t21, t22, t23, t24, t31, t32, t33, t34, t41, t42, t43, t44,
    );
    let c11 = det4(
        t00, t02, t03, t04, t20, t22, t23, t24, t30, t32, t33, t34, t40, t42, t43, t44,
    );
    let c12 = -det4(
        t00, t01, t03, t04, t20, t21, t23, t24, t30, t31, t33, t34, t40, t41, t43, t44,
    );
    let c13 = det4(
        t00, t01, t02, t04, t20, t21, t22, t24, t30, t31, t32, t34, t40, t41, t42, t44,
    );
    let c14 = -det4(
        t00, t01, t02, t03, t20, t21, t22, t23, t30, t31, t32, t33, t40, t41, t42, t43,
    );
    let c20 = det4(
        t01, t02, t03, t04, t11, t12, t13, t14, t31, t32, t33, t34, t41, t42, t43, t44,
    );
    let c21 = -det4(
        t00, t02, t03, t04, t10, t12, t13, t14, t30, t32, t33, t34, t40, t42, t43, t44,
    );
    let c22 = det4(
        t00, t01, t03, t04, t10, t11, t13, t14, t30, t31, t33, t34, t40, t41, t43, t44,
    );
    let c23 = -det4(
        t00, t01, t02, t04, t10, t11, t12, t14, t30, t31, t32, t34, t40, t41, t42, t44,
    );
    let c24 = det4(
        t00, t01, t02, t03, t10, t11, t12, t13, t30, t31, t32, t33, t40, t41, t42, t43,
    );
    let c30 = -det4(
        t01, t02, t03, t04, t11, t12, t13, t14, t21, t22, t23, t24, t41, t42, t43, t44,
    );
    let c31 = det4(
        t00, t02, t03, t04, t10, t12, t13, t14, t20, t22, t23, t24, t40, t42, t43, t44,
    );
    let c32 = -det4(
        t00, t01, t03, t04, t10, t11, t13, t14, t20, t21, t23, t24, t40, t41, t43, t44,
    );
    let c33 = det4(
        t00, t01, t02, t04, t10, t11, t12, t14, t20, t21, t22, t24, t40, t41, t42, t44,
    );
    let c34 = -det4(
        t00, t01, t02, t03, t10, t11, t12, t13, t20, t21, t22, t23, t40, t41, t42, t43,
    );
    let c40 = det4(
        t01, t02, t03, t04, t11, t12, t13, t14, t21, t22, t23, t24, t31, t32, t33, t34,
    );
    let c41 = -det4(
        t00, t02, t03, t04, t10, t12, t13, t14, t20, t22, t23, t24, t30, t32, t33, t34,
    );
    let c42 = det4(
        t00, t01, t03, t04, t10, t11, t13, t14, t20, t21, t23, t24, t30, t31, t33, t34,
    );
    let c43 = -det4(
        t00, t01, t02, t04, t10, t11, t12, t14, t20, t21, t22, t24, t30, t31, t32, t34,
    );
    let c44 = det4(
        t00, t01, t02, t03, t10, t11, t12, t13, t20, t21, t22, t23, t30, t31, t32, t33,
    );

    let det = scale * (t00 * c00 + t10 * c10 + t20 * c20 + t30 * c30 + t40 * c40);

    inverse[(0, 0)] = c00 / det;
    inverse[(1, 0)] = c01 / det;
    inverse[(2, 0)] = c02 / det;
    inverse[(3, 0)] = c03 / det;
    inverse[(4, 0)] = c04 / det;
    inverse[(0, 1)] = c10 / det;
    inverse[(1, 1)] = c11 / det;
    inverse[(2, 1)] = c12 / det;
    inverse[(3, 1)] = c13 / det;
    inverse[(4, 1)] = c14 / det;
    inverse[(0, 2)] = c20 / det;
    inverse[(1, 2)] = c21 / det;
    inverse[(2, 2)] = c22 / det;
    inverse[(3, 2)] = c23 / det;
    inverse[(4, 2)] = c24 / det;
    inverse[(0, 3)] = c30 / det;
    inverse[(1, 3)] = c31 / det;
    inverse[(2, 3)] = c32 / det;
    inverse[(3, 3)] = c33 / det;
    inverse[(4, 3)] = c34 / det;
    inverse[(0, 4)] = c40 / det;
    inverse[(1, 4)] = c41 / det;
    inverse[(2, 4)] = c42 / det;
    inverse[(3, 4)] = c43 / det;
    inverse[(4, 4)] = c44 / det;
}

/// Inverse of a symmetric 2x2 matrix reading only the upper triangle.
pub fn symmetric_invert_2x2_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
    let d0 = matrix[(0, 0)];
    let u01 = matrix[(0, 1)];
    let d1 = matrix[(1, 1)];

    let det = d0 * d1 - u01 * u01;

    inverse[(0, 0)] = d1 / det;
    inverse[(0, 1)] = -u01 / det;
    inverse[(1, 0)] = -u01 / det;
    inverse[(1, 1)] = d0 / det;
}

/// Inverse of a symmetric 3x3 matrix. The cofactor matrix of a symmetric
/// matrix is itself symmetric, so only the upper cofactors are evaluated.
pub fn symmetric_invert_3x3_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
    let scale = upper_triangle_norm(matrix, 3);
    let t00 = matrix[(0, 0)] / scale;
    let t01 = matrix[(0, 1)] / scale;
    let t02 = matrix[(0, 2)] / scale;
    let t11 = matrix[(1, 1)] / scale;
    let t12 = matrix[(1, 2)] / scale;
    let t22 = matrix[(2, 2)] / scale;

    let c00 = det2(t11, t12, t12, t22);
    let c01 = -det2(t01, t02, t12, t22);
    let c02 = det2(t01, t02, t11, t12);
    let c11 = det2(t00, t02, t02, t22);
    let c12 = -det2(t00, t01, t02, t12);
    let c22 = det2(t00, t01, t01, t11);

    let det = scale * (t00 * c00 + t01 * c01 + t02 * c02);

    inverse[(0, 0)] = c00 / det;
    inverse[(0, 1)] = c01 / det;
    inverse[(1, 0)] = c01 / det;
    inverse[(0, 2)] = c02 / det;
    inverse[(2, 0)] = c02 / det;
    inverse[(1, 1)] = c11 / det;
    inverse[(1, 2)] = c12 / det;
    inverse[(2, 1)] = c12 / det;
    inverse[(2, 2)] = c22 / det;
}

/// Inverse of a symmetric 4x4 matrix computing upper cofactors only.
pub fn symmetric_invert_4x4_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
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

    let c00 = det3(t11, t12, t13, t12, t22, t23, t13, t23, t33);
    let c01 = -det3(t01, t02, t03, t12, t22, t23, t13, t23, t33);
    let c02 = det3(t01, t02, t03, t11, t12, t13, t13, t23, t33);
    let c03 = -det3(t01, t02, t03, t11, t12, t13, t12, t22, t23);
    let c11 = det3(t00, t02, t03, t02, t22, t23, t03, t23, t33);
    let c12 = -det3(t00, t01, t03, t02, t12, t23, t03, t13, t33);
    let c13 = det3(t00, t01, t02, t02, t12, t22, t03, t13, t23);
    let c22 = det3(t00, t01, t03, t01, t11, t13, t03, t13, t33);
    let c23 = -det3(t00, t01, t02, t01, t11, t12, t03, t13, t23);
    let c33 = det3(t00, t01, t02, t01, t11, t12, t02, t12, t22);

    let det = scale * (t00 * c00 + t01 * c01 + t02 * c02 + t03 * c03);

    inverse[(0, 0)] = c00 / det;
    inverse[(0, 1)] = c01 / det;
    inverse[(1, 0)] = c01 / det;
    inverse[(0, 2)] = c02 / det;
    inverse[(2, 0)] = c02 / det;
    inverse[(0, 3)] = c03 / det;
    inverse[(3, 0)] = c03 / det;
    inverse[(1, 1)] = c11 / det;
    inverse[(1, 2)] = c12 / det;
    inverse[(2, 1)] = c12 / det;
    inverse[(1, 3)] = c13 / det;
    inverse[(3, 1)] = c13 / det;
    inverse[(2, 2)] = c22 / det;
    inverse[(2, 3)] = c23 / det;
    inverse[(3, 2)] = c23 / det;
    inverse[(3, 3)] = c33 / det;
}

/// Inverse of a symmetric 5x5 matrix computing upper cofactors only.
pub fn symmetric_invert_5x5_into(matrix: &DMatrix<f64>, inverse: &mut DMatrix<f64>) {
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

    // Mirrored aliases keep the minor layouts below readable.
    let (t10, t20, t30, t40) = (t01, t02, t03, t04);
    let (t21, t31, t41) = (t12, t13, t14);
    let (t32, t42) = (t23, t24);
    let t43 = t34;

    let c00 = det4(
        t11, t12, t13, t14, t21, t22, t23, t24, t31, t32, t33, t34, t41, t42, t43, t44,
    );
    let c01 = -det4(
        t01, t02, t03, t04, t21, t22, t23, t24, t31, t32, t33, t34, t41, t42, t43, t44,
    );
    let c02 = det4(
        t01, t02, t03, t04, t11, t12, t13, t14, t31, t32, t33, t34, t41, t42, t43, t44,
    );
    let c03 = -det4(
        t01, t02, t03, t04, t11, t12, t13, t14, t21, t22, t23, t24, t41, t42, t43, t44,
    );
    let c04 = det4(
        t01, t02, t03, t04, t11, t12, t13, t14, t21, t22, t23, t24, t31, t32, t33, t34,
    );
    let c11 = det4(
        t00, t02, t03, t04, t20, t22, t23, t24, t30, t32, t33, t34, t40, t42, t43, t44,
    );
    let c12 = -det4(
        t00, t01, t03, t04, t20, t21, t23, t24, t30, t31, t33, t34, t40, t41, t43, t44,
    );
    let c13 = det4(
        t00, t01, t02, t04, t20, t21, t22, t24, t30, t31, t32, t34, t40, t41, t42, t44,
    );
    let c14 = -det4(
        t00, t01, t02, t03, t20, t21, t22, t23, t30, t31, t32, t33, t40, t41, t42, t43,
    );
    let c22 = det4(
        t00, t01, t03, t04, t10, t11, t13, t14, t30, t31, t33, t34, t40, t41, t43, t44,
    );
    let c23 = -det4(
        t00, t01, t02, t04, t10, t11, t12, t14, t30, t31, t32, t34, t40, t41, t42, t44,
    );
    let c24 = det4(
        t00, t01, t02, t03, t10, t11, t12, t13, t30, t31, t32, t33, t40, t41, t42, t43,
    );
    let c33 = det4(
        t00, t01, t02, t04, t10, t11, t12, t14, t20, t21, t22, t24, t40, t41, t42, t44,
    );
    let c34 = -det4(
        t00, t01, t02, t03, t10, t11, t12, t13, t20, t21, t22, t23, t40, t41, t42, t43,
    );
    let c44 = det4(
        t00, t01, t02, t03, t10, t11, t12, t13, t20, t21, t22, t23, t30, t31, t32, t33,
    );

    let det = scale * (t00 * c00 + t01 * c01 + t02 * c02 + t03 * c03 + t04 * c04);

    inverse[(0, 0)] = c00 / det;
    inverse[(0, 1)] = c01 / det;
    inverse[(1, 0)] = c01 / det;
    inverse[(0, 2)] = c02 / det;
    inverse[(2, 0)] = c02 / det;
    inverse[(0, 3)] = c03 / det;
    inverse[(3, 0)] = c03 / det;
    inverse[(0, 4)] = c04 / det;
    inverse[(4, 0)] = c04 / det;
    inverse[(1, 1)] = c11 / det;
    inverse[(1, 2)] = c12 / det;
    inverse[(2, 1)] = c12 / det;
    inverse[(1, 3)] = c13 / det;
    inverse[(3, 1)] = c13 / det;
    inverse[(1, 4)] = c14 / det;
    inverse[(4, 1)] = c14 / det;
    inverse[(2, 2)] = c22 / det;
    inverse[(2, 3)] = c23 / det;
    inverse[(3, 2)] = c23 / det;
    inverse[(2, 4)] = c24 / det;
    inverse[(4, 2)] = c24 / det;
    inverse[(3, 3)] = c33 / det;
    inverse[(3, 4)] = c34 / det;
    inverse[(4, 3)] = c34 / det;
    inverse[(4, 4)] = c44 / det;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn test_matrix(dim: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(dim, dim, |_, _| rng.gen_range(-1.0..1.0))
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

    fn invert(dim: usize, matrix: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(dim, dim);
        match dim {
            1 => invert_1x1_into(matrix, &mut out),
            2 => invert_2x2_into(matrix, &mut out),
            3 => invert_3x3_into(matrix, &mut out),
            4 => invert_4x4_into(matrix, &mut out),
            5 => invert_5x5_into(matrix, &mut out),
            _ => unreachable!(),
        }
        out
    }

    fn symmetric_invert(dim: usize, matrix: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(dim, dim);
        match dim {
            2 => symmetric_invert_2x2_into(matrix, &mut out),
            3 => symmetric_invert_3x3_into(matrix, &mut out),
            4 => symmetric_invert_4x4_into(matrix, &mut out),
            5 => symmetric_invert_5x5_into(matrix, &mut out),
            _ => unreachable!(),
        }
        out
    }

    fn max_abs_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
        (a - b).abs().max()
    }

    #[test]
    fn test_inverse_times_matrix_is_identity() {
        for dim in 1..=5 {
            let m = diagonally_dominant(dim, 100 + dim as u64);
            let inv = invert(dim, &m);
            let id = DMatrix::identity(dim, dim);
            let err = max_abs_diff(&(&m * &inv), &id);
            assert!(err < 1e-9, "dim {}: residual {}", dim, err);
            let err = max_abs_diff(&(&inv * &m), &id);
            assert!(err < 1e-9, "dim {}: residual {}", dim, err);
        }
    }

    #[test]
    fn test_symmetric_inverse_matches_general() {
        for dim in 2..=5 {
            let m = symmetric_posdef(dim, 200 + dim as u64);
            let general = invert(dim, &m);
            let symmetric = symmetric_invert(dim, &m);
            let err = max_abs_diff(&general, &symmetric);
            assert!(err < 1e-10, "dim {}: divergence {}", dim, err);
        }
    }

    #[test]
    fn test_symmetric_inverse_ignores_lower_triangle() {
        for dim in 2..=5 {
            let m = symmetric_posdef(dim, 300 + dim as u64);
            let mut garbage = m.clone();
            for col in 0..dim {
                for row in (col + 1)..dim {
                    garbage[(row, col)] = f64::NAN;
                }
            }
            let inv = symmetric_invert(dim, &garbage);
            let id = DMatrix::identity(dim, dim);
            let err = max_abs_diff(&(&m * &inv), &id);
            assert!(err < 1e-9, "dim {}: residual {}", dim, err);
        }
    }

    #[test]
    fn test_singular_input_reports_in_band() {
        // Rank-1 matrix: every cofactor is zero, det is zero.
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 3.0, 6.0, 9.0]);
        let inv = invert(3, &m);
        assert!(inv.iter().any(|v| v.is_nan() || v.is_infinite()));
    }

    #[test]
    fn test_extreme_magnitude_inverse() {
        // Entries around 5e155: their squares alone exceed the f64 range,
        // so the result is only finite with a peak-relative scale norm.
        let m = 1e155 * diagonally_dominant(4, 404);
        let inv = invert(4, &m);
        assert!(inv.iter().all(|v| v.is_finite()), "inverse {:?}", inv);
        let id = DMatrix::identity(4, 4);
        let err = max_abs_diff(&(&m * &inv), &id);
        assert!(err < 1e-9, "residual {}", err);
    }
}
