//! Closed-form determinant kernels
//!
//! This module implements cofactor-expansion determinants for 1x1 through
//! 5x5 matrices including:
//! - General kernels reading every element of the input
//! - Symmetric kernels reading only the upper triangle
//! - Frobenius pre-scaling for dimensions 3 and up so that products of
//!   cofactors stay in floating-point range for extreme magnitudes
//!
//! Every kernel expands along the first column, bottoming out in 2x2 minors.
//! Singular input is reported in-band: the result is 0.0, NaN or infinite,
//! never an error. An all-zero matrix of dimension 3 or more yields NaN
//! because the pre-scaling divides by a zero norm.

use nalgebra::DMatrix;

/// 2x2 determinant of row-major arguments.
#[inline(always)]
pub(crate) fn det2(m00: f64, m01: f64, m10: f64, m11: f64) -> f64 {
    m00 * m11 - m10 * m01
}

/// 3x3 determinant of row-major arguments, expanded along the first column.
#[inline(always)]
pub(crate) fn det3(
    m00: f64,
    m01: f64,
    m02: f64,
    m10: f64,
    m11: f64,
    m12: f64,
    m20: f64,
    m21: f64,
    m22: f64,
) -> f64 {
    m00 * det2(m11, m12, m21, m22) - m10 * det2(m01, m02, m21, m22)
        + m20 * det2(m01, m02, m11, m12)
}

/// 4x4 determinant of row-major arguments, expanded along the first column.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
pub(crate) fn det4(
    m00: f64,
    m01: f64,
    m02: f64,
    m03: f64,
    m10: f64,
    m11: f64,
    m12: f64,
    m13: f64,
    m20: f64,
    m21: f64,
    m22: f64,
    m23: f64,
    m30: f64,
    m31: f64,
    m32: f64,
    m33: f64,
) -> f64 {
    m00 * det3(m11, m12, m13, m21, m22, m23, m31, m32, m33)
        - m10 * det3(m01, m02, m03, m21, m22, m23, m31, m32, m33)
        + m20 * det3(m01, m02, m03, m11, m12, m13, m31, m32, m33)
        - m30 * det3(m01, m02, m03, m11, m12, m13, m21, m22, m23)
}

/// 5x5 determinant of row-major arguments, expanded along the first column.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
pub(crate) fn det5(
    m00: f64,
    m01: f64,
    m02: f64,
    m03: f64,
    m04: f64,
    m10: f64,
    m11: f64,
    m12: f64,
    m13: f64,
    m14: f64,
    m20: f64,
    m21: f64,
    m22: f64,
    m23: f64,
    m24: f64,
    m30: f64,
    m31: f64,
    m32: f64,
    m33: f64,
    m34: f64,
    m40: f64,
    m41: f64,
    m42: f64,
    m43: f64,
    m44: f64,
) -> f64 {
    m00 * det4(
        m11, m12, m13, m14, m21, m22, m23, m24, m31, m32, m33, m34, m41, m42, m43, m44,
    ) - m10
        * det4(
            m01, m02, m03, m04, m21, m22, m23, m24, m31, m32, m33, m34, m41, m42, m43, m44,
        )
        + m20
            * det4(
                m01, m02, m03, m04, m11, m12, m13, m14, m31, m32, m33, m34, m41, m42, m43, m44,
            )
        - m30
            * det4(
                m01, m02, m03, m04, m11, m12, m13, m14, m21, m22, m23, m24, m41, m42, m43, m44,
            )
        + m40
            * det4(
                m01, m02, m03, m04, m11, m12, m13, m14, m21, m22, m23, m24, m31, m32, m33, m34,
            )
}

/// Frobenius norm with the squares taken relative to the largest magnitude,
/// so entries near the f64 range limits cannot overflow the accumulator to
/// infinity or flush it to zero. A plain sum of squares would already break
/// around 1.3e154.
pub(crate) fn scale_norm(matrix: &DMatrix<f64>) -> f64 {
    let peak = matrix.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()));
    if peak == 0.0 || !peak.is_finite() {
        return peak;
    }
    let mut acc = 0.0;
    for &v in matrix.iter() {
        let scaled = v / peak;
        acc += scaled * scaled;
    }
    peak * acc.sqrt()
}

/// Frobenius norm accumulated from the upper triangle only, counting each
/// off-diagonal element twice. Used by the symmetric kernels so they never
/// touch the (possibly unset) lower triangle. Overflow-guarded the same way
/// as `scale_norm`.
pub(crate) fn upper_triangle_norm(matrix: &DMatrix<f64>, dim: usize) -> f64 {
    let mut peak = 0.0_f64;
    for col in 0..dim {
        for row in 0..=col {
            peak = peak.max(matrix[(row, col)].abs());
        }
    }
    if peak == 0.0 || !peak.is_finite() {
        return peak;
    }
    let mut acc = 0.0;
    for col in 0..dim {
        for row in 0..=col {
            let scaled = matrix[(row, col)] / peak;
            if row == col {
                acc += scaled * scaled;
            } else {
                acc += 2.0 * scaled * scaled;
            }
        }
    }
    peak * acc.sqrt()
}

/// Determinant of a 1x1 matrix.
pub fn determinant_1x1(matrix: &DMatrix<f64>) -> f64 {
    matrix[(0, 0)]
}

/// Determinant of a 2x2 matrix. No pre-scaling: a single product difference
/// cannot be saved by it.
pub fn determinant_2x2(matrix: &DMatrix<f64>) -> f64 {
    det2(
        matrix[(0, 0)],
        matrix[(0, 1)],
        matrix[(1, 0)],
        matrix[(1, 1)],
    )
}

/// Determinant of a 3x3 matrix with Frobenius pre-scaling.
pub fn determinant_3x3(matrix: &DMatrix<f64>) -> f64 {
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

    scale * scale * scale * det3(t00, t01, t02, t10, t11, t12, t20, t21, t22)
}

/// Determinant of a 4x4 matrix with Frobenius pre-scaling.
pub fn determinant_4x4(matrix: &DMatrix<f64>) -> f64 {
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

    scale
        * scale
        * scale
        * scale
        * det4(
            t00, t01, t02, t03, t10, t11, t12, t13, t20, t21, t22, t23, t30, t31, t32, t33,
        )
}

/// Determinant of a 5x5 matrix with Frobenius pre-scaling.
pub fn determinant_5x5(matrix: &DMatrix<f64>) -> f64 {
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

    scale
        * scale
        * scale
        * scale
        * scale
        * det5(
            t00, t01, t02, t03, t04, t10, t11, t12, t13, t14, t20, t21, t22, t23, t24, t30, t31,
            t32, t33, t34, t40, t41, t42, t43, t44,
        )
}

/// Determinant of a symmetric 2x2 matrix. Reads the diagonal and the single
/// upper off-diagonal element only.
pub fn symmetric_determinant_2x2(matrix: &DMatrix<f64>) -> f64 {
    let d0 = matrix[(0, 0)];
    let u01 = matrix[(0, 1)];
    let d1 = matrix[(1, 1)];
    d0 * d1 - u01 * u01
}

/// Determinant of a symmetric 3x3 matrix reading only the upper triangle,
/// with Frobenius pre-scaling.
pub fn symmetric_determinant_3x3(matrix: &DMatrix<f64>) -> f64 {
    let scale = upper_triangle_norm(matrix, 3);
    let t00 = matrix[(0, 0)] / scale;
    let t01 = matrix[(0, 1)] / scale;
    let t02 = matrix[(0, 2)] / scale;
    let t11 = matrix[(1, 1)] / scale;
    let t12 = matrix[(1, 2)] / scale;
    let t22 = matrix[(2, 2)] / scale;

    scale * scale * scale * det3(t00, t01, t02, t01, t11, t12, t02, t12, t22)
}

/// Determinant of a symmetric 4x4 matrix reading only the upper triangle,
/// with Frobenius pre-scaling.
pub fn symmetric_determinant_4x4(matrix: &DMatrix<f64>) -> f64 {
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

    scale
        * scale
        * scale
        * scale
        * det4(
            t00, t01, t02, t03, t01, t11, t12, t13, t02, t12, t22, t23, t03, t13, t23, t33,
        )
}

/// Determinant of a symmetric 5x5 matrix reading only the upper triangle,
/// with Frobenius pre-scaling.
pub fn symmetric_determinant_5x5(matrix: &DMatrix<f64>) -> f64 {
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

    scale
        * scale
        * scale
        * scale
        * scale
        * det5(
            t00, t01, t02, t03, t04, t01, t11, t12, t13, t14, t02, t12, t22, t23, t24, t03, t13,
            t23, t33, t34, t04, t14, t24, t34, t44,
        )
}
