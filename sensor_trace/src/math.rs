//! Math helpers shared by the instance table and the ray generator.
//!
//! Transforms are stored as 3x4 affine matrices (`Affine3A`: rotation and
//! scale in the 3x3 block, translation in the last column).

use glam::{Affine3A, Mat4, Quat, Vec3, Vec4};
use crate::error::Result;

/// Tolerance used when checking the homogeneous row of a 4x4 matrix
pub const HOMOGENEOUS_ROW_EPSILON: f32 = 1e-5;

/// Narrow a 4x4 homogeneous matrix to a 3x4 affine transform.
///
/// Precondition: the last row is `[0, 0, 0, 1]`. The row is checked within
/// `HOMOGENEOUS_ROW_EPSILON`; a projective matrix fails with
/// `InvalidTransform` instead of being silently truncated.
pub fn affine_from_mat4(matrix: &Mat4) -> Result<Affine3A> {
    let last_row = matrix.row(3);
    let expected = Vec4::new(0.0, 0.0, 0.0, 1.0);

    if !last_row.is_finite() || !matrix.col(0).is_finite() || !matrix.col(1).is_finite()
        || !matrix.col(2).is_finite() || !matrix.col(3).is_finite()
    {
        crate::engine_bail!("sensortrace::math", InvalidTransform,
            "matrix contains non-finite values");
    }
    if !last_row.abs_diff_eq(expected, HOMOGENEOUS_ROW_EPSILON) {
        crate::engine_bail!("sensortrace::math", InvalidTransform,
            "last row must be [0, 0, 0, 1], got {:?}", last_row.to_array());
    }

    Ok(Affine3A::from_mat3_translation(
        glam::Mat3::from_mat4(*matrix),
        matrix.col(3).truncate(),
    ))
}

/// Narrow a column-major `[f32; 16]` (the host's 4x4 layout) to a 3x4 affine.
pub fn affine_from_cols_array(cols: &[f32; 16]) -> Result<Affine3A> {
    affine_from_mat4(&Mat4::from_cols_array(cols))
}

/// Expand a 3x4 affine back to a 4x4 homogeneous matrix.
pub fn mat4_from_affine(affine: &Affine3A) -> Mat4 {
    Mat4::from(*affine)
}

/// Rotate `vector` by `rotation`, normalizing the quaternion first.
///
/// A zero or non-finite quaternion leaves the vector unchanged.
pub fn rotate(rotation: Quat, vector: Vec3) -> Vec3 {
    let length = rotation.length();
    if !length.is_finite() || length <= f32::EPSILON {
        return vector;
    }
    (rotation / length) * vector
}

/// Unit quaternion for a rotation of `angle` radians about `axis`.
///
/// `axis` does not need to be normalized; a degenerate axis yields identity.
pub fn axis_angle(axis: Vec3, angle: f32) -> Quat {
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, angle),
        None => Quat::IDENTITY,
    }
}

/// Whether the linear part of an affine can be inverted.
pub fn is_invertible(affine: &Affine3A) -> bool {
    let det = affine.matrix3.determinant();
    det.is_finite() && det.abs() > f32::EPSILON * f32::EPSILON
}

/// Translation column of an affine.
#[inline]
pub fn translation(affine: &Affine3A) -> Vec3 {
    Vec3::from(affine.translation)
}

#[cfg(test)]
#[path = "math_tests.rs"]
mod tests;
