// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Builders for 4×4 affine transforms in homogeneous coordinates.
//!
//! All matrices act on column vectors: a world point `p` (with `w = 1`) is
//! carried to `m * p`. Compose with ordinary matrix multiplication, rightmost
//! transform first.

use cgmath::{InnerSpace as _, Matrix4, Rad, Vector3, Vector4};

use crate::math::FreeCoordinate;

/// Translation by `(vx, vy, vz)`.
#[inline]
pub fn translate(
    vx: FreeCoordinate,
    vy: FreeCoordinate,
    vz: FreeCoordinate,
) -> Matrix4<FreeCoordinate> {
    Matrix4::from_translation(Vector3::new(vx, vy, vz))
}

/// Per-axis scale by `(sx, sy, sz)`.
#[inline]
pub fn scale(
    sx: FreeCoordinate,
    sy: FreeCoordinate,
    sz: FreeCoordinate,
) -> Matrix4<FreeCoordinate> {
    Matrix4::from_nonuniform_scale(sx, sy, sz)
}

/// Rotation by `theta` radians about an arbitrary axis.
///
/// The axis need not be normalized, but must be nonzero.
#[inline]
pub fn rotate_axis(axis: Vector3<FreeCoordinate>, theta: FreeCoordinate) -> Matrix4<FreeCoordinate> {
    Matrix4::from_axis_angle(axis.normalize(), Rad(theta))
}

/// Rotation by `theta` radians about the X axis.
#[inline]
pub fn rotate_x(theta: FreeCoordinate) -> Matrix4<FreeCoordinate> {
    Matrix4::from_angle_x(Rad(theta))
}

/// Rotation by `theta` radians about the Y axis.
#[inline]
pub fn rotate_y(theta: FreeCoordinate) -> Matrix4<FreeCoordinate> {
    Matrix4::from_angle_y(Rad(theta))
}

/// Rotation by `theta` radians about the Z axis.
#[inline]
pub fn rotate_z(theta: FreeCoordinate) -> Matrix4<FreeCoordinate> {
    Matrix4::from_angle_z(Rad(theta))
}

/// Composed Euler rotation `Rz(alpha) · Ry(beta) · Rx(gamma)`.
#[inline]
pub fn rotate_xyz(
    alpha: FreeCoordinate,
    beta: FreeCoordinate,
    gamma: FreeCoordinate,
) -> Matrix4<FreeCoordinate> {
    rotate_z(alpha) * rotate_y(beta) * rotate_x(gamma)
}

/// Cross product of two homogeneous vectors.
///
/// The result is a direction (`w = 0`) regardless of the inputs' `w`.
#[inline]
pub fn cross(u: Vector4<FreeCoordinate>, v: Vector4<FreeCoordinate>) -> Vector4<FreeCoordinate> {
    u.truncate().cross(v.truncate()).extend(0.0)
}
