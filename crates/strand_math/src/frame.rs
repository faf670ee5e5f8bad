//! Orthonormal frame construction for oriented bounding.
//!
//! Long thin primitives bound tightly in a coordinate system aligned with
//! their dominant direction. These helpers build such world-to-local
//! rotations and keep them numerically orthonormal.

use crate::{Mat3, Vec3};

/// Builds an orthonormal basis whose third column is `n`.
///
/// `n` must be normalized. The first column is chosen as the larger of the
/// two cross products with the world X and Y axes, which avoids the
/// degenerate case where `n` is parallel to the seed axis.
pub fn frame(n: Vec3) -> Mat3 {
    let dx0 = Vec3::X.cross(n);
    let dx1 = Vec3::Y.cross(n);
    let dx = if dx0.length_squared() > dx1.length_squared() {
        dx0
    } else {
        dx1
    }
    .normalize();
    let dy = n.cross(dx).normalize();
    Mat3::from_cols(dx, dy, n)
}

/// Builds the world-to-local rotation whose third row is `axis`.
///
/// Multiplying a world-space point by the result yields its coordinates in
/// a frame where `axis` maps to +Z. The matrix is renormalized so repeated
/// per-primitive transforms cannot drift.
pub fn local_frame(axis: Vec3) -> Mat3 {
    renormalize(frame(axis).transpose())
}

/// Clamps matrix entries to [-1, 1] and re-orthonormalizes the rows.
///
/// Rotation entries can only leave the unit range through floating-point
/// drift; clamping plus one Gram-Schmidt pass restores a valid rotation.
pub fn renormalize(space: Mat3) -> Mat3 {
    let unit = Vec3::splat(1.0);
    let rows = space.transpose();
    let w = rows.z_axis.clamp(-unit, unit).normalize();
    let u0 = rows.x_axis.clamp(-unit, unit);
    let u = (u0 - w * u0.dot(w)).normalize();
    let v = w.cross(u);
    Mat3::from_cols(u, v, w).transpose()
}

/// Checks that the rows of `m` are unit length and pairwise orthogonal.
pub fn is_orthonormal(m: &Mat3, tol: f32) -> bool {
    let rows = m.transpose();
    let (u, v, w) = (rows.x_axis, rows.y_axis, rows.z_axis);
    (u.length() - 1.0).abs() <= tol
        && (v.length() - 1.0).abs() <= tol
        && (w.length() - 1.0).abs() <= tol
        && u.dot(v).abs() <= tol
        && v.dot(w).abs() <= tol
        && w.dot(u).abs() <= tol
}
