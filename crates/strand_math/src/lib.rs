// Re-export glam for convenience
pub use glam::*;

// Strand math types
mod aabb;
mod frame;
mod interval;
mod oriented;

pub use aabb::Aabb;
pub use frame::{frame, is_orthonormal, local_frame, renormalize};
pub use interval::Interval;
pub use oriented::OrientedBox;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_vec4_radius_packing() {
        // Curve control points pack position in xyz and radius in w.
        let p = Vec4::new(1.0, 2.0, 3.0, 0.25);
        assert_eq!(p.truncate(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.w, 0.25);
    }
}
