use crate::{Aabb, Mat3};

/// A bounding box expressed in a local orthonormal frame.
///
/// `space` is a world-to-local rotation; `bounds` is axis-aligned within
/// that frame. With `space` set to the identity this degenerates to a
/// plain world-space AABB.
#[derive(Debug, Copy, Clone)]
pub struct OrientedBox {
    pub space: Mat3,
    pub bounds: Aabb,
}

impl OrientedBox {
    pub const EMPTY: OrientedBox = OrientedBox {
        space: Mat3::IDENTITY,
        bounds: Aabb::EMPTY,
    };

    pub fn new(space: Mat3, bounds: Aabb) -> Self {
        Self { space, bounds }
    }

    /// Wraps a world-space box in the identity frame.
    pub fn axis_aligned(bounds: Aabb) -> Self {
        Self {
            space: Mat3::IDENTITY,
            bounds,
        }
    }
}
