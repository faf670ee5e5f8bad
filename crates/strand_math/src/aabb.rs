use crate::{Interval, Vec3};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Create an empty AABB (contains nothing).
    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Returns true if the box contains no points.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Extends the box to include a point.
    pub fn grow(&mut self, p: Vec3) {
        self.x.grow(p.x);
        self.y.grow(p.y);
        self.z.grow(p.z);
    }

    /// Extends the box to include another box.
    pub fn extend(&mut self, other: &Aabb) {
        *self = Aabb::surrounding(self, other);
    }

    /// Returns the box enlarged by `r` on every side.
    pub fn enlarge(&self, r: f32) -> Aabb {
        Aabb {
            x: self.x.expand(r),
            y: self.y.expand(r),
            z: self.z.expand(r),
        }
    }

    /// Restricts the box to a slab [lo, hi] along one axis.
    pub fn clip_axis(&self, axis: usize, lo: f32, hi: f32) -> Aabb {
        let mut out = *self;
        match axis {
            0 => out.x = out.x.clip(lo, hi),
            1 => out.y = out.y.clip(lo, hi),
            _ => out.z = out.z.clip(lo, hi),
        }
        out
    }

    /// Half of the box's surface area, the quantity compared by the SAH.
    ///
    /// An empty box reports zero so it never contributes to a cost sum.
    pub fn half_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let (dx, dy, dz) = (self.x.size(), self.y.size(), self.z.size());
        dx * dy + dy * dz + dz * dx
    }

    /// Returns true if `other` lies inside this box, within `tol` per axis.
    pub fn contains_box(&self, other: &Aabb, tol: f32) -> bool {
        if other.is_empty() {
            return true;
        }
        self.x.min - tol <= other.x.min
            && other.x.max <= self.x.max + tol
            && self.y.min - tol <= other.y.min
            && other.y.max <= self.y.max + tol
            && self.z.min - tol <= other.z.min
            && other.z.max <= self.z.max + tol
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(self.x.center(), self.y.center(), self.z.center())
    }

    /// Static constant for the empty box.
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
