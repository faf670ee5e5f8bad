//! Aggregate bounds information over a reference set.

use strand_math::{Aabb, Vec3};

use crate::ref_list::RefList;

/// Count, geometry bounds, and centroid bounds of a set of references.
///
/// Aggregation is associative and commutative, so infos for disjoint sets
/// combine without rescanning the primitives.
#[derive(Clone, Copy, Debug)]
pub struct PrimInfo {
    num: usize,
    /// World-space union of the reference bounds.
    pub geom_bounds: Aabb,
    /// World-space union of the reference centroids.
    pub cent_bounds: Aabb,
}

impl PrimInfo {
    pub fn empty() -> Self {
        Self {
            num: 0,
            geom_bounds: Aabb::EMPTY,
            cent_bounds: Aabb::EMPTY,
        }
    }

    /// Aggregates every reference in a list.
    pub fn from_list(prims: &RefList) -> Self {
        let mut info = Self::empty();
        for seg in prims.iter() {
            info.add(seg.bounds(), seg.center());
        }
        info
    }

    /// Folds one reference into the aggregate.
    pub fn add(&mut self, bounds: Aabb, center: Vec3) {
        self.num += 1;
        self.geom_bounds.extend(&bounds);
        self.cent_bounds.grow(center);
    }

    /// Folds another aggregate into this one.
    pub fn merge(&mut self, other: &PrimInfo) {
        self.num += other.num;
        self.geom_bounds.extend(&other.geom_bounds);
        self.cent_bounds.extend(&other.cent_bounds);
    }

    pub fn size(&self) -> usize {
        self.num
    }
}

impl Default for PrimInfo {
    fn default() -> Self {
        Self::empty()
    }
}
