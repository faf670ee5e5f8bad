//! SAH-optimal object partitioning by centroid binning.
//!
//! References are binned by the centroid of their bounds along each axis
//! of a caller-supplied frame; the frame is the identity for aligned
//! splits and the node's fitted space for oriented ones. The cheapest
//! bin boundary over all three axes wins.

use strand_math::{Aabb, Mat3, Vec3};

use crate::prim_info::PrimInfo;
use crate::ref_list::{BlockAllocator, RefList};

pub(crate) const NUM_BINS: usize = 16;

/// Maps centroids into bin indices over the centroid bounds.
#[derive(Clone, Copy, Debug)]
struct BinMapping {
    min: Vec3,
    scale: Vec3,
}

impl BinMapping {
    fn new(cent_bounds: &Aabb) -> Self {
        let min = Vec3::new(cent_bounds.x.min, cent_bounds.y.min, cent_bounds.z.min);
        let extent = Vec3::new(
            cent_bounds.x.size(),
            cent_bounds.y.size(),
            cent_bounds.z.size(),
        );
        // Zero scale parks every centroid in bin 0; that axis then never
        // yields a split.
        let scale = Vec3::new(
            if extent.x > 0.0 { 0.99 * NUM_BINS as f32 / extent.x } else { 0.0 },
            if extent.y > 0.0 { 0.99 * NUM_BINS as f32 / extent.y } else { 0.0 },
            if extent.z > 0.0 { 0.99 * NUM_BINS as f32 / extent.z } else { 0.0 },
        );
        Self { min, scale }
    }

    fn bin(&self, center: Vec3, axis: usize) -> usize {
        let i = ((center[axis] - self.min[axis]) * self.scale[axis]) as usize;
        i.min(NUM_BINS - 1)
    }
}

/// A chosen (axis, boundary) object split, or an invalid split with
/// infinite SAH when no boundary separates the references.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ObjectSplit {
    /// Summed child cost `n_l * area_l + n_r * area_r`, before traversal
    /// and intersection weights.
    pub sah: f32,
    axis: usize,
    split_bin: usize,
    space: Mat3,
    mapping: BinMapping,
}

impl ObjectSplit {
    fn invalid(space: &Mat3, mapping: BinMapping) -> Self {
        Self {
            sah: f32::INFINITY,
            axis: 0,
            split_bin: 0,
            space: *space,
            mapping,
        }
    }

    /// Finds the cheapest centroid-binned split of `prims` in `space`.
    pub fn find(prims: &RefList, space: &Mat3) -> Self {
        // Centroid bounds in the split frame.
        let mut cent_bounds = Aabb::EMPTY;
        let mut num = 0usize;
        for seg in prims.iter() {
            cent_bounds.grow(seg.bounds_in(space).centroid());
            num += 1;
        }
        let mapping = BinMapping::new(&cent_bounds);
        if num < 2 {
            return Self::invalid(space, mapping);
        }

        let mut counts = [[0usize; NUM_BINS]; 3];
        let mut bounds = [[Aabb::EMPTY; NUM_BINS]; 3];
        for seg in prims.iter() {
            let b = seg.bounds_in(space);
            let c = b.centroid();
            for axis in 0..3 {
                let bin = mapping.bin(c, axis);
                counts[axis][bin] += 1;
                bounds[axis][bin].extend(&b);
            }
        }

        let mut best = Self::invalid(space, mapping);
        for axis in 0..3 {
            if mapping.scale[axis] == 0.0 {
                continue;
            }

            // Suffix sweep: cost of everything right of each boundary.
            let mut right_area = [0.0f32; NUM_BINS];
            let mut right_count = [0usize; NUM_BINS];
            let mut acc_bounds = Aabb::EMPTY;
            let mut acc_count = 0;
            for i in (1..NUM_BINS).rev() {
                acc_count += counts[axis][i];
                acc_bounds.extend(&bounds[axis][i]);
                right_area[i] = acc_bounds.half_area();
                right_count[i] = acc_count;
            }

            // Prefix sweep against it.
            let mut acc_bounds = Aabb::EMPTY;
            let mut acc_count = 0;
            for i in 0..NUM_BINS - 1 {
                acc_count += counts[axis][i];
                acc_bounds.extend(&bounds[axis][i]);
                if acc_count == 0 || right_count[i + 1] == 0 {
                    continue;
                }
                let sah = acc_count as f32 * acc_bounds.half_area()
                    + right_count[i + 1] as f32 * right_area[i + 1];
                if sah < best.sah {
                    best.sah = sah;
                    best.axis = axis;
                    best.split_bin = i;
                }
            }
        }
        best
    }

    /// Partitions `prims` by the found boundary, consuming the list.
    ///
    /// Returns left and right lists with their world-space aggregates.
    /// Bin assignment repeats the `find` mapping, so a centroid landing
    /// exactly on the boundary stays left deterministically.
    pub fn apply(
        &self,
        mut prims: RefList,
        alloc: &BlockAllocator,
        thread_index: usize,
    ) -> ((RefList, PrimInfo), (RefList, PrimInfo)) {
        let mut left = RefList::new();
        let mut right = RefList::new();
        let mut linfo = PrimInfo::empty();
        let mut rinfo = PrimInfo::empty();

        while let Some(block) = prims.take_block() {
            for &seg in block.items() {
                let c = seg.bounds_in(&self.space).centroid();
                if self.mapping.bin(c, self.axis) <= self.split_bin {
                    linfo.add(seg.bounds(), seg.center());
                    left.push(seg, alloc, thread_index);
                } else {
                    rinfo.add(seg.bounds(), seg.center());
                    right.push(seg, alloc, thread_index);
                }
            }
            alloc.release(thread_index, block);
        }
        ((left, linfo), (right, rinfo))
    }
}
