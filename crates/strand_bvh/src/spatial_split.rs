//! SAH-optimal spatial splits with budgeted primitive duplication.
//!
//! Unlike object partitioning, a spatial split fixes a world-space plane
//! and clips straddling references across it, so one curve may end up in
//! both children. Candidate planes are bin boundaries over the geometry
//! bounds; each reference votes for every bin its box overlaps, with the
//! box clipped to the bin slab so the swept SAH sees clipped extents.
//!
//! Duplication is paid for out of a global budget shared by all workers.
//! One unit is claimed per extra segment created; once claims fail,
//! straddlers fall back to whole-segment assignment by centroid side, so
//! the budget is a hard cap.

use std::sync::atomic::{AtomicIsize, Ordering};

use strand_math::Aabb;

use crate::curve::CurveSegment;
use crate::object_partition::NUM_BINS;
use crate::prim_info::PrimInfo;
use crate::ref_list::{BlockAllocator, RefList};

/// Deepest recursive clip of one straddling curve. Each level halves the
/// parameter window, so eight levels resolve crossings to 1/256 of the
/// segment.
const MAX_CLIP_DEPTH: usize = 8;

/// A chosen world-space splitting plane, or an invalid split with
/// infinite SAH.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpatialSplit {
    /// Summed child cost against clipped bounds.
    pub sah: f32,
    axis: usize,
    /// Plane position along `axis`.
    position: f32,
}

impl SpatialSplit {
    fn invalid() -> Self {
        Self {
            sah: f32::INFINITY,
            axis: 0,
            position: 0.0,
        }
    }

    /// Finds the cheapest binned spatial split of `prims`.
    pub fn find(prims: &RefList, pinfo: &PrimInfo) -> Self {
        let bounds = pinfo.geom_bounds;
        if bounds.is_empty() {
            return Self::invalid();
        }

        let mut entry = [[0usize; NUM_BINS]; 3];
        let mut exit = [[0usize; NUM_BINS]; 3];
        let mut bin_bounds = [[Aabb::EMPTY; NUM_BINS]; 3];

        let lo = [bounds.x.min, bounds.y.min, bounds.z.min];
        let width = [
            bounds.x.size() / NUM_BINS as f32,
            bounds.y.size() / NUM_BINS as f32,
            bounds.z.size() / NUM_BINS as f32,
        ];
        let bin_of = |x: f32, axis: usize| -> usize {
            (((x - lo[axis]) / width[axis]).max(0.0) as usize).min(NUM_BINS - 1)
        };

        for seg in prims.iter() {
            let b = seg.bounds();
            for axis in 0..3 {
                if width[axis] <= 0.0 {
                    continue;
                }
                let b0 = bin_of(b.axis_interval(axis).min, axis);
                let b1 = bin_of(b.axis_interval(axis).max, axis);
                entry[axis][b0] += 1;
                exit[axis][b1] += 1;
                for bin in b0..=b1 {
                    let slab_lo = lo[axis] + bin as f32 * width[axis];
                    let slab_hi = slab_lo + width[axis];
                    bin_bounds[axis][bin].extend(&b.clip_axis(axis, slab_lo, slab_hi));
                }
            }
        }

        let mut best = Self::invalid();
        for axis in 0..3 {
            if width[axis] <= 0.0 {
                continue;
            }

            let mut right_area = [0.0f32; NUM_BINS];
            let mut right_count = [0usize; NUM_BINS];
            let mut acc_bounds = Aabb::EMPTY;
            let mut acc_count = 0;
            for i in (1..NUM_BINS).rev() {
                acc_count += exit[axis][i];
                acc_bounds.extend(&bin_bounds[axis][i]);
                right_area[i] = acc_bounds.half_area();
                right_count[i] = acc_count;
            }

            let mut acc_bounds = Aabb::EMPTY;
            let mut acc_count = 0;
            for i in 0..NUM_BINS - 1 {
                acc_count += entry[axis][i];
                acc_bounds.extend(&bin_bounds[axis][i]);
                if acc_count == 0 || right_count[i + 1] == 0 {
                    continue;
                }
                let sah = acc_count as f32 * acc_bounds.half_area()
                    + right_count[i + 1] as f32 * right_area[i + 1];
                if sah < best.sah {
                    best.sah = sah;
                    best.axis = axis;
                    best.position = lo[axis] + (i + 1) as f32 * width[axis];
                }
            }
        }
        best
    }

    /// Splits `prims` at the plane, clipping straddlers while the
    /// replication budget lasts.
    pub fn apply(
        &self,
        mut prims: RefList,
        alloc: &BlockAllocator,
        thread_index: usize,
        budget: &AtomicIsize,
    ) -> ((RefList, PrimInfo), (RefList, PrimInfo)) {
        let mut left = Side {
            list: RefList::new(),
            info: PrimInfo::empty(),
        };
        let mut right = Side {
            list: RefList::new(),
            info: PrimInfo::empty(),
        };

        while let Some(block) = prims.take_block() {
            for &seg in block.items() {
                self.clip(
                    seg,
                    MAX_CLIP_DEPTH,
                    budget,
                    &mut left,
                    &mut right,
                    alloc,
                    thread_index,
                );
            }
            alloc.release(thread_index, block);
        }
        ((left.list, left.info), (right.list, right.info))
    }

    fn clip(
        &self,
        seg: CurveSegment,
        depth: usize,
        budget: &AtomicIsize,
        left: &mut Side,
        right: &mut Side,
        alloc: &BlockAllocator,
        thread_index: usize,
    ) {
        let b = seg.bounds();
        if b.axis_interval(self.axis).max <= self.position {
            left.push(seg, alloc, thread_index);
            return;
        }
        if b.axis_interval(self.axis).min >= self.position {
            right.push(seg, alloc, thread_index);
            return;
        }

        // Straddling. Subdividing creates one extra reference; stop when
        // the window is resolved or the budget refuses the duplicate.
        if depth == 0 || !claim_replication(budget) {
            let side = if b.centroid()[self.axis] < self.position {
                left
            } else {
                right
            };
            side.push(seg, alloc, thread_index);
            return;
        }

        let (a, c) = seg.subdivide();
        self.clip(a, depth - 1, budget, left, right, alloc, thread_index);
        self.clip(c, depth - 1, budget, left, right, alloc, thread_index);
    }
}

struct Side {
    list: RefList,
    info: PrimInfo,
}

impl Side {
    fn push(&mut self, seg: CurveSegment, alloc: &BlockAllocator, thread_index: usize) {
        self.info.add(seg.bounds(), seg.center());
        self.list.push(seg, alloc, thread_index);
    }
}

/// Takes one unit from the shared replication budget; fails once spent.
fn claim_replication(budget: &AtomicIsize) -> bool {
    budget
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            (n > 0).then(|| n - 1)
        })
        .is_ok()
}
