//! Two-cluster splits by strand direction.
//!
//! Hair aimed in very different directions cannot all bound tightly in
//! one frame; separating by direction gives each cluster a frame of its
//! own. Two seed directions are chosen as the most dissimilar pair among
//! a sampled subset of chords, then every reference joins the seed its
//! direction matches best.

use strand_math::{local_frame, Aabb, Vec3};

use crate::prim_info::PrimInfo;
use crate::ref_list::{BlockAllocator, RefList};

const MIN_CHORD_LENGTH: f32 = 1e-9;

/// A chosen pair of seed directions, or an invalid split with infinite
/// SAH when directions cannot separate the set.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StrandSplit {
    /// Summed child cost, each side measured in its own seed frame.
    pub sah: f32,
    axis0: Vec3,
    axis1: Vec3,
}

impl StrandSplit {
    fn invalid() -> Self {
        Self {
            sah: f32::INFINITY,
            axis0: Vec3::Z,
            axis1: Vec3::Z,
        }
    }

    /// Seeds on the most dissimilar sampled chord pair and scores the
    /// induced partition.
    pub fn find(prims: &RefList) -> Self {
        let n = prims.len();
        if n < 2 {
            return Self::invalid();
        }

        // Sample roughly one direction in sixteen.
        let stride = (n + 15) / 16;
        let mut samples = Vec::new();
        for (k, seg) in prims.iter().enumerate() {
            if k % stride != 0 {
                continue;
            }
            let chord = seg.direction();
            if chord.length() >= MIN_CHORD_LENGTH {
                samples.push(chord.normalize());
            }
        }
        if samples.len() < 2 {
            return Self::invalid();
        }

        // Most dissimilar pair: smallest |cos| between directions.
        let mut best = Self::invalid();
        let mut best_dot = f32::INFINITY;
        for i in 0..samples.len() {
            for j in i + 1..samples.len() {
                let dot = samples[i].dot(samples[j]).abs();
                if dot < best_dot {
                    best_dot = dot;
                    best.axis0 = samples[i];
                    best.axis1 = samples[j];
                }
            }
        }

        let ((n0, b0), (n1, b1)) = score(prims, best.axis0, best.axis1);
        if n0 == 0 || n1 == 0 {
            return Self::invalid();
        }
        best.sah = n0 as f32 * b0.half_area() + n1 as f32 * b1.half_area();
        best
    }

    /// Partitions `prims` between the two seeds, consuming the list.
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
                if joins_first_seed(seg.direction(), self.axis0, self.axis1) {
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

/// Seed assignment: larger |cos| wins, ties and degenerate chords go to
/// the first seed.
fn joins_first_seed(direction: Vec3, axis0: Vec3, axis1: Vec3) -> bool {
    if direction.length() < MIN_CHORD_LENGTH {
        return true;
    }
    let d = direction.normalize();
    d.dot(axis0).abs() >= d.dot(axis1).abs()
}

/// Counts and local-frame bounds of each cluster.
fn score(prims: &RefList, axis0: Vec3, axis1: Vec3) -> ((usize, Aabb), (usize, Aabb)) {
    let space0 = local_frame(axis0);
    let space1 = local_frame(axis1);
    let mut n0 = 0;
    let mut n1 = 0;
    let mut b0 = Aabb::EMPTY;
    let mut b1 = Aabb::EMPTY;
    for seg in prims.iter() {
        if joins_first_seed(seg.direction(), axis0, axis1) {
            n0 += 1;
            b0.extend(&seg.bounds_in(&space0));
        } else {
            n1 += 1;
            b1.extend(&seg.bounds_in(&space1));
        }
    }
    ((n0, b0), (n1, b1))
}
