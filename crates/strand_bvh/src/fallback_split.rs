//! Deterministic median split for sets no heuristic can score.
//!
//! When every SAH candidate reports infinite cost (references too few,
//! too similar, or degenerate) the set is still halved so the build makes
//! progress: references are ordered by centroid along the dominant
//! centroid axis and cut at the median. No SAH is consulted and nothing
//! is duplicated.

use crate::prim_info::PrimInfo;
use crate::ref_list::{BlockAllocator, RefList};

/// Splits `prims` at the centroid median of the dominant axis.
///
/// The sort is stable, so references with equal centroids keep list
/// order and repeated builds produce the same halves.
pub(crate) fn fallback_split(
    mut prims: RefList,
    pinfo: &PrimInfo,
    alloc: &BlockAllocator,
    thread_index: usize,
) -> ((RefList, PrimInfo), (RefList, PrimInfo)) {
    let axis = pinfo.cent_bounds.longest_axis();

    let mut refs = Vec::with_capacity(pinfo.size());
    while let Some(block) = prims.take_block() {
        refs.extend_from_slice(block.items());
        alloc.release(thread_index, block);
    }
    refs.sort_by(|a, b| a.center()[axis].total_cmp(&b.center()[axis]));

    let mid = refs.len() / 2;
    let mut left = RefList::new();
    let mut right = RefList::new();
    let mut linfo = PrimInfo::empty();
    let mut rinfo = PrimInfo::empty();
    for (i, &seg) in refs.iter().enumerate() {
        if i < mid {
            linfo.add(seg.bounds(), seg.center());
            left.push(seg, alloc, thread_index);
        } else {
            rinfo.add(seg.bounds(), seg.center());
            right.push(seg, alloc, thread_index);
        }
    }
    ((left, linfo), (right, rinfo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveSegment;
    use strand_math::{Vec3, Vec4};

    fn point_curve(center: Vec3, prim_id: u32) -> CurveSegment {
        let p = center.extend(0.05);
        CurveSegment::new(p, p, p, p, 0.0, 1.0, 0, prim_id)
    }

    #[test]
    fn test_median_split_on_dominant_axis() {
        let alloc = BlockAllocator::new(1);
        let mut list = RefList::new();
        // Dominant spread along Y, pushed out of order.
        for &(y, id) in &[(3.0, 3), (0.0, 0), (2.0, 2), (1.0, 1)] {
            list.push(point_curve(Vec3::new(0.0, y, 0.0), id), &alloc, 0);
        }
        let pinfo = PrimInfo::from_list(&list);

        let ((left, linfo), (right, rinfo)) = fallback_split(list, &pinfo, &alloc, 0);

        assert_eq!(linfo.size(), 2);
        assert_eq!(rinfo.size(), 2);
        let mut left_ids: Vec<u32> = left.iter().map(|s| s.prim_id).collect();
        let mut right_ids: Vec<u32> = right.iter().map(|s| s.prim_id).collect();
        left_ids.sort_unstable();
        right_ids.sort_unstable();
        assert_eq!(left_ids, vec![0, 1]);
        assert_eq!(right_ids, vec![2, 3]);
    }

    #[test]
    fn test_odd_count_favors_right() {
        let alloc = BlockAllocator::new(1);
        let mut list = RefList::new();
        for i in 0..5 {
            list.push(point_curve(Vec3::new(i as f32, 0.0, 0.0), i as u32), &alloc, 0);
        }
        let pinfo = PrimInfo::from_list(&list);

        let ((_, linfo), (_, rinfo)) = fallback_split(list, &pinfo, &alloc, 0);
        assert_eq!(linfo.size(), 2);
        assert_eq!(rinfo.size(), 3);
    }
}
