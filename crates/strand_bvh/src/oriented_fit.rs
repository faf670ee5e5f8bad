//! Oriented-frame fitting: find a local space in which a bundle of
//! strands bounds tightly.
//!
//! A box aligned with a strand's direction is long in one axis and only
//! radius-wide in the other two, so its surface area collapses compared
//! to a world-aligned box. The fit samples a few reference chords as
//! candidate frame axes and keeps the frame minimizing the summed
//! per-reference half-area, a cheap proxy for the union's area.

use strand_math::{local_frame, Aabb, Mat3, OrientedBox};

use crate::ref_list::RefList;

/// Chords shorter than this give no usable direction.
const MIN_CHORD_LENGTH: f32 = 1e-9;

/// Fits an oriented bounding box over a reference list.
///
/// Roughly one reference in four (stepping at stride ceil(N/4)) proposes
/// its chord direction as the frame axis; each candidate frame is scored
/// against the whole list. Ties keep the later candidate. If no sampled
/// reference has a usable chord, the world frame and world bounds are
/// returned.
pub(crate) fn fit_oriented_bounds(prims: &RefList) -> OrientedBox {
    let n = prims.len();
    if n == 0 {
        return OrientedBox::EMPTY;
    }
    let stride = (n + 3) / 4;

    let mut best_area = f32::INFINITY;
    let mut best_space = Mat3::IDENTITY;
    let mut best_bounds = Aabb::EMPTY;

    for (k, candidate) in prims.iter().enumerate() {
        if k % stride != 0 {
            continue;
        }
        let chord = candidate.direction();
        if chord.length() < MIN_CHORD_LENGTH {
            continue;
        }
        let space = local_frame(chord.normalize());

        let mut bounds = Aabb::EMPTY;
        let mut area = 0.0;
        for seg in prims.iter() {
            let b = seg.bounds_in(&space);
            area += b.half_area();
            bounds.extend(&b);
        }

        if area <= best_area {
            best_area = area;
            best_space = space;
            best_bounds = bounds;
        }
    }

    // All sampled chords degenerate: fall back to world space.
    if best_area == f32::INFINITY {
        let mut bounds = Aabb::EMPTY;
        for seg in prims.iter() {
            bounds.extend(&seg.bounds());
        }
        return OrientedBox::new(Mat3::IDENTITY, bounds);
    }

    OrientedBox::new(best_space, best_bounds)
}
