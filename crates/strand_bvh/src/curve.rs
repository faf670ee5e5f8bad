//! Curve segment references, the primitives the hierarchy is built over.

use strand_core::CurveVertex;
use strand_math::{Aabb, Mat3, Vec3, Vec4};

/// A cubic Bézier segment over a parameter window of a source curve.
///
/// Control points pack position in xyz and hair radius in w. The segment
/// covers `[t0, t1]` of the curve identified by `(geom_id, prim_id)`; the
/// control points are always the exact curve restricted to that window,
/// so the control polygon bounds the geometry up to radius padding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveSegment {
    pub p0: Vec4,
    pub p1: Vec4,
    pub p2: Vec4,
    pub p3: Vec4,
    pub t0: f32,
    pub t1: f32,
    pub geom_id: u32,
    pub prim_id: u32,
}

impl CurveSegment {
    pub fn new(
        p0: Vec4,
        p1: Vec4,
        p2: Vec4,
        p3: Vec4,
        t0: f32,
        t1: f32,
        geom_id: u32,
        prim_id: u32,
    ) -> Self {
        debug_assert!(t0 < t1);
        Self {
            p0,
            p1,
            p2,
            p3,
            t0,
            t1,
            geom_id,
            prim_id,
        }
    }

    /// Builds the full-range segment of a source curve.
    pub fn from_vertices(control: [CurveVertex; 4], geom_id: u32, prim_id: u32) -> Self {
        let pack = |v: CurveVertex| v.position.extend(v.radius);
        Self::new(
            pack(control[0]),
            pack(control[1]),
            pack(control[2]),
            pack(control[3]),
            0.0,
            1.0,
            geom_id,
            prim_id,
        )
    }

    fn max_radius(&self) -> f32 {
        self.p0.w.max(self.p1.w).max(self.p2.w).max(self.p3.w)
    }

    /// World-space box of the control polygon, padded by the largest radius.
    pub fn bounds(&self) -> Aabb {
        let mut b = Aabb::empty();
        b.grow(self.p0.truncate());
        b.grow(self.p1.truncate());
        b.grow(self.p2.truncate());
        b.grow(self.p3.truncate());
        b.enlarge(self.max_radius())
    }

    /// Control-polygon box in a local frame, padded by the largest radius.
    ///
    /// `space` must be a rotation; radius padding is rotation invariant.
    pub fn bounds_in(&self, space: &Mat3) -> Aabb {
        let mut b = Aabb::empty();
        b.grow(*space * self.p0.truncate());
        b.grow(*space * self.p1.truncate());
        b.grow(*space * self.p2.truncate());
        b.grow(*space * self.p3.truncate());
        b.enlarge(self.max_radius())
    }

    /// Centroid of the world-space bounds.
    pub fn center(&self) -> Vec3 {
        self.bounds().centroid()
    }

    /// Chord from the first to the last control point.
    pub fn direction(&self) -> Vec3 {
        (self.p3 - self.p0).truncate()
    }

    /// Evaluates position and radius at curve parameter `u` in [0, 1]
    /// of this segment's window.
    pub fn eval(&self, u: f32) -> Vec4 {
        let t = 1.0 - u;
        self.p0 * (t * t * t)
            + self.p1 * (3.0 * t * t * u)
            + self.p2 * (3.0 * t * u * u)
            + self.p3 * (u * u * u)
    }

    /// De Casteljau split into two halves at the parameter midpoint.
    pub fn subdivide(&self) -> (CurveSegment, CurveSegment) {
        let p00 = self.p0;
        let p01 = self.p1;
        let p02 = self.p2;
        let p03 = self.p3;

        let p10 = 0.5 * (p00 + p01);
        let p11 = 0.5 * (p01 + p02);
        let p12 = 0.5 * (p02 + p03);
        let p20 = 0.5 * (p10 + p11);
        let p21 = 0.5 * (p11 + p12);
        let p30 = 0.5 * (p20 + p21);

        let tc = 0.5 * (self.t0 + self.t1);
        let left = CurveSegment::new(p00, p10, p20, p30, self.t0, tc, self.geom_id, self.prim_id);
        let right = CurveSegment::new(p30, p21, p12, p03, tc, self.t1, self.geom_id, self.prim_id);
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> CurveSegment {
        CurveSegment::new(
            Vec4::new(0.0, 0.0, 0.0, 0.1),
            Vec4::new(1.0, 2.0, 0.0, 0.1),
            Vec4::new(2.0, 2.0, 1.0, 0.2),
            Vec4::new(3.0, 0.0, 1.0, 0.1),
            0.0,
            1.0,
            7,
            3,
        )
    }

    #[test]
    fn test_bounds_pad_by_max_radius() {
        let b = segment().bounds();

        assert_eq!(b.x.min, -0.2);
        assert_eq!(b.x.max, 3.2);
        assert_eq!(b.y.min, -0.2);
        assert_eq!(b.y.max, 2.2);
    }

    #[test]
    fn test_bounds_in_identity_matches_world() {
        let seg = segment();
        assert_eq!(seg.bounds_in(&Mat3::IDENTITY), seg.bounds());
    }

    #[test]
    fn test_bounds_enclose_curve_samples() {
        let seg = segment();
        let b = seg.bounds();
        for i in 0..=16 {
            let p = seg.eval(i as f32 / 16.0);
            assert!(b.x.contains(p.x) && b.y.contains(p.y) && b.z.contains(p.z));
        }
    }

    #[test]
    fn test_subdivide_halves_parameter_window() {
        let (l, r) = segment().subdivide();

        assert_eq!((l.t0, l.t1), (0.0, 0.5));
        assert_eq!((r.t0, r.t1), (0.5, 1.0));
        assert_eq!(l.geom_id, 7);
        assert_eq!(r.prim_id, 3);

        // The halves meet at the curve midpoint.
        let mid = segment().eval(0.5);
        assert!((l.p3 - mid).length() < 1e-6);
        assert!((r.p0 - mid).length() < 1e-6);
    }

    #[test]
    fn test_subdivide_preserves_endpoints() {
        let seg = segment();
        let (l, r) = seg.subdivide();

        assert_eq!(l.p0, seg.p0);
        assert_eq!(r.p3, seg.p3);

        // Left half evaluated at its end equals the original at 0.25.
        let quarter = seg.eval(0.25);
        assert!((l.eval(0.5) - quarter).length() < 1e-5);
    }

    #[test]
    fn test_direction_is_chord() {
        assert_eq!(segment().direction(), Vec3::new(3.0, 0.0, 1.0));
    }
}
