//! Scene graph types for strand.
//!
//! This module defines the read-only geometry store consumed by the
//! acceleration-structure builders: sets of cubic Bézier hair curves,
//! addressed by geometry ID and per-curve vertex offsets.

use strand_math::Vec3;

/// A curve control vertex: a position with an associated hair radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveVertex {
    pub position: Vec3,
    pub radius: f32,
}

impl CurveVertex {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self { position, radius }
    }
}

/// A set of cubic Bézier curves sharing one vertex buffer.
///
/// Each curve is four consecutive control vertices starting at its
/// recorded offset. Offsets need not be contiguous, so curve sets
/// imported with shared or strided vertex layouts are representable.
#[derive(Clone, Debug)]
pub struct BezierCurveSet {
    /// Geometry name (from the importing asset)
    pub name: String,

    /// Disabled geometries are skipped by builders but keep their IDs.
    pub enabled: bool,

    vertices: Vec<CurveVertex>,
    offsets: Vec<u32>,
}

impl BezierCurveSet {
    /// Create an empty, enabled curve set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            vertices: Vec::new(),
            offsets: Vec::new(),
        }
    }

    /// Create a curve set from a prebuilt vertex buffer and curve offsets.
    ///
    /// Every offset must leave room for four control vertices.
    pub fn from_parts(name: impl Into<String>, vertices: Vec<CurveVertex>, offsets: Vec<u32>) -> Self {
        for &ofs in &offsets {
            assert!(
                ofs as usize + 4 <= vertices.len(),
                "curve offset {} exceeds vertex buffer of length {}",
                ofs,
                vertices.len()
            );
        }
        Self {
            name: name.into(),
            enabled: true,
            vertices,
            offsets,
        }
    }

    /// Append a curve given its four control vertices; returns its index.
    pub fn push_curve(&mut self, control: [CurveVertex; 4]) -> usize {
        let ofs = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&control);
        self.offsets.push(ofs);
        self.offsets.len() - 1
    }

    pub fn num_curves(&self) -> usize {
        self.offsets.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// First-vertex offset of curve `i`.
    pub fn curve_offset(&self, i: usize) -> usize {
        self.offsets[i] as usize
    }

    pub fn vertex(&self, i: usize) -> CurveVertex {
        self.vertices[i]
    }

    /// The four control vertices of curve `i`.
    pub fn curve_vertices(&self, i: usize) -> [CurveVertex; 4] {
        let ofs = self.curve_offset(i);
        [
            self.vertices[ofs],
            self.vertices[ofs + 1],
            self.vertices[ofs + 2],
            self.vertices[ofs + 3],
        ]
    }
}

/// A geometry in the scene.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Geometry {
    BezierCurves(BezierCurveSet),
}

impl Geometry {
    pub fn as_curves(&self) -> Option<&BezierCurveSet> {
        match self {
            Geometry::BezierCurves(set) => Some(set),
        }
    }
}

/// A complete scene: geometries indexed by geometry ID.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    geometries: Vec<Geometry>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a geometry to the scene and return its geometry ID.
    pub fn add_geometry(&mut self, geometry: Geometry) -> usize {
        self.geometries.push(geometry);
        self.geometries.len() - 1
    }

    /// Look up a geometry by ID.
    pub fn get(&self, geom_id: usize) -> Option<&Geometry> {
        self.geometries.get(geom_id)
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Geometry> {
        self.geometries.iter()
    }

    /// Total declared curve count across all curve sets, enabled or not.
    ///
    /// Builders size their allocations from this, then skip disabled sets
    /// while gathering primitives.
    pub fn num_curves(&self) -> usize {
        self.geometries
            .iter()
            .filter_map(Geometry::as_curves)
            .map(BezierCurveSet::num_curves)
            .sum()
    }
}
