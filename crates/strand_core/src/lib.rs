//! Core scene representation for the strand hair renderer.
//!
//! Defines the geometry containers the acceleration-structure builders
//! read from. The scene is immutable during a build.

mod scene;

pub use scene::{BezierCurveSet, CurveVertex, Geometry, Scene};
