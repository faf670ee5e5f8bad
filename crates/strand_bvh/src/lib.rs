//! Strand BVH - hair acceleration structure construction
//!
//! Builds a four-wide bounding-volume hierarchy over cubic Bézier hair
//! curves. Interior nodes come in two kinds: axis-aligned nodes with four
//! world-space child boxes, and oriented nodes whose children carry their
//! own orthonormal frame so long thin strands bound tightly. Split
//! selection at every node compares up to four heuristics by surface-area
//! cost: axis-aligned object binning, axis-aligned spatial splits with
//! budgeted primitive duplication, object binning in the node's local
//! frame, and two-cluster splits by strand direction.
//!
//! Construction is from scratch and single shot; traversal lives with the
//! renderer that consumes the [`Bvh`].

mod arena;
mod builder;
mod bvh;
mod curve;
mod fallback_split;
mod object_partition;
mod oriented_fit;
mod prim_info;
mod ref_list;
mod settings;
mod spatial_split;
mod stats;
mod strand_split;
mod task;

pub use builder::{build, build_with_pool};
pub use bvh::{
    AlignedNode, Bvh, CurveIndex, LeafData, LeafLayout, NodeKind, NodeRef, UnalignedNode,
    BRANCHING_FACTOR, INT_COST, MAX_BUILD_DEPTH, MAX_LEAF_SIZE, TRAV_COST_ALIGNED,
    TRAV_COST_UNALIGNED,
};
pub use curve::CurveSegment;
pub use prim_info::PrimInfo;
pub use ref_list::{BlockAllocator, RefList};
pub use settings::{BuildSettings, ParseSettingsError};
pub use stats::BvhStats;
pub use task::{RayonPool, SerialPool, WorkerPool};

/// Re-export common math types from strand_math
pub use strand_math::{Aabb, Mat3, OrientedBox, Vec3, Vec4};
