//! Top-level hair BVH construction.
//!
//! The driver flattens the scene's enabled curve sets into an initial
//! reference list (optionally presubdividing each curve), then drives a
//! task-per-subtree build: workers repeatedly pull the largest pending
//! subtree, pick the cheapest enabled split for it, and either queue the
//! resulting children or, below a size threshold, finish the subtree
//! recursively on the spot.

use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::time::Instant;

use strand_core::{Geometry, Scene};
use strand_math::{Aabb, Mat3, OrientedBox};

use crate::arena::Arena;
use crate::bvh::{
    AlignedNode, Bvh, ChildSlotRef, CurveIndex, LeafData, LeafLayout, NodeRef, UnalignedNode,
    BRANCHING_FACTOR, INT_COST, MAX_BUILD_DEPTH, MAX_LEAF_SIZE, MIN_LEAF_SIZE, TRAV_COST_ALIGNED,
    TRAV_COST_UNALIGNED,
};
use crate::curve::CurveSegment;
use crate::fallback_split::fallback_split;
use crate::object_partition::ObjectSplit;
use crate::oriented_fit::fit_oriented_bounds;
use crate::prim_info::PrimInfo;
use crate::ref_list::{BlockAllocator, RefList};
use crate::settings::BuildSettings;
use crate::spatial_split::SpatialSplit;
use crate::stats::BvhStats;
use crate::strand_split::StrandSplit;
use crate::task::{BuildTask, ChildSlot, RayonPool, TaskQueue, WorkerPool};

/// Subtrees smaller than this are finished recursively by the worker
/// that popped them instead of going back through the queue.
const SEQUENTIAL_THRESHOLD: usize = 512;

/// Emitted-reference count between progress log lines.
const PROGRESS_INTERVAL: usize = 10_000;

/// Builds a hair BVH over every enabled curve set in the scene, using
/// rayon's thread pool.
pub fn build(scene: &Scene, settings: &BuildSettings) -> Bvh {
    build_with_pool(scene, settings, &RayonPool, rayon::current_num_threads())
}

/// Builds a hair BVH with an explicit worker pool and thread count.
pub fn build_with_pool(
    scene: &Scene,
    settings: &BuildSettings,
    pool: &dyn WorkerPool,
    thread_count: usize,
) -> Bvh {
    let thread_count = thread_count.max(1);
    let num_source_curves = scene.num_curves();
    let num_declared = num_source_curves << settings.presubdivision_depth;
    if num_declared == 0 {
        return empty_bvh(settings.leaf_layout, 0, 0);
    }

    let replications = (settings.replication_factor * num_declared as f64) as usize;
    let state = BuildState::new(scene, settings, thread_count, num_declared, replications);

    // Flatten enabled curve sets into the initial reference list.
    let start = Instant::now();
    let mut prims = RefList::new();
    let mut bounds = Aabb::EMPTY;
    let mut num_vertices = 0;
    for (geom_id, geometry) in scene.iter().enumerate() {
        let Some(set) = geometry.as_curves() else {
            continue;
        };
        if !set.enabled {
            continue;
        }
        num_vertices += set.num_vertices();
        for prim_id in 0..set.num_curves() {
            let seg = CurveSegment::from_vertices(
                set.curve_vertices(prim_id),
                geom_id as u32,
                prim_id as u32,
            );
            let seg_bounds = subdivide_and_add(
                &state.alloc,
                &mut prims,
                seg,
                settings.presubdivision_depth,
                0,
            );
            bounds.extend(&seg_bounds);
        }
    }

    let pinfo = PrimInfo::from_list(&prims);
    if pinfo.size() == 0 {
        return empty_bvh(settings.leaf_layout, num_source_curves, 0);
    }
    log::debug!(
        "building hair BVH over {} references from {} curves on {} threads",
        pinfo.size(),
        num_source_curves,
        thread_count
    );

    state.queue.push(BuildTask {
        dst: ChildSlot::Root,
        depth: 0,
        pinfo,
        prims,
        bounds: OrientedBox::axis_aligned(pinfo.geom_bounds),
    });
    pool.execute(thread_count, &|thread_index, _thread_count| {
        state.worker(thread_index)
    });

    let elapsed = start.elapsed();
    let bvh = state.into_bvh(bounds, num_source_curves, num_vertices);
    log::debug!(
        "built hair BVH in {:.1}ms ({:.2} Mprim/s)",
        elapsed.as_secs_f64() * 1e3,
        num_declared as f64 / elapsed.as_secs_f64() * 1e-6
    );
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("{}", BvhStats::collect(&bvh));
    }
    bvh
}

fn empty_bvh(layout: LeafLayout, num_primitives: usize, num_vertices: usize) -> Bvh {
    Bvh {
        root: NodeRef::EMPTY,
        bounds: Aabb::EMPTY,
        num_primitives,
        num_vertices,
        aligned: Vec::new(),
        unaligned: Vec::new(),
        leaves: match layout {
            LeafLayout::Inline => LeafData::Inline(Vec::new()),
            LeafLayout::Indexed => LeafData::Indexed(Vec::new()),
        },
    }
}

/// Inserts `seg` after `depth` rounds of two-way subdivision, returning
/// the union of the inserted bounds.
fn subdivide_and_add(
    alloc: &BlockAllocator,
    prims: &mut RefList,
    seg: CurveSegment,
    depth: usize,
    thread_index: usize,
) -> Aabb {
    if depth == 0 {
        let bounds = seg.bounds();
        prims.push(seg, alloc, thread_index);
        return bounds;
    }
    let (a, b) = seg.subdivide();
    let ba = subdivide_and_add(alloc, prims, a, depth - 1, thread_index);
    let bb = subdivide_and_add(alloc, prims, b, depth - 1, thread_index);
    Aabb::surrounding(&ba, &bb)
}

/// One child slot of the node being assembled.
struct Child {
    prims: RefList,
    pinfo: PrimInfo,
    bounds: OrientedBox,
    splittable: bool,
}

impl Default for Child {
    fn default() -> Self {
        Self {
            prims: RefList::new(),
            pinfo: PrimInfo::empty(),
            bounds: OrientedBox::EMPTY,
            splittable: false,
        }
    }
}

enum SplitOutcome {
    Partitioned {
        left: (RefList, PrimInfo),
        right: (RefList, PrimInfo),
    },
    /// No heuristic can distinguish the references; the caller keeps the
    /// set whole.
    Unsplittable(RefList),
}

enum LeafArena {
    Inline(Arena<CurveSegment>),
    Indexed(Arena<CurveIndex>),
}

/// Everything the workers share during one build.
struct BuildState<'a> {
    scene: &'a Scene,
    settings: &'a BuildSettings,
    alloc: BlockAllocator,
    queue: TaskQueue,
    aligned: Arena<AlignedNode>,
    unaligned: Arena<UnalignedNode>,
    leaves: LeafArena,
    root: ChildSlotRef,
    remaining_replications: AtomicIsize,
    generated_prims: AtomicUsize,
}

impl<'a> BuildState<'a> {
    fn new(
        scene: &'a Scene,
        settings: &'a BuildSettings,
        thread_count: usize,
        num_declared: usize,
        replications: usize,
    ) -> Self {
        // Spatial splits pay for every duplicate out of the replication
        // budget, so the reference count never exceeds this.
        let max_refs = num_declared + replications;
        // Every leaf holds at least one reference and every interior node
        // has at least two children, so max_refs bounds both node arenas.
        let node_capacity = max_refs + 1;
        Self {
            scene,
            settings,
            alloc: BlockAllocator::new(thread_count),
            queue: TaskQueue::new(),
            aligned: Arena::with_capacity(node_capacity),
            unaligned: Arena::with_capacity(node_capacity),
            leaves: match settings.leaf_layout {
                LeafLayout::Inline => LeafArena::Inline(Arena::with_capacity(max_refs)),
                LeafLayout::Indexed => LeafArena::Indexed(Arena::with_capacity(max_refs)),
            },
            root: ChildSlotRef::default(),
            remaining_replications: AtomicIsize::new(replications as isize),
            generated_prims: AtomicUsize::new(0),
        }
    }

    fn worker(&self, thread_index: usize) {
        while let Some(task) = self.queue.pop() {
            if task.pinfo.size() < SEQUENTIAL_THRESHOLD {
                self.queue.finish();
                self.recurse(thread_index, task);
            } else {
                let children = self.process_task(thread_index, task);
                self.queue.finish_into(children);
            }
        }
    }

    fn recurse(&self, thread_index: usize, task: BuildTask) {
        for child in self.process_task(thread_index, task) {
            self.recurse(thread_index, child);
        }
    }

    /// Builds one node: splits the widest child until four children
    /// exist or nothing is worth splitting, then emits the node and one
    /// task per child.
    fn process_task(&self, thread_index: usize, task: BuildTask) -> Vec<BuildTask> {
        let BuildTask {
            dst,
            depth,
            pinfo,
            prims,
            bounds,
        } = task;

        if pinfo.size() <= MIN_LEAF_SIZE || depth >= MAX_BUILD_DEPTH {
            let leaf = self.emit_leaf(thread_index, prims);
            self.link(dst, leaf);
            return Vec::new();
        }

        let mut is_aligned = true;
        let mut children = Vec::with_capacity(BRANCHING_FACTOR);
        children.push(Child {
            prims,
            pinfo,
            bounds,
            splittable: true,
        });

        while children.len() < BRANCHING_FACTOR {
            // Split the splittable child with the largest bounds.
            let mut best = None;
            let mut best_area = f32::NEG_INFINITY;
            for (i, child) in children.iter().enumerate() {
                if !child.splittable || child.pinfo.size() <= MIN_LEAF_SIZE {
                    continue;
                }
                let area = child.bounds.bounds.half_area();
                if area > best_area {
                    best_area = area;
                    best = Some(i);
                }
            }
            let Some(best) = best else { break };

            let child = std::mem::take(&mut children[best]);
            let (child_pinfo, child_bounds) = (child.pinfo, child.bounds);
            match self.split(
                thread_index,
                child.prims,
                &child_bounds,
                &child_pinfo,
                &mut is_aligned,
            ) {
                SplitOutcome::Partitioned {
                    left: (lprims, linfo),
                    right: (rprims, rinfo),
                } => {
                    let lbounds = fit_oriented_bounds(&lprims);
                    let rbounds = fit_oriented_bounds(&rprims);
                    children[best] = Child {
                        prims: lprims,
                        pinfo: linfo,
                        bounds: lbounds,
                        splittable: true,
                    };
                    children.push(Child {
                        prims: rprims,
                        pinfo: rinfo,
                        bounds: rbounds,
                        splittable: true,
                    });
                }
                SplitOutcome::Unsplittable(prims) => {
                    if children.len() == 1 {
                        // Indistinguishable references: emit one leaf,
                        // truncating if oversized.
                        let leaf = self.emit_leaf(thread_index, prims);
                        self.link(dst, leaf);
                        return Vec::new();
                    }
                    // The set may have gained clipped pieces before the
                    // split was abandoned; refresh the aggregate.
                    children[best] = Child {
                        pinfo: PrimInfo::from_list(&prims),
                        prims,
                        bounds: child_bounds,
                        splittable: false,
                    };
                }
            }
        }

        let mut tasks = Vec::with_capacity(children.len());
        if is_aligned {
            let mut node = AlignedNode::new();
            for (i, child) in children.iter().enumerate() {
                node.set_child_bounds(i, child.pinfo.geom_bounds);
            }
            let index = self.aligned.push(node);
            self.link(dst, NodeRef::aligned(index));
            for (slot, child) in children.into_iter().enumerate() {
                tasks.push(BuildTask {
                    dst: ChildSlot::Aligned { node: index, slot },
                    depth: depth + 1,
                    pinfo: child.pinfo,
                    prims: child.prims,
                    bounds: child.bounds,
                });
            }
        } else {
            let mut node = UnalignedNode::new();
            for (i, child) in children.iter().enumerate() {
                node.set_child_bounds(i, child.bounds);
            }
            let index = self.unaligned.push(node);
            self.link(dst, NodeRef::unaligned(index));
            for (slot, child) in children.into_iter().enumerate() {
                tasks.push(BuildTask {
                    dst: ChildSlot::Unaligned { node: index, slot },
                    depth: depth + 1,
                    pinfo: child.pinfo,
                    prims: child.prims,
                    bounds: child.bounds,
                });
            }
        }
        tasks
    }

    /// Scores every enabled split kind and applies the cheapest.
    ///
    /// Candidates tie-break in a fixed order: aligned object, aligned
    /// spatial, oriented object, strand. Oriented and strand splits mark
    /// the node unaligned. When every candidate is infinite the set is
    /// median-split, unless all centroids coincide and no ordering
    /// exists.
    fn split(
        &self,
        thread_index: usize,
        prims: RefList,
        bounds: &OrientedBox,
        pinfo: &PrimInfo,
        is_aligned: &mut bool,
    ) -> SplitOutcome {
        let parent_area = bounds.bounds.half_area();
        let settings = self.settings;
        let mut best_sah = f32::INFINITY;

        let mut aligned_object = None;
        let mut aligned_object_sah = f32::INFINITY;
        if settings.aligned_object_splits {
            let split = ObjectSplit::find(&prims, &Mat3::IDENTITY);
            aligned_object_sah = TRAV_COST_ALIGNED * parent_area + INT_COST * split.sah;
            best_sah = best_sah.min(aligned_object_sah);
            aligned_object = Some(split);
        }

        let mut spatial = None;
        let mut spatial_sah = f32::INFINITY;
        let spatial_enabled = settings.aligned_spatial_splits
            && self.remaining_replications.load(Ordering::Acquire) > 0;
        if spatial_enabled {
            let split = SpatialSplit::find(&prims, pinfo);
            spatial_sah = TRAV_COST_ALIGNED * parent_area + INT_COST * split.sah;
            best_sah = best_sah.min(spatial_sah);
            spatial = Some(split);
        }

        let mut unaligned_object = None;
        let mut unaligned_object_sah = f32::INFINITY;
        if settings.unaligned_object_splits {
            let split = ObjectSplit::find(&prims, &bounds.space);
            unaligned_object_sah = TRAV_COST_UNALIGNED * parent_area + INT_COST * split.sah;
            best_sah = best_sah.min(unaligned_object_sah);
            unaligned_object = Some(split);
        }

        let mut strand = None;
        let mut strand_sah = f32::INFINITY;
        if settings.strand_splits {
            let split = StrandSplit::find(&prims);
            strand_sah = TRAV_COST_UNALIGNED * parent_area + INT_COST * split.sah;
            best_sah = best_sah.min(strand_sah);
            strand = Some(split);
        }

        if best_sah == f32::INFINITY {
            let cent = pinfo.cent_bounds;
            let coincident = cent.x.size() == 0.0 && cent.y.size() == 0.0 && cent.z.size() == 0.0;
            if coincident {
                return SplitOutcome::Unsplittable(prims);
            }
            let (left, right) = fallback_split(prims, pinfo, &self.alloc, thread_index);
            return SplitOutcome::Partitioned { left, right };
        }

        if best_sah == aligned_object_sah {
            let (left, right) = aligned_object
                .unwrap()
                .apply(prims, &self.alloc, thread_index);
            SplitOutcome::Partitioned { left, right }
        } else if best_sah == spatial_sah {
            let (left, right) = spatial.unwrap().apply(
                prims,
                &self.alloc,
                thread_index,
                &self.remaining_replications,
            );
            // Clipping assigns unresolved straddlers by centroid, so a
            // plane through coincident references can leave one side
            // empty; the set is then effectively indivisible.
            if left.1.size() == 0 {
                return SplitOutcome::Unsplittable(right.0);
            }
            if right.1.size() == 0 {
                return SplitOutcome::Unsplittable(left.0);
            }
            SplitOutcome::Partitioned { left, right }
        } else if best_sah == unaligned_object_sah {
            *is_aligned = false;
            let (left, right) = unaligned_object
                .unwrap()
                .apply(prims, &self.alloc, thread_index);
            SplitOutcome::Partitioned { left, right }
        } else if best_sah == strand_sah {
            *is_aligned = false;
            let (left, right) = strand.unwrap().apply(prims, &self.alloc, thread_index);
            SplitOutcome::Partitioned { left, right }
        } else {
            unreachable!("split dispatcher matched no candidate");
        }
    }

    /// Emits a leaf from `prims`, truncating oversized sets, and returns
    /// its encoded reference. All blocks go back to the allocator.
    fn emit_leaf(&self, thread_index: usize, mut prims: RefList) -> NodeRef {
        let total = prims.len();
        debug_assert!(total > 0);
        let count = total.min(MAX_LEAF_SIZE);
        if total > MAX_LEAF_SIZE {
            log::warn!(
                "leaf over capacity: dropping {} of {} curve references",
                total - count,
                total
            );
        }

        let previous = self.generated_prims.fetch_add(count, Ordering::Relaxed);
        if previous / PROGRESS_INTERVAL != (previous + count) / PROGRESS_INTERVAL {
            log::debug!("emitted {} curve references", previous + count);
        }

        let first = match &self.leaves {
            LeafArena::Inline(arena) => arena.push_iter(count, prims.iter().copied()),
            LeafArena::Indexed(arena) => {
                arena.push_iter(count, prims.iter().map(|seg| self.curve_index(seg)))
            }
        };
        prims.release(&self.alloc, thread_index);
        NodeRef::leaf(first, count)
    }

    fn curve_index(&self, seg: &CurveSegment) -> CurveIndex {
        let set = self
            .scene
            .get(seg.geom_id as usize)
            .and_then(Geometry::as_curves)
            .unwrap_or_else(|| panic!("leaf references unknown geometry {}", seg.geom_id));
        CurveIndex {
            vertex_offset: set.curve_offset(seg.prim_id as usize) as u32,
            geom_id: seg.geom_id,
            prim_id: seg.prim_id,
        }
    }

    fn link(&self, dst: ChildSlot, child: NodeRef) {
        match dst {
            ChildSlot::Root => self.root.set(child),
            ChildSlot::Aligned { node, slot } => self.aligned.get(node).link_child(slot, child),
            ChildSlot::Unaligned { node, slot } => self.unaligned.get(node).link_child(slot, child),
        }
    }

    fn into_bvh(self, bounds: Aabb, num_primitives: usize, num_vertices: usize) -> Bvh {
        let root = self.root.get();
        let leaves = match self.leaves {
            LeafArena::Inline(arena) => LeafData::Inline(arena.into_vec()),
            LeafArena::Indexed(arena) => LeafData::Indexed(arena.into_vec()),
        };
        Bvh {
            root,
            bounds,
            num_primitives,
            // Vertex indirection is only meaningful for indexed leaves.
            num_vertices: if matches!(leaves, LeafData::Indexed(_)) {
                num_vertices
            } else {
                0
            },
            aligned: self.aligned.into_vec(),
            unaligned: self.unaligned.into_vec(),
            leaves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::NodeKind;
    use crate::stats::BvhStats;
    use crate::task::SerialPool;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use strand_core::{BezierCurveSet, CurveVertex};
    use strand_math::{is_orthonormal, Vec3};

    fn curve_scene(curves: &[[Vec3; 4]], radius: f32) -> Scene {
        let mut set = BezierCurveSet::new("hair");
        for c in curves {
            set.push_curve([
                CurveVertex::new(c[0], radius),
                CurveVertex::new(c[1], radius),
                CurveVertex::new(c[2], radius),
                CurveVertex::new(c[3], radius),
            ]);
        }
        let mut scene = Scene::new();
        scene.add_geometry(Geometry::BezierCurves(set));
        scene
    }

    fn x_line(x0: f32, y: f32, z: f32) -> [Vec3; 4] {
        [
            Vec3::new(x0, y, z),
            Vec3::new(x0 + 1.0, y, z),
            Vec3::new(x0 + 2.0, y, z),
            Vec3::new(x0 + 3.0, y, z),
        ]
    }

    fn random_scene(n: usize, seed: u64) -> Scene {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut curves = Vec::with_capacity(n);
        for _ in 0..n {
            let origin = Vec3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
            let dir = Vec3::new(
                rng.gen_range(-1.0..1.0f32),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
            .try_normalize()
            .unwrap_or(Vec3::X);
            let bend = Vec3::new(
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.2..0.2),
                rng.gen_range(-0.2..0.2),
            );
            curves.push([
                origin,
                origin + dir * 0.5 + bend,
                origin + dir * 1.0 - bend,
                origin + dir * 1.5,
            ]);
        }
        curve_scene(&curves, 0.01)
    }

    fn serial(scene: &Scene, settings: &BuildSettings) -> Bvh {
        build_with_pool(scene, settings, &SerialPool, 1)
    }

    fn no_splits() -> BuildSettings {
        BuildSettings {
            aligned_object_splits: false,
            aligned_spatial_splits: false,
            unaligned_object_splits: false,
            strand_splits: false,
            ..BuildSettings::default()
        }
    }

    fn visit_leaves(bvh: &Bvh, node: NodeRef, out: &mut Vec<(usize, usize)>) {
        match node.kind() {
            NodeKind::Empty => {}
            NodeKind::Leaf { first, count } => out.push((first, count)),
            NodeKind::Aligned(index) => {
                for i in 0..BRANCHING_FACTOR {
                    let child = bvh.aligned_node(index).child(i);
                    if !child.is_empty() {
                        visit_leaves(bvh, child, out);
                    }
                }
            }
            NodeKind::Unaligned(index) => {
                for i in 0..BRANCHING_FACTOR {
                    let child = bvh.unaligned_node(index).child(i);
                    if !child.is_empty() {
                        visit_leaves(bvh, child, out);
                    }
                }
            }
        }
    }

    /// Sorted multiset of (geom, prim, t0, t1) over all leaf references.
    fn leaf_keys(bvh: &Bvh) -> Vec<(u32, u32, u32, u32)> {
        let mut ranges = Vec::new();
        if !bvh.root.is_empty() {
            visit_leaves(bvh, bvh.root, &mut ranges);
        }
        let mut keys = Vec::new();
        for (first, count) in ranges {
            for seg in bvh.leaf_curves(first, count).unwrap() {
                keys.push((seg.geom_id, seg.prim_id, seg.t0.to_bits(), seg.t1.to_bits()));
            }
        }
        keys.sort_unstable();
        keys
    }

    fn subtree_segments(bvh: &Bvh, node: NodeRef, out: &mut Vec<CurveSegment>) {
        let mut ranges = Vec::new();
        visit_leaves(bvh, node, &mut ranges);
        for (first, count) in ranges {
            out.extend_from_slice(bvh.leaf_curves(first, count).unwrap());
        }
    }

    /// Checks the structural invariants of a finished tree.
    fn check_tree(bvh: &Bvh, node: NodeRef) {
        const TOL: f32 = 1e-3;
        match node.kind() {
            NodeKind::Empty => panic!("empty reference reached through a node"),
            NodeKind::Leaf { count, .. } => {
                assert!((1..=MAX_LEAF_SIZE).contains(&count));
            }
            NodeKind::Aligned(index) => {
                let n = bvh.aligned_node(index);
                let used = (0..BRANCHING_FACTOR)
                    .filter(|&i| !n.child(i).is_empty())
                    .count();
                assert!(used >= 2, "aligned node with {} children", used);
                for i in 0..BRANCHING_FACTOR {
                    let child = n.child(i);
                    if child.is_empty() {
                        continue;
                    }
                    let mut segs = Vec::new();
                    subtree_segments(&bvh, child, &mut segs);
                    for seg in &segs {
                        assert!(
                            n.child_bounds(i).contains_box(&seg.bounds(), TOL),
                            "aligned child bounds miss a reachable curve"
                        );
                    }
                    check_tree(bvh, child);
                }
            }
            NodeKind::Unaligned(index) => {
                let n = bvh.unaligned_node(index);
                let used = (0..BRANCHING_FACTOR)
                    .filter(|&i| !n.child(i).is_empty())
                    .count();
                assert!(used >= 2, "unaligned node with {} children", used);
                for i in 0..BRANCHING_FACTOR {
                    let child = n.child(i);
                    if child.is_empty() {
                        continue;
                    }
                    let oriented = n.child_bounds(i);
                    assert!(is_orthonormal(&oriented.space, 1e-5));
                    let mut segs = Vec::new();
                    subtree_segments(&bvh, child, &mut segs);
                    for seg in &segs {
                        assert!(
                            oriented
                                .bounds
                                .contains_box(&seg.bounds_in(&oriented.space), TOL),
                            "oriented child bounds miss a reachable curve"
                        );
                    }
                    check_tree(bvh, child);
                }
            }
        }
    }

    #[test]
    fn test_empty_scene() {
        let bvh = serial(&Scene::new(), &BuildSettings::default());

        assert!(bvh.root.is_empty());
        assert!(bvh.bounds.is_empty());
        assert_eq!(bvh.num_primitives, 0);
        assert!(bvh.leaves().is_empty());
    }

    #[test]
    fn test_single_curve_becomes_root_leaf() {
        let scene = curve_scene(&[x_line(0.0, 0.0, 0.0)], 0.1);
        let bvh = serial(&scene, &BuildSettings::default());

        match bvh.root.kind() {
            NodeKind::Leaf { first, count } => {
                assert_eq!(count, 1);
                let seg = &bvh.leaf_curves(first, count).unwrap()[0];
                assert_eq!((seg.geom_id, seg.prim_id), (0, 0));
                assert_eq!((seg.t0, seg.t1), (0.0, 1.0));
            }
            other => panic!("expected leaf root, got {:?}", other),
        }

        // Bounds enclose all four control points plus radius.
        assert!(bvh.bounds.x.contains(0.0) && bvh.bounds.x.contains(3.0));
        assert_eq!(bvh.bounds.x.min, -0.1);
        assert_eq!(bvh.bounds.x.max, 3.1);
    }

    #[test]
    fn test_colinear_curves_prefer_oriented_root() {
        // Two curves on the same X-aligned line; only oriented object
        // splits are enabled.
        let scene = curve_scene(&[x_line(0.0, 0.0, 0.0), x_line(4.0, 0.0, 0.0)], 0.05);
        let settings = BuildSettings {
            unaligned_object_splits: true,
            ..no_splits()
        };
        let bvh = serial(&scene, &settings);

        let NodeKind::Unaligned(index) = bvh.root.kind() else {
            panic!("expected oriented root, got {:?}", bvh.root.kind());
        };
        let node = bvh.unaligned_node(index);
        for i in 0..BRANCHING_FACTOR {
            if node.child(i).is_empty() {
                continue;
            }
            let oriented = node.child_bounds(i);
            assert!(is_orthonormal(&oriented.space, 1e-5));

            // The strand direction maps onto the local Z axis, leaving
            // only radius-sized extents transversally.
            let local_x = oriented.space * Vec3::X;
            assert!((local_x.z.abs() - 1.0).abs() < 1e-4);
            assert!(oriented.bounds.x.size() < 0.15);
            assert!(oriented.bounds.y.size() < 0.15);
        }
    }

    #[test]
    fn test_perpendicular_strands_split_by_direction() {
        let x_curve = x_line(0.0, 0.0, 0.0);
        let y_curve = [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(0.0, 2.0, 1.0),
            Vec3::new(0.0, 3.0, 1.0),
        ];
        let scene = curve_scene(&[x_curve, y_curve], 0.05);
        let settings = BuildSettings {
            strand_splits: true,
            ..no_splits()
        };
        let bvh = serial(&scene, &settings);

        let NodeKind::Unaligned(index) = bvh.root.kind() else {
            panic!("expected oriented root, got {:?}", bvh.root.kind());
        };
        let node = bvh.unaligned_node(index);

        let mut seen = 0;
        for i in 0..BRANCHING_FACTOR {
            let child = node.child(i);
            if child.is_empty() {
                continue;
            }
            seen += 1;
            let mut segs = Vec::new();
            subtree_segments(&bvh, child, &mut segs);
            assert_eq!(segs.len(), 1);

            // Each child frame is aligned with its own strand.
            let dir = segs[0].direction().normalize();
            let local = node.child_bounds(i).space * dir;
            assert!((local.z.abs() - 1.0).abs() < 1e-4);
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_zero_replication_never_duplicates() {
        let scene = random_scene(200, 7);
        let settings = BuildSettings {
            aligned_object_splits: true,
            aligned_spatial_splits: true,
            replication_factor: 0.0,
            ..no_splits()
        };
        let bvh = serial(&scene, &settings);

        let stats = BvhStats::collect(&bvh);
        assert_eq!(stats.leaf_refs, 200);
        assert_eq!(stats.unaligned_nodes, 0);
        assert_eq!(bvh.num_unaligned_nodes(), 0);
    }

    #[test]
    fn test_coincident_curves_truncate_to_one_leaf() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        let curves = vec![[p, p, p, p]; 2 * MAX_LEAF_SIZE];
        let scene = curve_scene(&curves, 0.1);
        let bvh = serial(&scene, &BuildSettings::default());

        match bvh.root.kind() {
            NodeKind::Leaf { count, .. } => assert_eq!(count, MAX_LEAF_SIZE),
            other => panic!("expected leaf root, got {:?}", other),
        }
        let stats = BvhStats::collect(&bvh);
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.leaf_refs, MAX_LEAF_SIZE);
    }

    #[test]
    fn test_repeated_builds_are_identical() {
        let scene = random_scene(300, 11);
        let settings = BuildSettings::default();

        let a = leaf_keys(&serial(&scene, &settings));
        let b = leaf_keys(&serial(&scene, &settings));

        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_build_matches_serial() {
        // Without spatial splits every split decision is a pure function
        // of its subtree, so thread count cannot change leaf contents.
        let scene = random_scene(600, 23);
        let settings = BuildSettings {
            aligned_spatial_splits: false,
            ..BuildSettings::default()
        };

        let serial_keys = leaf_keys(&serial(&scene, &settings));
        let parallel_keys = leaf_keys(&build_with_pool(&scene, &settings, &RayonPool, 4));

        assert_eq!(serial_keys, parallel_keys);
    }

    #[test]
    fn test_tree_invariants_hold() {
        let n = 400;
        let scene = random_scene(n, 3);
        let settings = BuildSettings::default();
        let bvh = serial(&scene, &settings);

        check_tree(&bvh, bvh.root);

        let stats = BvhStats::collect(&bvh);
        assert!(stats.max_depth <= MAX_BUILD_DEPTH + 1);

        // Duplication stays within the replication budget.
        let budget = (settings.replication_factor * n as f64) as usize;
        assert!(stats.leaf_refs <= n + budget);
        assert!(stats.leaf_refs >= n);

        // The root bounds enclose every leaf curve.
        let mut segs = Vec::new();
        subtree_segments(&bvh, bvh.root, &mut segs);
        for seg in &segs {
            assert!(bvh.bounds.contains_box(&seg.bounds(), 1e-3));
        }
    }

    #[test]
    fn test_oriented_only_build_has_no_aligned_nodes() {
        let scene = random_scene(150, 41);
        let settings = BuildSettings {
            unaligned_object_splits: true,
            strand_splits: true,
            ..no_splits()
        };
        let bvh = serial(&scene, &settings);

        assert_eq!(bvh.num_aligned_nodes(), 0);
        assert!(bvh.num_unaligned_nodes() > 0);
    }

    #[test]
    fn test_indexed_leaves_resolve_through_scene() {
        let scene = random_scene(10, 5);
        let settings = BuildSettings {
            leaf_layout: LeafLayout::Indexed,
            ..BuildSettings::default()
        };
        let bvh = serial(&scene, &settings);

        assert_eq!(bvh.num_vertices, 40);

        let mut ranges = Vec::new();
        visit_leaves(&bvh, bvh.root, &mut ranges);
        let set = scene.get(0).and_then(Geometry::as_curves).unwrap();
        let mut prims_seen = Vec::new();
        for (first, count) in ranges {
            assert!(bvh.leaf_curves(first, count).is_none());
            for index in bvh.leaf_indices(first, count).unwrap() {
                assert_eq!(index.geom_id, 0);
                assert_eq!(
                    index.vertex_offset as usize,
                    set.curve_offset(index.prim_id as usize)
                );
                prims_seen.push(index.prim_id);
            }
        }
        prims_seen.sort_unstable();
        prims_seen.dedup();
        assert_eq!(prims_seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_disabled_geometry_is_skipped() {
        let mut scene = Scene::new();
        let mut enabled = BezierCurveSet::new("visible");
        for i in 0..3 {
            let c = x_line(4.0 * i as f32, 0.0, 0.0);
            enabled.push_curve([
                CurveVertex::new(c[0], 0.1),
                CurveVertex::new(c[1], 0.1),
                CurveVertex::new(c[2], 0.1),
                CurveVertex::new(c[3], 0.1),
            ]);
        }
        scene.add_geometry(Geometry::BezierCurves(enabled));

        let mut hidden = BezierCurveSet::new("hidden");
        let c = x_line(100.0, 0.0, 0.0);
        hidden.push_curve([
            CurveVertex::new(c[0], 0.1),
            CurveVertex::new(c[1], 0.1),
            CurveVertex::new(c[2], 0.1),
            CurveVertex::new(c[3], 0.1),
        ]);
        hidden.enabled = false;
        scene.add_geometry(Geometry::BezierCurves(hidden));

        let bvh = serial(&scene, &BuildSettings::default());

        // Declared count includes the hidden set, contents do not.
        assert_eq!(bvh.num_primitives, 4);
        let keys = leaf_keys(&bvh);
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|&(geom, _, _, _)| geom == 0));
        assert!(!bvh.bounds.x.contains(100.0));
    }

    #[test]
    fn test_presubdivision_splits_source_curves() {
        let scene = curve_scene(&[x_line(0.0, 0.0, 0.0)], 0.05);
        let settings = BuildSettings {
            presubdivision_depth: 2,
            ..BuildSettings::default()
        };
        let bvh = serial(&scene, &settings);

        let keys = leaf_keys(&bvh);
        assert_eq!(keys.len(), 4);
        let t0s: Vec<f32> = keys.iter().map(|k| f32::from_bits(k.2)).collect();
        assert_eq!(t0s, vec![0.0, 0.25, 0.5, 0.75]);

        // All pieces keep the source identity.
        assert!(keys.iter().all(|&(geom, prim, _, _)| geom == 0 && prim == 0));
    }

    #[test]
    fn test_default_pool_build() {
        let scene = random_scene(700, 17);
        let bvh = build(&scene, &BuildSettings::default());

        check_tree(&bvh, bvh.root);
        let stats = BvhStats::collect(&bvh);
        assert!(stats.leaf_refs >= 700);
    }
}
