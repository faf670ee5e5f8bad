//! Post-build tree statistics, for logs and sanity checks.

use std::fmt;

use crate::bvh::{Bvh, NodeKind, NodeRef, BRANCHING_FACTOR};

/// Node and leaf counts gathered by walking a finished tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub aligned_nodes: usize,
    pub unaligned_nodes: usize,
    pub leaves: usize,
    pub leaf_refs: usize,
    pub max_depth: usize,
}

impl BvhStats {
    /// Walks the tree from the root.
    pub fn collect(bvh: &Bvh) -> Self {
        let mut stats = Self::default();
        if !bvh.root.is_empty() {
            stats.visit(bvh, bvh.root, 1);
        }
        stats
    }

    fn visit(&mut self, bvh: &Bvh, node: NodeRef, depth: usize) {
        self.max_depth = self.max_depth.max(depth);
        match node.kind() {
            NodeKind::Empty => {}
            NodeKind::Leaf { count, .. } => {
                self.leaves += 1;
                self.leaf_refs += count;
            }
            NodeKind::Aligned(index) => {
                self.aligned_nodes += 1;
                let node = bvh.aligned_node(index);
                for i in 0..BRANCHING_FACTOR {
                    let child = node.child(i);
                    if !child.is_empty() {
                        self.visit(bvh, child, depth + 1);
                    }
                }
            }
            NodeKind::Unaligned(index) => {
                self.unaligned_nodes += 1;
                let node = bvh.unaligned_node(index);
                for i in 0..BRANCHING_FACTOR {
                    let child = node.child(i);
                    if !child.is_empty() {
                        self.visit(bvh, child, depth + 1);
                    }
                }
            }
        }
    }
}

impl fmt::Display for BvhStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let avg_fill = if self.leaves > 0 {
            self.leaf_refs as f64 / self.leaves as f64
        } else {
            0.0
        };
        write!(
            f,
            "hair BVH: {} aligned nodes, {} unaligned nodes, {} leaves \
             ({} refs, {:.1} avg fill), depth {}",
            self.aligned_nodes,
            self.unaligned_nodes,
            self.leaves,
            self.leaf_refs,
            avg_fill,
            self.max_depth
        )
    }
}
