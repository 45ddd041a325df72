//! Traversal context
//!
//! What a rig sees while a scheduler visits it: the traversal number of the
//! current pass, the ancestor path from the scene root down to (and
//! including) the visited node, and the node and skeleton stores.
//!
//! Path matrices are built from the cached local matrices, so the transform
//! system must have run for the current frame (see
//! [`Scene::update_matrix_world`](crate::scene::Scene::update_matrix_world)).

use glam::Affine3A;
use slotmap::SlotMap;

use crate::scene::node::Node;
use crate::scene::skeleton::Skeleton;
use crate::scene::{NodeHandle, SkeletonKey};

pub struct TraversalContext<'a> {
    /// Monotonically increasing id of the current pass.
    pub traversal_number: u64,
    /// Ancestor chain, root first, visited node last.
    pub path: &'a [NodeHandle],
    pub nodes: &'a mut SlotMap<NodeHandle, Node>,
    pub skeletons: &'a mut SlotMap<SkeletonKey, Skeleton>,
}

impl<'a> TraversalContext<'a> {
    pub fn new(
        traversal_number: u64,
        path: &'a [NodeHandle],
        nodes: &'a mut SlotMap<NodeHandle, Node>,
        skeletons: &'a mut SlotMap<SkeletonKey, Skeleton>,
    ) -> Self {
        Self {
            traversal_number,
            path,
            nodes,
            skeletons,
        }
    }

    /// The node being visited.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<NodeHandle> {
        self.path.last().copied()
    }

    #[must_use]
    pub fn local_to_world(&self) -> Affine3A {
        compute_local_to_world(self.path, self.nodes)
    }

    #[must_use]
    pub fn world_to_local(&self) -> Affine3A {
        compute_world_to_local(self.path, self.nodes)
    }
}

/// Product of the local matrices along `path`, root first.
///
/// Maps the last node's local space into the space above the first node.
/// Stale handles contribute identity.
#[must_use]
pub fn compute_local_to_world(path: &[NodeHandle], nodes: &SlotMap<NodeHandle, Node>) -> Affine3A {
    path.iter()
        .filter_map(|&handle| nodes.get(handle))
        .fold(Affine3A::IDENTITY, |acc, node| {
            acc * *node.transform.local_matrix()
        })
}

/// Inverse of [`compute_local_to_world`].
#[must_use]
pub fn compute_world_to_local(path: &[NodeHandle], nodes: &SlotMap<NodeHandle, Node>) -> Affine3A {
    compute_local_to_world(path, nodes).inverse()
}

/// Marks `handle` and its ancestors as needing a bound recomputation.
///
/// Stops at the first node that is already dirty: a dirty node's ancestors
/// are dirty too, since every clean bound was computed from clean children.
pub fn dirty_bound(nodes: &mut SlotMap<NodeHandle, Node>, handle: NodeHandle) {
    let mut current = Some(handle);
    while let Some(h) = current {
        let Some(node) = nodes.get_mut(h) else {
            break;
        };
        if node.bound_dirty {
            break;
        }
        node.bound_dirty = true;
        current = node.parent;
    }
}
