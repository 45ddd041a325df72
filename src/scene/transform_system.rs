//! Transform System
//!
//! Propagates world matrices down the node hierarchy. Decoupled from
//! [`Scene`](crate::scene::Scene) so it only borrows the node store.
//!
//! The skinning core reads cached local matrices along the ancestor path, so
//! this must run before the rig passes of a frame.

use glam::Affine3A;
use slotmap::SlotMap;

use crate::scene::NodeHandle;
use crate::scene::node::Node;
use crate::scene::traversal;

/// Updates the world matrices of every node below `roots`.
///
/// Uses an explicit stack instead of recursion so deep hierarchies (long
/// bone chains mirrored as nodes) cannot overflow. A node's world matrix is
/// rebuilt only if its local matrix or any ancestor's changed. A changed
/// local matrix also invalidates the cached bounds of every ancestor.
pub fn update_hierarchy_iterative(nodes: &mut SlotMap<NodeHandle, Node>, roots: &[NodeHandle]) {
    // (node, parent world matrix, parent changed)
    let mut stack: Vec<(NodeHandle, Affine3A, bool)> = Vec::with_capacity(64);
    for &root_handle in roots.iter().rev() {
        stack.push((root_handle, Affine3A::IDENTITY, false));
    }
    run_stack(nodes, &mut stack);
}

/// Updates the subtree rooted at `root_handle`, forcing a rebuild of every
/// world matrix under it.
pub fn update_subtree(nodes: &mut SlotMap<NodeHandle, Node>, root_handle: NodeHandle) {
    let Some(node) = nodes.get(root_handle) else {
        return;
    };
    let parent_world = node
        .parent
        .and_then(|parent| nodes.get(parent))
        .map_or(Affine3A::IDENTITY, |p| p.transform.world_matrix);

    let mut stack = vec![(root_handle, parent_world, true)];
    run_stack(nodes, &mut stack);
}

fn run_stack(nodes: &mut SlotMap<NodeHandle, Node>, stack: &mut Vec<(NodeHandle, Affine3A, bool)>) {
    // Parents whose cached bound holds a child in its old local frame
    let mut moved_parents: Vec<NodeHandle> = Vec::new();

    while let Some((node_handle, parent_world_matrix, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(node_handle) else {
            continue;
        };

        let local_changed = node.transform.update_local_matrix();
        let world_needs_update = local_changed || parent_changed;

        if world_needs_update {
            let new_world = parent_world_matrix * *node.transform.local_matrix();
            node.transform.set_world_matrix(new_world);
        }

        if local_changed && let Some(parent) = node.parent {
            moved_parents.push(parent);
        }

        let current_world = node.transform.world_matrix;
        // Reverse so children are processed in declaration order
        for &child_handle in node.children.iter().rev() {
            stack.push((child_handle, current_world, world_needs_update));
        }
    }

    for parent in moved_parents {
        traversal::dirty_bound(nodes, parent);
    }
}
