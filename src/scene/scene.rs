use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::SlotMap;

use crate::resources::BoundingBox;
use crate::rig::{RigGeometry, RigSystem};
use crate::scene::node::Node;
use crate::scene::skeleton::Skeleton;
use crate::scene::{NodeHandle, RigKey, SkeletonKey, transform_system, traversal};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Scene graph container.
///
/// Owns the node hierarchy and the component stores. Skeletons and rigs are
/// attached to nodes by key, so a pass can borrow `nodes`, `skeletons` and
/// `rigs` independently.
pub struct Scene {
    pub id: u32,

    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    // ==== Component stores ====
    pub skeletons: SlotMap<SkeletonKey, Skeleton>,
    pub rigs: SlotMap<RigKey, RigGeometry>,

    traversal_number: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            skeletons: SlotMap::with_key(),
            rigs: SlotMap::with_key(),
            traversal_number: 0,
        }
    }

    // ========================================================================
    // Node management
    // ========================================================================

    /// Creates a detached root node.
    pub fn create_node(&mut self) -> NodeHandle {
        self.add_node(Node::new())
    }

    pub fn create_node_with_name(&mut self, name: &str) -> NodeHandle {
        self.add_node(Node::with_name(name))
    }

    /// Adds a node at the root level.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    pub fn add_to_parent(&mut self, child: Node, parent: NodeHandle) -> NodeHandle {
        let handle = self.add_node(child);
        self.attach(handle, parent);
        handle
    }

    /// Moves `child` under `parent`, detaching it from its previous parent.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(parent) {
            log::error!("Parent node not found during attach!");
            return;
        }
        if self.is_ancestor(child, parent) {
            log::warn!("Cannot attach a node below its own descendant!");
            return;
        }

        self.unlink(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
        traversal::dirty_bound(&mut self.nodes, parent);
    }

    /// Moves `child` back to the root level.
    pub fn detach(&mut self, child: NodeHandle) {
        if self.nodes.get(child).and_then(|n| n.parent).is_none() {
            return;
        }
        self.unlink(child);
        if let Some(c) = self.nodes.get_mut(child) {
            c.transform.mark_dirty();
        }
        self.root_nodes.push(child);
    }

    /// Removes `child` from its parent's children (or from the root list)
    /// and clears its parent link.
    fn unlink(&mut self, child: NodeHandle) {
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        match old_parent {
            Some(p) => {
                if let Some(n) = self.nodes.get_mut(p)
                    && let Some(i) = n.children.iter().position(|&x| x == child)
                {
                    n.children.remove(i);
                }
                traversal::dirty_bound(&mut self.nodes, p);
                if let Some(c) = self.nodes.get_mut(child) {
                    c.parent = None;
                }
            }
            None => {
                if let Some(i) = self.root_nodes.iter().position(|&x| x == child) {
                    self.root_nodes.remove(i);
                }
            }
        }
    }

    fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.nodes.get(h).and_then(|n| n.parent);
        }
        false
    }

    /// Removes a node, its subtree and their components.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let children = node.children.clone();
        for child in children {
            self.remove_node(child);
        }

        match self.nodes.get(handle).and_then(|n| n.parent) {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent)
                    && let Some(pos) = p.children.iter().position(|&x| x == handle)
                {
                    p.children.remove(pos);
                }
                traversal::dirty_bound(&mut self.nodes, parent);
            }
            None => {
                if let Some(pos) = self.root_nodes.iter().position(|&x| x == handle) {
                    self.root_nodes.remove(pos);
                }
            }
        }

        if let Some(node) = self.nodes.remove(handle) {
            if let Some(key) = node.skeleton {
                self.skeletons.remove(key);
            }
            if let Some(key) = node.rig {
                self.rigs.remove(key);
            }
        }
    }

    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn get_name(&self, handle: NodeHandle) -> Option<&str> {
        self.nodes.get(handle).map(|n| n.name.as_str())
    }

    pub fn set_name(&mut self, handle: NodeHandle, name: &str) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.name = name.to_string();
        }
    }

    /// Ancestor chain of `handle`, root first, `handle` last.
    /// Empty for a stale handle.
    #[must_use]
    pub fn node_path(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut path = Vec::new();
        let mut current = self.nodes.contains_key(handle).then_some(handle);
        while let Some(h) = current {
            path.push(h);
            current = self.nodes.get(h).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Attaches a skeleton to `node`, replacing any previous one.
    pub fn set_skeleton(&mut self, node: NodeHandle, skeleton: Skeleton) -> Option<SkeletonKey> {
        let slot = self.nodes.get_mut(node)?;
        let key = self.skeletons.insert(skeleton);
        if let Some(old) = slot.skeleton.replace(key) {
            self.skeletons.remove(old);
        }
        Some(key)
    }

    /// Attaches a rig to `node`, replacing any previous one.
    pub fn set_rig(&mut self, node: NodeHandle, rig: RigGeometry) -> Option<RigKey> {
        let slot = self.nodes.get_mut(node)?;
        let key = self.rigs.insert(rig);
        if let Some(old) = slot.rig.replace(key) {
            self.rigs.remove(old);
        }
        traversal::dirty_bound(&mut self.nodes, node);
        Some(key)
    }

    #[must_use]
    pub fn get_skeleton(&self, node: NodeHandle) -> Option<&Skeleton> {
        let key = self.nodes.get(node)?.skeleton?;
        self.skeletons.get(key)
    }

    pub fn get_skeleton_mut(&mut self, node: NodeHandle) -> Option<&mut Skeleton> {
        let key = self.nodes.get(node)?.skeleton?;
        self.skeletons.get_mut(key)
    }

    #[must_use]
    pub fn get_rig(&self, node: NodeHandle) -> Option<&RigGeometry> {
        let key = self.nodes.get(node)?.rig?;
        self.rigs.get(key)
    }

    pub fn get_rig_mut(&mut self, node: NodeHandle) -> Option<&mut RigGeometry> {
        let key = self.nodes.get(node)?.rig?;
        self.rigs.get_mut(key)
    }

    // ========================================================================
    // Matrices & bounds
    // ========================================================================

    /// Updates the world matrices of the whole scene.
    pub fn update_matrix_world(&mut self) {
        transform_system::update_hierarchy_iterative(&mut self.nodes, &self.root_nodes);
    }

    pub fn update_subtree(&mut self, root: NodeHandle) {
        transform_system::update_subtree(&mut self.nodes, root);
    }

    /// Marks the bound of `handle` and its ancestors stale.
    pub fn dirty_bound(&mut self, handle: NodeHandle) {
        traversal::dirty_bound(&mut self.nodes, handle);
    }

    /// Bound of `handle` in its own local space: its rig's bound united with
    /// its children's bounds. Recomputed only where stale.
    ///
    /// Walks the stale part of the subtree with an explicit stack, children
    /// before parents, so long node chains cannot overflow.
    pub fn compute_bound(&mut self, handle: NodeHandle) -> Option<BoundingBox> {
        // (node, children already resolved)
        let mut stack: Vec<(NodeHandle, bool)> = vec![(handle, false)];

        while let Some((current, children_done)) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            if !node.bound_dirty {
                continue;
            }

            if !children_done {
                stack.push((current, true));
                for &child in node.children.iter().rev() {
                    stack.push((child, false));
                }
                continue;
            }

            let mut bbox = BoundingBox::EMPTY;
            if let Some(rig_bbox) = node.rig.and_then(|key| self.rigs.get(key)?.bounding_box()) {
                bbox.expand_by_box(&rig_bbox);
            }
            for child_node in node.children.iter().filter_map(|&child| self.nodes.get(child)) {
                if let Some(child_bbox) = child_node.bounding_box {
                    bbox.expand_by_box(&child_bbox.transform(child_node.transform.local_matrix()));
                }
            }

            let result = bbox.is_valid().then_some(bbox);
            if let Some(node) = self.nodes.get_mut(current) {
                node.bounding_box = result;
                node.bound_dirty = false;
            }
        }

        self.nodes.get(handle)?.bounding_box
    }

    // ========================================================================
    // Frame driving
    // ========================================================================

    /// Number of the last traversal started by [`Scene::frame`] or
    /// [`Scene::advance_traversal`].
    #[inline]
    #[must_use]
    pub fn traversal_number(&self) -> u64 {
        self.traversal_number
    }

    /// Starts a new traversal and returns its number (starting at 1).
    pub fn advance_traversal(&mut self) -> u64 {
        self.traversal_number += 1;
        self.traversal_number
    }

    /// Runs one frame: world matrices, then the bounds pass over every rig,
    /// then the deform pass over visible rigs. Returns the traversal number.
    pub fn frame(&mut self) -> u64 {
        let traversal_number = self.advance_traversal();
        self.update_matrix_world();
        RigSystem::update_pass(self, traversal_number);
        RigSystem::cull_pass(self, traversal_number);
        traversal_number
    }
}
