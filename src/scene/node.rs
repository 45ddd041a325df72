use glam::Affine3A;

use crate::resources::BoundingBox;
use crate::scene::transform::Transform;
use crate::scene::{NodeHandle, RigKey, SkeletonKey};

/// A scene node.
///
/// # Design Principles
///
/// - Keeps the data every traversal touches (hierarchy, transform, visibility)
/// - Skeletons and rigs live in the [`Scene`](crate::scene::Scene) stores;
///   the node only holds their keys
///
/// # Bounds
///
/// Each node caches a bound in its own local space (its children and its
/// rig, if any). The cache is invalidated by [`dirty_bound`](crate::scene::traversal::dirty_bound),
/// which walks up the ancestors, and rebuilt lazily by
/// [`Scene::compute_bound`](crate::scene::Scene::compute_bound).
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,

    // === Core Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    pub transform: Transform,
    pub visible: bool,

    // === Components ===
    pub(crate) skeleton: Option<SkeletonKey>,
    pub(crate) rig: Option<RigKey>,

    // === Bound cache ===
    pub(crate) bounding_box: Option<BoundingBox>,
    pub(crate) bound_dirty: bool,
}

impl Node {
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("")
    }

    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            visible: true,
            skeleton: None,
            rig: None,
            bounding_box: None,
            bound_dirty: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Sets the parent without touching the parent's child list.
    /// Prefer [`Scene::attach`](crate::scene::Scene::attach).
    #[inline]
    pub fn set_parent(&mut self, parent: Option<NodeHandle>) {
        self.parent = parent;
    }

    /// Appends a child without touching the child's parent.
    /// Prefer [`Scene::attach`](crate::scene::Scene::attach).
    #[inline]
    pub fn push_child(&mut self, child: NodeHandle) {
        self.children.push(child);
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> Option<SkeletonKey> {
        self.skeleton
    }

    #[inline]
    #[must_use]
    pub fn rig(&self) -> Option<RigKey> {
        self.rig
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }

    /// Whether the cached bound must be recomputed before it is trusted.
    #[inline]
    #[must_use]
    pub fn is_bound_dirty(&self) -> bool {
        self.bound_dirty
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
