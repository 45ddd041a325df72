//! Bounds pass
//!
//! Recomputes a rig's local bound from its bone spheres instead of its
//! vertices. A culling scheduler runs this before deciding whether the
//! `O(vertices)` deform pass is worth running at all.

use slotmap::SlotMap;

use crate::resources::{BoundingBox, BoundingSphere};
use crate::rig::rig_geometry::RigGeometry;
use crate::scene::node::Node;
use crate::scene::traversal::{self, TraversalContext};
use crate::scene::NodeHandle;

impl RigGeometry {
    /// Recomputes the bound from the current pose and marks the owning
    /// node's bound (and its ancestors') stale.
    ///
    /// While the skeleton is inactive only the first call does any work.
    /// Until the first successful call [`RigGeometry::bounding_box`] is
    /// `None`. Returns whether the bound was recomputed.
    pub fn compute_bounds(&mut self, ctx: &mut TraversalContext<'_>) -> bool {
        let Some(binding) = self.ensure_skeleton(ctx) else {
            return false;
        };
        let Some(skeleton) = ctx.skeletons.get_mut(binding.key) else {
            return false;
        };

        if self.should_skip_inactive(skeleton, self.bounds_first_frame) {
            return false;
        }
        self.bounds_first_frame = false;

        skeleton.refresh_pose(ctx.traversal_number);
        self.update_skel_to_geom_matrix(ctx.path, ctx.nodes, binding.node);

        let mut bbox = BoundingBox::EMPTY;
        for (&bone_id, sphere) in self.bone_spheres() {
            let Some(bone) = skeleton.bone(bone_id) else {
                continue;
            };
            let matrix = self.skel_to_geom * bone.matrix_in_skeleton_space();
            bbox.expand_by_sphere(&sphere.transform(&matrix));
        }

        let padding = self.settings().bounds_padding;
        if padding > 0.0 {
            bbox = bbox.inflate(padding);
        }

        if bbox.is_valid() {
            self.bounding_box = Some(bbox);
            self.bounding_sphere = Some(BoundingSphere::from_box(&bbox));
        } else {
            // No resolved bone spheres
            self.bounding_box = None;
            self.bounding_sphere = None;
        }

        if let Some(current) = ctx.current() {
            traversal::dirty_bound(ctx.nodes, current);
        }
        true
    }

    /// Caches the matrix mapping skeleton space into this geometry's space:
    /// the inverse of the local matrices on the path below the skeleton node.
    ///
    /// Keeps the previous matrix if `skeleton_node` is not on `path`.
    pub(crate) fn update_skel_to_geom_matrix(
        &mut self,
        path: &[NodeHandle],
        nodes: &SlotMap<NodeHandle, Node>,
        skeleton_node: NodeHandle,
    ) {
        let Some(pos) = path.iter().position(|&h| h == skeleton_node) else {
            log::warn!("Skeleton node is not on the traversal path, keeping previous skeleton-to-geometry matrix");
            return;
        };
        self.skel_to_geom = traversal::compute_world_to_local(&path[pos + 1..], nodes);
    }
}
