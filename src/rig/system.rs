use crate::rig::rig_geometry::{RigGeometry, SharedRigGeometry};
use crate::scene::traversal::TraversalContext;
use crate::scene::{NodeHandle, Scene};

/// Which capability of a rig a traversal invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigPass {
    /// [`RigGeometry::compute_bounds`]; visits every node.
    Bounds,
    /// [`RigGeometry::compute_deformed_vertices`]; visits visible nodes only.
    Deform,
}

/// Rig system.
///
/// Walks the scene graph and dispatches one [`RigPass`] to every rig it
/// meets, building the ancestor path the rigs bind against. Uses the
/// `std::mem::take` technique to borrow the rig store apart from the nodes.
pub struct RigSystem;

impl RigSystem {
    /// Bounds pass over every rig in the scene.
    #[inline]
    pub fn update_pass(scene: &mut Scene, traversal_number: u64) -> usize {
        Self::run(scene, traversal_number, RigPass::Bounds)
    }

    /// Deform pass over rigs whose node and ancestors are all visible.
    #[inline]
    pub fn cull_pass(scene: &mut Scene, traversal_number: u64) -> usize {
        Self::run(scene, traversal_number, RigPass::Deform)
    }

    /// Runs `pass` depth-first from the scene roots.
    ///
    /// Returns the number of rigs that did work. A rig attached to a stale
    /// key, or one whose binding fails, is skipped for this traversal.
    pub fn run(scene: &mut Scene, traversal_number: u64, pass: RigPass) -> usize {
        let mut rigs = std::mem::take(&mut scene.rigs);

        let mut executed = 0;
        let mut path: Vec<NodeHandle> = Vec::with_capacity(16);
        // (node, depth)
        let mut stack: Vec<(NodeHandle, usize)> = scene.root_nodes.iter().rev().map(|&h| (h, 0)).collect();

        while let Some((handle, depth)) = stack.pop() {
            let Some(node) = scene.nodes.get(handle) else {
                continue;
            };
            if pass == RigPass::Deform && !node.visible {
                continue;
            }

            path.truncate(depth);
            path.push(handle);
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }

            let Some(rig) = node.rig.and_then(|key| rigs.get_mut(key)) else {
                continue;
            };
            let mut ctx = TraversalContext::new(traversal_number, &path, &mut scene.nodes, &mut scene.skeletons);
            if Self::visit(rig, &mut ctx, pass) {
                executed += 1;
            }
        }

        scene.rigs = rigs;
        log::trace!("{pass:?} pass {traversal_number}: {executed} rigs updated");
        executed
    }

    /// Runs one pass on one rig.
    #[inline]
    pub fn visit(rig: &mut RigGeometry, ctx: &mut TraversalContext<'_>, pass: RigPass) -> bool {
        match pass {
            RigPass::Bounds => rig.compute_bounds(ctx),
            RigPass::Deform => rig.compute_deformed_vertices(ctx),
        }
    }

    /// Runs one pass on a rig that other visitors may reach concurrently.
    /// Visits are serialized by the rig's mutex.
    pub fn visit_shared(rig: &SharedRigGeometry, ctx: &mut TraversalContext<'_>, pass: RigPass) -> bool {
        Self::visit(&mut rig.lock(), ctx, pass)
    }
}
