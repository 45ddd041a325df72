use std::sync::Arc;

use glam::{Affine3A, Vec3, Vec4};
use parking_lot::Mutex;

use crate::errors::{Result, RigError};
use crate::resources::{BoundingBox, BoundingSphere, Geometry, TrackedArray};
use crate::rig::bone_map::{self, Bone2VertexMap, BoneSphereMap};
use crate::rig::influence::InfluenceMap;
use crate::scene::skeleton::Skeleton;
use crate::scene::traversal::TraversalContext;
use crate::scene::{NodeHandle, SkeletonKey};
use crate::settings::SkinningSettings;

/// A rig shared between visitor threads.
///
/// [`RigGeometry`] mutates its destination arrays without synchronisation;
/// when passes may visit one instance from several threads, guard it with a
/// mutex per instance.
pub type SharedRigGeometry = Arc<Mutex<RigGeometry>>;

/// The skeleton a rig is bound to: its store key and the node carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkeletonBinding {
    pub key: SkeletonKey,
    pub node: NodeHandle,
}

/// CPU skinned mesh instance.
///
/// Deforms a shared, immutable source [`Geometry`] by the pose of the nearest
/// skeleton above it in the scene graph. Positions, normals and tangents are
/// copied into per-instance [`TrackedArray`]s and rewritten every visible
/// frame; everything else is read from the source.
///
/// Work is split into two passes a scheduler runs independently:
/// - [`RigGeometry::compute_bounds`]: cheap, transforms one sphere per bone
/// - [`RigGeometry::compute_deformed_vertices`]: `O(vertices)` skinning
///
/// Both bind to the skeleton lazily on their first visit. Visits are not
/// reentrant; see [`SharedRigGeometry`].
#[derive(Debug)]
pub struct RigGeometry {
    source: Option<Arc<Geometry>>,
    influence_map: Option<Arc<InfluenceMap>>,
    settings: SkinningSettings,

    // === Destination attributes ===
    positions: TrackedArray<Vec3>,
    normals: Option<TrackedArray<Vec3>>,
    tangents: Option<TrackedArray<Vec4>>,

    // === Binding, built on first visit ===
    skeleton: Option<SkeletonBinding>,
    bone_to_vertex: Bone2VertexMap,
    bone_spheres: BoneSphereMap,

    // === Per-frame state ===
    /// Maps skeleton space into this geometry's local space.
    pub(crate) skel_to_geom: Affine3A,
    last_traversal: Option<u64>,
    pub(crate) bounds_first_frame: bool,

    pub(crate) bounding_box: Option<BoundingBox>,
    pub(crate) bounding_sphere: Option<BoundingSphere>,
}

impl Default for RigGeometry {
    fn default() -> Self {
        Self::new()
    }
}

impl RigGeometry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            influence_map: None,
            settings: SkinningSettings::default(),
            positions: TrackedArray::default(),
            normals: None,
            tangents: None,
            skeleton: None,
            bone_to_vertex: Bone2VertexMap::default(),
            bone_spheres: BoneSphereMap::new(),
            skel_to_geom: Affine3A::IDENTITY,
            last_traversal: None,
            bounds_first_frame: true,
            bounding_box: None,
            bounding_sphere: None,
        }
    }

    /// Convenience constructor for the common case.
    #[must_use]
    pub fn from_parts(source: Arc<Geometry>, influence_map: Arc<InfluenceMap>) -> Self {
        let mut rig = Self::new();
        rig.set_source_geometry(source);
        rig.set_influence_map(influence_map);
        rig
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SkinningSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn set_settings(&mut self, settings: SkinningSettings) {
        self.settings = settings;
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &SkinningSettings {
        &self.settings
    }

    // ========================================================================
    // Source & influence data
    // ========================================================================

    /// References `source` and deep-copies the attributes skinning rewrites.
    ///
    /// Tangents are only copied when the source has them; a rig over a
    /// tangent-less mesh never writes tangents.
    pub fn set_source_geometry(&mut self, source: Arc<Geometry>) {
        self.positions = TrackedArray::new(source.positions().to_vec());
        self.normals = source.normals().map(|n| TrackedArray::new(n.to_vec()));
        self.tangents = source.tangents().map(|t| TrackedArray::new(t.to_vec()));
        self.source = Some(source);
        // Vertex ranges were validated against the old source
        self.reset_binding();
    }

    #[inline]
    #[must_use]
    pub fn source_geometry(&self) -> Option<&Arc<Geometry>> {
        self.source.as_ref()
    }

    pub fn set_influence_map(&mut self, influence_map: Arc<InfluenceMap>) {
        self.influence_map = Some(influence_map);
        self.reset_binding();
    }

    #[inline]
    #[must_use]
    pub fn influence_map(&self) -> Option<&Arc<InfluenceMap>> {
        self.influence_map.as_ref()
    }

    /// Copy-on-instantiate: shares the source and influence map, deep-copies
    /// the destination arrays and starts unbound, as a fresh instance.
    #[must_use]
    pub fn instantiate(&self) -> Self {
        Self {
            source: self.source.clone(),
            influence_map: self.influence_map.clone(),
            settings: self.settings,
            positions: TrackedArray::new(self.positions.as_slice().to_vec()),
            normals: self.normals.as_ref().map(|n| TrackedArray::new(n.as_slice().to_vec())),
            tangents: self.tangents.as_ref().map(|t| TrackedArray::new(t.as_slice().to_vec())),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedRigGeometry {
        Arc::new(Mutex::new(self))
    }

    // ========================================================================
    // Consumer access
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn positions(&self) -> &TrackedArray<Vec3> {
        &self.positions
    }

    #[inline]
    #[must_use]
    pub fn normals(&self) -> Option<&TrackedArray<Vec3>> {
        self.normals.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn tangents(&self) -> Option<&TrackedArray<Vec4>> {
        self.tangents.as_ref()
    }

    /// Bound in local space. `None` until the first bounds pass.
    #[inline]
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    #[inline]
    #[must_use]
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.bounding_sphere
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> Option<SkeletonBinding> {
        self.skeleton
    }

    #[inline]
    #[must_use]
    pub fn bone_groups(&self) -> &Bone2VertexMap {
        &self.bone_to_vertex
    }

    #[inline]
    #[must_use]
    pub fn bone_spheres(&self) -> &BoneSphereMap {
        &self.bone_spheres
    }

    /// Skeleton-to-geometry matrix cached by the last bounds pass.
    #[inline]
    #[must_use]
    pub fn skeleton_to_geometry_matrix(&self) -> Affine3A {
        self.skel_to_geom
    }

    /// Traversal number of the last executed deform pass.
    #[inline]
    #[must_use]
    pub fn last_traversal(&self) -> Option<u64> {
        self.last_traversal
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Drops the bound skeleton and its maps. The next bind starts over with
    /// a first frame for both passes, even if the new skeleton is inactive.
    fn reset_binding(&mut self) {
        self.skeleton = None;
        self.bone_to_vertex = Bone2VertexMap::default();
        self.bone_spheres.clear();
        self.last_traversal = None;
        self.bounds_first_frame = true;
    }

    /// Binds to the nearest skeleton in `ctx.path` and builds the bone maps.
    ///
    /// Nothing is bound unless every precondition holds, so a failure here
    /// is retried on the next visit. Unresolved bone names are logged and
    /// skipped without failing.
    pub fn init_from_parent_skeleton(&mut self, ctx: &TraversalContext<'_>) -> Result<()> {
        let (node, key) = ctx
            .path
            .iter()
            .rev()
            .find_map(|&h| Some((h, ctx.nodes.get(h)?.skeleton?)))
            .ok_or(RigError::MissingSkeleton)?;
        let skeleton = ctx.skeletons.get(key).ok_or(RigError::MissingSkeleton)?;

        let influence_map = self.influence_map.as_ref().ok_or(RigError::MissingInfluenceMap)?;
        let source = self.source.as_ref().ok_or(RigError::MissingSourceGeometry)?;

        let maps = bone_map::build_bone_maps(influence_map, skeleton, source.vertex_count());
        self.bone_to_vertex = maps.bone_to_vertex;
        self.bone_spheres = maps.bone_spheres;
        self.skeleton = Some(SkeletonBinding { key, node });
        Ok(())
    }

    /// Returns the current binding, binding lazily if needed.
    pub(crate) fn ensure_skeleton(&mut self, ctx: &TraversalContext<'_>) -> Option<SkeletonBinding> {
        if let Some(binding) = self.skeleton {
            if ctx.skeletons.contains_key(binding.key) {
                return Some(binding);
            }
            log::warn!("RigGeometry lost its skeleton, rebinding");
            self.reset_binding();
        }

        match self.init_from_parent_skeleton(ctx) {
            Ok(()) => self.skeleton,
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    pub(crate) fn should_skip_inactive(&self, skeleton: &Skeleton, first_frame: bool) -> bool {
        self.settings.skip_inactive && !skeleton.is_active() && !first_frame
    }

    // ========================================================================
    // Deform pass
    // ========================================================================

    /// Skins the destination arrays for the current pose.
    ///
    /// Runs at most once per traversal number. While the skeleton is
    /// inactive only the very first call does any work. Returns whether the
    /// destination arrays were rewritten.
    pub fn compute_deformed_vertices(&mut self, ctx: &mut TraversalContext<'_>) -> bool {
        let Some(binding) = self.ensure_skeleton(ctx) else {
            return false;
        };
        let Some(skeleton) = ctx.skeletons.get_mut(binding.key) else {
            return false;
        };

        if self.should_skip_inactive(skeleton, self.last_traversal.is_none()) {
            return false;
        }
        if self.last_traversal == Some(ctx.traversal_number) {
            return false;
        }
        self.last_traversal = Some(ctx.traversal_number);

        skeleton.refresh_pose(ctx.traversal_number);
        self.skin(skeleton);
        true
    }

    fn skin(&mut self, skeleton: &Skeleton) {
        let Some(source) = self.source.as_deref() else {
            return;
        };
        let src_positions = source.positions();
        let src_normals = source.normals();
        let src_tangents = source.tangents();
        let normalize_normals = self.settings.normalize_normals;
        let normalize_tangents = self.settings.normalize_tangents;

        let mut positions = self.positions.write();
        let mut normals = match (src_normals, self.normals.as_mut()) {
            (Some(src), Some(dst)) => Some((src, dst.write())),
            _ => None,
        };
        let mut tangents = match (src_tangents, self.tangents.as_mut()) {
            (Some(src), Some(dst)) => Some((src, dst.write())),
            _ => None,
        };

        for group in self.bone_to_vertex.groups() {
            let matrix = self.skel_to_geom * bone_map::blend_bone_matrices(group.weights(), skeleton);

            for &vertex in group.vertices() {
                let i = vertex as usize;
                positions[i] = matrix.transform_point3(src_positions[i]);

                if let Some((src, dst)) = normals.as_mut() {
                    let n = matrix.transform_vector3(src[i]);
                    dst[i] = if normalize_normals { n.normalize_or_zero() } else { n };
                }

                if let Some((src, dst)) = tangents.as_mut() {
                    let t = src[i];
                    let mut xyz = matrix.transform_vector3(t.truncate());
                    if normalize_tangents {
                        xyz = xyz.normalize_or_zero();
                    }
                    dst[i] = xyz.extend(t.w);
                }
            }
        }
    }
}

/// Same as [`RigGeometry::instantiate`].
impl Clone for RigGeometry {
    fn clone(&self) -> Self {
        self.instantiate()
    }
}
