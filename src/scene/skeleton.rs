use glam::Affine3A;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::errors::{Result, RigError};
use crate::scene::transform::Transform;

/// Index of a bone in its skeleton's bone table.
///
/// Rigs hold `BoneId`s instead of references; the skeleton owns the bones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub(crate) u32);

impl BoneId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Bone {
    name: String,
    parent: Option<BoneId>,

    /// Local transform relative to the parent bone (or the skeleton root).
    /// Written by animation, read by [`Skeleton::refresh_pose`].
    pub transform: Transform,

    matrix_in_skeleton_space: Affine3A,
}

impl Bone {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    /// Bone-to-skeleton-space matrix as of the last pose refresh.
    #[inline]
    #[must_use]
    pub fn matrix_in_skeleton_space(&self) -> Affine3A {
        self.matrix_in_skeleton_space
    }
}

/// A bone hierarchy whose pose is evaluated at most once per traversal.
///
/// Bones are stored parent-first: [`Skeleton::add_bone`] only accepts a
/// parent that is already in the table, so a single forward pass evaluates
/// the whole pose.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub id: Uuid,
    pub name: String,

    bones: Vec<Bone>,
    bone_names: FxHashMap<String, BoneId>,

    active: bool,
    last_pose_traversal: Option<u64>,
    pose_revision: u64,
}

impl Skeleton {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            bones: Vec::new(),
            bone_names: FxHashMap::default(),
            active: true,
            last_pose_traversal: None,
            pose_revision: 0,
        }
    }

    pub fn add_bone(&mut self, name: &str, parent: Option<BoneId>) -> Result<BoneId> {
        self.add_bone_with_transform(name, parent, Transform::new())
    }

    pub fn add_bone_with_transform(
        &mut self,
        name: &str,
        parent: Option<BoneId>,
        transform: Transform,
    ) -> Result<BoneId> {
        if self.bone_names.contains_key(name) {
            return Err(RigError::DuplicateBone(name.to_string()));
        }
        if let Some(parent) = parent
            && parent.index() >= self.bones.len()
        {
            return Err(RigError::InvalidParentBone {
                bone: name.to_string(),
                parent,
            });
        }

        let id = BoneId(self.bones.len() as u32);
        self.bones.push(Bone {
            name: name.to_string(),
            parent,
            transform,
            matrix_in_skeleton_space: Affine3A::IDENTITY,
        });
        self.bone_names.insert(name.to_string(), id);
        self.mark_dirty();
        Ok(id)
    }

    #[must_use]
    pub fn find_bone_by_name(&self, name: &str) -> Option<BoneId> {
        self.bone_names.get(name).copied()
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.index())
    }

    /// Mutable access for animation. Pose changes take effect at the next
    /// traversal, or immediately after [`Skeleton::mark_dirty`].
    #[inline]
    pub fn bone_mut(&mut self, id: BoneId) -> Option<&mut Bone> {
        self.bones.get_mut(id.index())
    }

    #[inline]
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Whether the skeleton is currently animated/visible.
    /// Rigs skip their per-frame work while it is not.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Number of times the pose was actually re-evaluated.
    #[inline]
    #[must_use]
    pub fn pose_revision(&self) -> u64 {
        self.pose_revision
    }

    /// Forgets the memoized traversal so the next refresh recomputes.
    pub fn mark_dirty(&mut self) {
        self.last_pose_traversal = None;
    }

    /// Recomputes every bone's matrix in skeleton space.
    ///
    /// Memoized per traversal number: every rig bound to this skeleton calls
    /// this during both the bounds and the deform pass, and only the first
    /// call of a traversal does any work. Returns whether the pose was
    /// re-evaluated.
    pub fn refresh_pose(&mut self, traversal_number: u64) -> bool {
        if self.last_pose_traversal == Some(traversal_number) {
            return false;
        }
        self.last_pose_traversal = Some(traversal_number);

        for i in 0..self.bones.len() {
            self.bones[i].transform.update_local_matrix();
            let local = *self.bones[i].transform.local_matrix();

            let matrix = match self.bones[i].parent {
                Some(parent) => self.bones[parent.index()].matrix_in_skeleton_space * local,
                None => local,
            };
            self.bones[i].matrix_in_skeleton_space = matrix;
        }

        self.pose_revision = self.pose_revision.wrapping_add(1);
        log::trace!(
            "Skeleton '{}': pose refreshed for traversal {traversal_number}",
            self.name
        );
        true
    }
}
