//! Reverse indices built from an [`InfluenceMap`] once a skeleton is known.
//!
//! The influence map is keyed by bone; skinning wants the opposite view.
//! Every vertex collects its `(bone, inverse bind, weight)` triples, then
//! vertices with bitwise identical triples are grouped so each group's
//! blended matrix is computed once per frame.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use glam::{Affine3A, Mat3A, Vec3A};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::RigError;
use crate::resources::BoundingSphere;
use crate::rig::influence::InfluenceMap;
use crate::scene::skeleton::{BoneId, Skeleton};

/// One bone's contribution to a vertex.
#[derive(Debug, Clone, Copy)]
pub struct BoneWeight {
    pub bone: BoneId,
    pub inverse_bind_matrix: Affine3A,
    pub weight: f32,
}

// Equality is bitwise so the type can key a hash map: two vertices share a
// group only if their weights are exactly the same numbers.
impl PartialEq for BoneWeight {
    fn eq(&self, other: &Self) -> bool {
        self.bone == other.bone
            && self.weight.to_bits() == other.weight.to_bits()
            && matrix_bits(&self.inverse_bind_matrix) == matrix_bits(&other.inverse_bind_matrix)
    }
}

impl Eq for BoneWeight {}

impl Hash for BoneWeight {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bone.hash(state);
        self.weight.to_bits().hash(state);
    }
}

fn matrix_bits(m: &Affine3A) -> [u32; 12] {
    m.to_cols_array().map(f32::to_bits)
}

/// The weighted bone set of a vertex, ordered by bone name.
pub type BoneWeights = SmallVec<[BoneWeight; 4]>;

/// Vertices that share one weighted bone set.
#[derive(Debug, Clone)]
pub struct BoneGroup {
    weights: BoneWeights,
    vertices: Vec<u32>,
}

impl BoneGroup {
    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[BoneWeight] {
        &self.weights
    }

    /// Vertex indices, ascending.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[u32] {
        &self.vertices
    }
}

/// Bone set -> vertices. Groups are ordered by their lowest vertex index.
#[derive(Debug, Clone, Default)]
pub struct Bone2VertexMap {
    groups: Vec<BoneGroup>,
}

impl Bone2VertexMap {
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[BoneGroup] {
        &self.groups
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of vertices reachable through at least one resolved bone.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(|g| g.vertices.len()).sum()
    }

    /// The group containing `vertex`, if any.
    #[must_use]
    pub fn group_of(&self, vertex: u32) -> Option<&BoneGroup> {
        self.groups.iter().find(|g| g.vertices.binary_search(&vertex).is_ok())
    }
}

/// Bone -> bounding sphere in bone space.
pub type BoneSphereMap = BTreeMap<BoneId, BoundingSphere>;

/// Output of [`build_bone_maps`].
#[derive(Debug, Default)]
pub struct BoneMaps {
    pub bone_to_vertex: Bone2VertexMap,
    pub bone_spheres: BoneSphereMap,
    /// Entries that were dropped, already logged.
    pub skipped: Vec<RigError>,
}

/// Resolves every named bone of `influence` against `skeleton` and builds
/// the grouped vertex index and the bone sphere map.
///
/// Unknown bone names and vertex indices `>= vertex_count` are logged and
/// skipped; everything that resolves is kept.
#[must_use]
pub fn build_bone_maps(influence: &InfluenceMap, skeleton: &Skeleton, vertex_count: usize) -> BoneMaps {
    let mut skipped = Vec::new();
    let mut bone_spheres = BoneSphereMap::new();
    let mut vertex_to_bones: BTreeMap<u32, BoneWeights> = BTreeMap::new();

    for (name, bone_influence) in influence.iter() {
        let Some(bone) = skeleton.find_bone_by_name(name) else {
            let err = RigError::UnresolvedBoneName(name.to_string());
            log::warn!("{err}");
            skipped.push(err);
            continue;
        };

        bone_spheres.insert(bone, bone_influence.bound_sphere);

        for (&vertex, &weight) in &bone_influence.weights {
            if vertex as usize >= vertex_count {
                let err = RigError::VertexOutOfRange {
                    bone: name.to_string(),
                    vertex,
                    count: vertex_count,
                };
                log::warn!("{err}");
                skipped.push(err);
                continue;
            }
            vertex_to_bones.entry(vertex).or_default().push(BoneWeight {
                bone,
                inverse_bind_matrix: bone_influence.inverse_bind_matrix,
                weight,
            });
        }
    }

    let mut groups: Vec<BoneGroup> = Vec::new();
    let mut group_index: FxHashMap<BoneWeights, usize> = FxHashMap::default();
    for (vertex, weights) in vertex_to_bones {
        match group_index.get(&weights) {
            Some(&i) => groups[i].vertices.push(vertex),
            None => {
                group_index.insert(weights.clone(), groups.len());
                groups.push(BoneGroup {
                    weights,
                    vertices: vec![vertex],
                });
            }
        }
    }

    log::debug!(
        "Skeleton '{}': {} bone groups, {} bone spheres, {} entries skipped",
        skeleton.name,
        groups.len(),
        bone_spheres.len(),
        skipped.len()
    );

    BoneMaps {
        bone_to_vertex: Bone2VertexMap { groups },
        bone_spheres,
        skipped,
    }
}

/// Weighted sum of `bone ∘ inverse_bind` over a bone set.
///
/// Only the 3x3 block and the translation are accumulated; the homogeneous
/// row stays `(0, 0, 0, 1)`, i.e. plain linear blend skinning. Bones missing
/// from the skeleton contribute nothing.
#[must_use]
pub fn blend_bone_matrices(weights: &[BoneWeight], skeleton: &Skeleton) -> Affine3A {
    let mut matrix3 = Mat3A::ZERO;
    let mut translation = Vec3A::ZERO;

    for bw in weights {
        let Some(bone) = skeleton.bone(bw.bone) else {
            continue;
        };
        let m = bone.matrix_in_skeleton_space() * bw.inverse_bind_matrix;
        matrix3 = matrix3 + m.matrix3 * bw.weight;
        translation += m.translation * bw.weight;
    }

    Affine3A {
        matrix3,
        translation,
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::rig::influence::BoneInfluence;

    fn skeleton() -> Skeleton {
        let mut skeleton = Skeleton::new("Armature");
        let root = skeleton.add_bone("Root", None).unwrap();
        skeleton.add_bone("Arm", Some(root)).unwrap();
        skeleton
    }

    #[test]
    fn vertex_sets_are_ordered_by_bone_name() {
        let skeleton = skeleton();
        let mut map = InfluenceMap::new();
        map.insert(
            "Root",
            BoneInfluence::new(Affine3A::IDENTITY, BoundingSphere::new(Vec3::ZERO, 1.0)).with_weight(0, 0.25),
        );
        map.insert(
            "Arm",
            BoneInfluence::new(Affine3A::IDENTITY, BoundingSphere::new(Vec3::ZERO, 1.0)).with_weight(0, 0.75),
        );

        let maps = build_bone_maps(&map, &skeleton, 1);
        let group = &maps.bone_to_vertex.groups()[0];
        let arm = skeleton.find_bone_by_name("Arm").unwrap();
        assert_eq!(group.weights()[0].bone, arm);
        assert!((group.weights()[0].weight - 0.75).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_vertices_are_skipped() {
        let skeleton = skeleton();
        let mut map = InfluenceMap::new();
        map.insert(
            "Root",
            BoneInfluence::new(Affine3A::IDENTITY, BoundingSphere::new(Vec3::ZERO, 1.0))
                .with_weights([(0, 1.0), (9, 1.0)]),
        );

        let maps = build_bone_maps(&map, &skeleton, 2);
        assert_eq!(maps.bone_to_vertex.vertex_count(), 1);
        assert!(matches!(
            maps.skipped.as_slice(),
            [RigError::VertexOutOfRange { vertex: 9, .. }]
        ));
    }

    #[test]
    fn blend_of_nothing_is_zero() {
        let skeleton = skeleton();
        let m = blend_bone_matrices(&[], &skeleton);
        assert_eq!(m.transform_point3(Vec3::ONE), Vec3::ZERO);
    }
}
