use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Affine3A;
use serde::{Deserialize, Serialize};

use crate::resources::BoundingSphere;

/// How one bone influences a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneInfluence {
    /// Maps bind-pose mesh space into the bone's local space.
    pub inverse_bind_matrix: Affine3A,
    /// Sphere enclosing the influenced vertices, in bone space.
    pub bound_sphere: BoundingSphere,
    /// Vertex index -> weight.
    pub weights: BTreeMap<u32, f32>,
}

impl BoneInfluence {
    #[must_use]
    pub fn new(inverse_bind_matrix: Affine3A, bound_sphere: BoundingSphere) -> Self {
        Self {
            inverse_bind_matrix,
            bound_sphere,
            weights: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, vertex: u32, weight: f32) -> Self {
        self.weights.insert(vertex, weight);
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: impl IntoIterator<Item = (u32, f32)>) -> Self {
        self.weights.extend(weights);
        self
    }
}

/// Static per-mesh skinning data: bone name -> [`BoneInfluence`].
///
/// Filled once when the mesh is loaded, then frozen behind an `Arc` and
/// shared read-only by every [`RigGeometry`](super::RigGeometry) created from
/// that mesh. Bones iterate in name order, which fixes the order of each
/// vertex's bone set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfluenceMap {
    map: BTreeMap<String, BoneInfluence>,
}

impl InfluenceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the influence of `bone`, returning the previous one.
    pub fn insert(&mut self, bone: &str, influence: BoneInfluence) -> Option<BoneInfluence> {
        self.map.insert(bone.to_string(), influence)
    }

    #[must_use]
    pub fn get(&self, bone: &str) -> Option<&BoneInfluence> {
        self.map.get(bone)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoneInfluence)> {
        self.map.iter().map(|(name, influence)| (name.as_str(), influence))
    }

    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Freezes the map for sharing between rig instances.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl FromIterator<(String, BoneInfluence)> for InfluenceMap {
    fn from_iter<I: IntoIterator<Item = (String, BoneInfluence)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
