//! CPU skinning
//!
//! - [`InfluenceMap`]: static per-mesh bone weights, shared between instances
//! - [`RigGeometry`]: a skinned instance with its own destination arrays
//! - [`bone_map`]: the grouped bone/vertex indices built at bind time
//! - [`RigSystem`]: dispatches the bounds and deform passes over a scene

pub mod bone_map;
pub mod bounds;
pub mod influence;
pub mod rig_geometry;
pub mod system;

pub use bone_map::{Bone2VertexMap, BoneGroup, BoneSphereMap, BoneWeight};
pub use influence::{BoneInfluence, InfluenceMap};
pub use rig_geometry::{RigGeometry, SharedRigGeometry, SkeletonBinding};
pub use system::{RigPass, RigSystem};
