//! Scene graph
//!
//! The minimal hierarchy the skinning core runs in:
//! - Node: hierarchy, transform, skeleton/rig component keys, cached bound
//! - Transform: TRS with dirty checking
//! - Skeleton: bone table and per-traversal pose evaluation
//! - Scene: node, skeleton and rig stores
//! - TransformSystem: world matrix propagation
//! - Traversal: the context handed to rigs during a pass

pub mod node;
pub mod scene;
pub mod skeleton;
pub mod transform;
pub mod transform_system;
pub mod traversal;

pub use node::Node;
pub use scene::Scene;
pub use skeleton::{Bone, BoneId, Skeleton};
pub use transform::Transform;
pub use traversal::TraversalContext;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct SkeletonKey;
    pub struct RigKey;
}
