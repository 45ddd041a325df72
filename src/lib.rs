#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod resources;
pub mod rig;
pub mod scene;
pub mod settings;

pub use errors::{Result, RigError};
pub use resources::{BoundingBox, BoundingSphere, Geometry, GeometryFeatures, TrackedArray};
pub use rig::{BoneInfluence, InfluenceMap, RigGeometry, RigPass, RigSystem, SharedRigGeometry};
pub use scene::{Bone, BoneId, Node, NodeHandle, Scene, Skeleton, Transform, TraversalContext};
pub use settings::SkinningSettings;
