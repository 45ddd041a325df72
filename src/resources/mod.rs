//! Core resource definitions
//!
//! Data structures shared by the scene graph and the skinning core, with no
//! GPU dependency:
//! - Geometry: immutable bind-pose mesh data
//! - BoundingBox / BoundingSphere: spatial bounds
//! - TrackedArray: versioned per-vertex arrays handed to the renderer

pub mod geometry;
pub mod version_tracker;

pub use geometry::{BoundingBox, BoundingSphere, Geometry, GeometryFeatures};
pub use version_tracker::{ChangeTracker, MutGuard, TrackedArray};
