//! Error Types
//!
//! This module defines the error types used by the skinning core.
//!
//! # Overview
//!
//! [`RigError`] covers two families of failures:
//! - Rig binding failures (missing skeleton, missing influence data,
//!   unresolved bones). These never cross the per-frame update boundary: the
//!   rig logs them, skips the work and retries on the next visit.
//! - Skeleton construction errors, returned to the caller building the bone
//!   table.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_rig::errors::{RigError, Result};
//!
//! fn build() -> Result<()> {
//!     let mut skeleton = Skeleton::new("Armature");
//!     let root = skeleton.add_bone("Root", None)?;
//!     skeleton.add_bone("Spine", Some(root))?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::scene::skeleton::BoneId;

/// The error type for rig binding and skeleton construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RigError {
    // ========================================================================
    // Rig binding
    // ========================================================================
    /// No ancestor in the node path carries a skeleton.
    #[error("RigGeometry did not find its parent skeleton")]
    MissingSkeleton,

    /// No influence map has been attached to the rig.
    #[error("No InfluenceMap set on RigGeometry")]
    MissingInfluenceMap,

    /// No source geometry has been attached to the rig.
    #[error("No source geometry set on RigGeometry")]
    MissingSourceGeometry,

    /// An influence entry names a bone the skeleton does not have.
    #[error("RigGeometry did not find bone '{0}'")]
    UnresolvedBoneName(String),

    /// An influence entry references a vertex past the end of the source mesh.
    #[error("Bone '{bone}' influences vertex {vertex}, but the source geometry has {count} vertices")]
    VertexOutOfRange {
        /// Influencing bone name
        bone: String,
        /// The invalid vertex index
        vertex: u32,
        /// Vertex count of the source geometry
        count: usize,
    },

    // ========================================================================
    // Skeleton construction
    // ========================================================================
    /// A bone with this name already exists in the skeleton.
    #[error("Duplicate bone name '{0}'")]
    DuplicateBone(String),

    /// The parent handle does not refer to a bone already in the skeleton.
    #[error("Bone '{bone}' references unknown parent {parent:?}")]
    InvalidParentBone {
        /// Name of the bone being added
        bone: String,
        /// The invalid parent id
        parent: BoneId,
    },
}

/// Alias for `Result<T, RigError>`.
pub type Result<T> = std::result::Result<T, RigError>;
