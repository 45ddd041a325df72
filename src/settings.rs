//! Skinning Settings
//!
//! Per-rig configuration for the CPU skinning path.
//!
//! ```rust,ignore
//! use myth_rig::settings::SkinningSettings;
//!
//! // Re-normalize normals after blending (useful when bones carry scale)
//! let settings = SkinningSettings {
//!     normalize_normals: true,
//!     ..Default::default()
//! };
//! rig.set_settings(settings);
//! ```

use serde::{Deserialize, Serialize};

/// Tunables for [`RigGeometry`](crate::rig::RigGeometry).
///
/// The defaults reproduce plain linear blend skinning: blended normals and
/// tangents are written as-is, bounds are the exact union of the transformed
/// bone spheres, and inactive skeletons are skipped after the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinningSettings {
    /// Re-normalize destination normals after the blended 3x3 transform.
    pub normalize_normals: bool,

    /// Re-normalize the xyz part of destination tangents.
    pub normalize_tangents: bool,

    /// Extra margin added on every side of the recomputed bounding box.
    pub bounds_padding: f32,

    /// Skip pose and bounds work while the skeleton is inactive.
    /// The first frame is always computed.
    pub skip_inactive: bool,
}

impl Default for SkinningSettings {
    fn default() -> Self {
        Self {
            normalize_normals: false,
            normalize_tangents: false,
            bounds_padding: 0.0,
            skip_inactive: true,
        }
    }
}
