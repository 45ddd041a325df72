use bitflags::bitflags;
use glam::{Affine3A, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Bounding volumes
// ============================================================================

/// Axis-aligned bounding box.
///
/// A box whose `min` exceeds its `max` on any axis is *empty*; expanding an
/// empty box by anything yields exactly that thing's extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec3 { (self.min + self.max) * 0.5 }
    pub fn size(&self) -> Vec3 { self.max - self.min }

    /// Half the length of the diagonal.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand_by_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grows the box to enclose the whole sphere. Invalid spheres are ignored.
    pub fn expand_by_sphere(&mut self, sphere: &BoundingSphere) {
        if !sphere.is_valid() {
            return;
        }
        let extent = Vec3::splat(sphere.radius);
        self.min = self.min.min(sphere.center - extent);
        self.max = self.max.max(sphere.center + extent);
    }

    pub fn expand_by_box(&mut self, other: &BoundingBox) {
        if other.is_valid() {
            *self = self.union(other);
        }
    }

    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Whether the sphere lies entirely inside the box, within `epsilon`.
    #[must_use]
    pub fn contains_sphere(&self, sphere: &BoundingSphere, epsilon: f32) -> bool {
        let extent = Vec3::splat(sphere.radius - epsilon);
        self.contains_point(sphere.center - extent) && self.contains_point(sphere.center + extent)
    }

    pub fn transform(&self, matrix: &Affine3A) -> Self {
        if !self.is_valid() {
            return *self;
        }

        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut transformed = Self::EMPTY;
        for point in corners {
            transformed.expand_by_point(matrix.transform_point3(point));
        }
        transformed
    }

    /// Grows the box by `amount` on every side.
    #[must_use]
    pub fn inflate(&self, amount: f32) -> Self {
        if !self.is_valid() {
            return *self;
        }
        Self {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::INVALID
    }
}

impl BoundingSphere {
    pub const INVALID: Self = Self {
        center: Vec3::ZERO,
        radius: -1.0,
    };

    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.radius >= 0.0
    }

    /// The sphere circumscribing `bbox`; invalid for an empty box.
    #[must_use]
    pub fn from_box(bbox: &BoundingBox) -> Self {
        if bbox.is_valid() {
            Self::new(bbox.center(), bbox.radius())
        } else {
            Self::INVALID
        }
    }

    /// Transforms the sphere by an affine matrix.
    ///
    /// The center is transformed as a point; the radius is scaled by the
    /// largest axis scale of the matrix, so the result still encloses the
    /// (possibly non-uniformly scaled) original.
    #[must_use]
    pub fn transform(&self, matrix: &Affine3A) -> Self {
        if !self.is_valid() {
            return *self;
        }
        let m = matrix.matrix3;
        let max_scale = m
            .x_axis
            .length()
            .max(m.y_axis.length())
            .max(m.z_axis.length());

        Self {
            center: matrix.transform_point3(self.center),
            radius: self.radius * max_scale,
        }
    }
}

// ============================================================================
// Source geometry
// ============================================================================

bitflags! {
    /// Optional vertex attributes present on a [`Geometry`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GeometryFeatures: u32 {
        const USE_NORMAL  = 1 << 0;
        const USE_TANGENT = 1 << 1;
        const USE_UV      = 1 << 2;
        const USE_COLOR   = 1 << 3;
        const USE_INDEX   = 1 << 4;
    }
}

/// Immutable mesh data in bind pose.
///
/// A `Geometry` is usually shared behind an `Arc` by every skinned instance
/// created from the same asset. Instances never write to it; they deep-copy
/// the attributes they deform and reference the rest.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub uuid: Uuid,
    pub name: String,

    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    /// xyz = tangent direction, w = handedness
    tangents: Option<Vec<Vec4>>,
    uvs: Option<Vec<Vec2>>,
    colors: Option<Vec<Vec4>>,
    indices: Option<Vec<u32>>,

    bounding_box: Option<BoundingBox>,
    bounding_sphere: Option<BoundingSphere>,
}

impl Geometry {
    #[must_use]
    pub fn new(name: &str, positions: Vec<Vec3>) -> Self {
        let mut geometry = Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            positions,
            normals: None,
            tangents: None,
            uvs: None,
            colors: None,
            indices: None,
            bounding_box: None,
            bounding_sphere: None,
        };
        geometry.compute_bounding_volume();
        geometry
    }

    /// Attaches per-vertex normals. A mismatched length is rejected with a warning.
    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        if self.check_len("normal", normals.len()) {
            self.normals = Some(normals);
        }
        self
    }

    #[must_use]
    pub fn with_tangents(mut self, tangents: Vec<Vec4>) -> Self {
        if self.check_len("tangent", tangents.len()) {
            self.tangents = Some(tangents);
        }
        self
    }

    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        if self.check_len("uv", uvs.len()) {
            self.uvs = Some(uvs);
        }
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Self {
        if self.check_len("color", colors.len()) {
            self.colors = Some(colors);
        }
        self
    }

    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    fn check_len(&self, attribute: &str, len: usize) -> bool {
        if len == self.positions.len() {
            return true;
        }
        log::warn!(
            "Geometry '{}': {attribute} attribute has {len} elements, expected {}; attribute dropped",
            self.name,
            self.positions.len()
        );
        false
    }

    #[must_use]
    pub fn features(&self) -> GeometryFeatures {
        let mut features = GeometryFeatures::empty();
        features.set(GeometryFeatures::USE_NORMAL, self.normals.is_some());
        features.set(GeometryFeatures::USE_TANGENT, self.tangents.is_some());
        features.set(GeometryFeatures::USE_UV, self.uvs.is_some());
        features.set(GeometryFeatures::USE_COLOR, self.colors.is_some());
        features.set(GeometryFeatures::USE_INDEX, self.indices.is_some());
        features
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    #[must_use]
    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn tangents(&self) -> Option<&[Vec4]> {
        self.tangents.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn uvs(&self) -> Option<&[Vec2]> {
        self.uvs.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn colors(&self) -> Option<&[Vec4]> {
        self.colors.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Bind-pose bounding box of the positions.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    #[must_use]
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.bounding_sphere
    }

    /// Recomputes the bind-pose AABB and a sphere centered on it.
    pub fn compute_bounding_volume(&mut self) {
        if self.positions.is_empty() {
            self.bounding_box = None;
            self.bounding_sphere = None;
            return;
        }

        // Pass 1: AABB
        let mut bbox = BoundingBox::EMPTY;
        for &p in &self.positions {
            bbox.expand_by_point(p);
        }

        // Pass 2: radius around the AABB center
        let center = bbox.center();
        let max_dist_sq = self
            .positions
            .iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0_f32, f32::max);

        self.bounding_box = Some(bbox);
        self.bounding_sphere = Some(BoundingSphere::new(center, max_dist_sq.sqrt()));
    }
}
