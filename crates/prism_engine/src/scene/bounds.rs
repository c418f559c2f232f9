//! Axis-aligned bounding volumes

use crate::foundation::math::{Mat4, Vec3};
use super::frustum::Plane;

/// How much of space a bounding volume covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expanse {
    /// Covers nothing; the identity for union
    Empty,
    /// Covers the box between `min` and `max`
    Finite,
    /// Covers all of space (directional lights, skyboxes)
    Infinite,
}

/// Axis-Aligned Bounding Box for spatial queries
///
/// Bounds used for culling must be conservative: never smaller than the
/// geometry they enclose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
    expanse: Expanse,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max, expanse: Expanse::Finite }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self::new(center - extents, center + extents)
    }

    /// Bounds covering nothing
    pub fn empty() -> Self {
        Self {
            min: Vec3::zeros(),
            max: Vec3::zeros(),
            expanse: Expanse::Empty,
        }
    }

    /// Bounds covering everything
    pub fn infinite() -> Self {
        Self {
            min: Vec3::repeat(f32::NEG_INFINITY),
            max: Vec3::repeat(f32::INFINITY),
            expanse: Expanse::Infinite,
        }
    }

    /// Smallest box around a set of points; empty when `points` is empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds.grow_to_include_point(point);
        }
        bounds
    }

    /// The kind of region covered
    pub fn expanse(&self) -> Expanse {
        self.expanse
    }

    /// Whether the volume covers nothing
    pub fn is_empty(&self) -> bool {
        self.expanse == Expanse::Empty
    }

    /// Whether the volume covers all of space
    pub fn is_infinite(&self) -> bool {
        self.expanse == Expanse::Infinite
    }

    /// Get the center of the AABB (origin for empty or infinite bounds)
    pub fn center(&self) -> Vec3 {
        match self.expanse {
            Expanse::Finite => (self.min + self.max) * 0.5,
            _ => Vec3::zeros(),
        }
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        match self.expanse {
            Expanse::Finite => (self.max - self.min) * 0.5,
            Expanse::Empty => Vec3::zeros(),
            Expanse::Infinite => Vec3::repeat(f32::INFINITY),
        }
    }

    /// Reset to empty
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Extend to cover `point`
    pub fn grow_to_include_point(&mut self, point: &Vec3) {
        match self.expanse {
            Expanse::Empty => *self = Self::new(*point, *point),
            Expanse::Finite => {
                self.min = self.min.inf(point);
                self.max = self.max.sup(point);
            }
            Expanse::Infinite => {}
        }
    }

    /// Extend to cover `other`
    pub fn grow_to_include(&mut self, other: &Aabb) {
        match (self.expanse, other.expanse) {
            (_, Expanse::Empty) | (Expanse::Infinite, _) => {}
            (Expanse::Empty, _) | (_, Expanse::Infinite) => *self = *other,
            (Expanse::Finite, Expanse::Finite) => {
                self.min = self.min.inf(&other.min);
                self.max = self.max.sup(&other.max);
            }
        }
    }

    /// Union of two volumes
    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut result = *self;
        result.grow_to_include(other);
        result
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        match self.expanse {
            Expanse::Empty => false,
            Expanse::Infinite => true,
            Expanse::Finite => {
                point.x >= self.min.x && point.x <= self.max.x &&
                point.y >= self.min.y && point.y <= self.max.y &&
                point.z >= self.min.z && point.z <= self.max.z
            }
        }
    }

    /// Check if this AABB fully contains another volume
    pub fn contains(&self, other: &Aabb) -> bool {
        match (self.expanse, other.expanse) {
            (_, Expanse::Empty) | (Expanse::Infinite, _) => true,
            (Expanse::Empty, _) | (Expanse::Finite, Expanse::Infinite) => false,
            (Expanse::Finite, Expanse::Finite) => {
                self.contains_point(&other.min) && self.contains_point(&other.max)
            }
        }
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        match (self.expanse, other.expanse) {
            (Expanse::Empty, _) | (_, Expanse::Empty) => false,
            (Expanse::Infinite, _) | (_, Expanse::Infinite) => true,
            (Expanse::Finite, Expanse::Finite) => {
                self.min.x <= other.max.x && self.max.x >= other.min.x &&
                self.min.y <= other.max.y && self.max.y >= other.min.y &&
                self.min.z <= other.max.z && self.max.z >= other.min.z
            }
        }
    }

    /// Conservative test against a convex solid bounded by inward-facing planes
    ///
    /// Returns false only when the box lies entirely outside one of the planes.
    pub fn intersects_convex_solid(&self, planes: &[Plane]) -> bool {
        match self.expanse {
            Expanse::Empty => false,
            Expanse::Infinite => true,
            Expanse::Finite => planes.iter().all(|plane| {
                // corner furthest along the plane normal
                let mut p = self.min;
                if plane.normal.x >= 0.0 { p.x = self.max.x; }
                if plane.normal.y >= 0.0 { p.y = self.max.y; }
                if plane.normal.z >= 0.0 { p.z = self.max.z; }
                plane.distance_to_point(&p) >= 0.0
            }),
        }
    }

    /// Bounds of this box after an affine transform
    ///
    /// Uses the absolute-matrix method, so the result is the tightest AABB
    /// around the transformed box.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.expanse != Expanse::Finite {
            return *self;
        }

        let center = self.center();
        let extents = self.extents();
        let new_center = matrix.transform_point(&center.into()).coords;

        let mut new_extents = Vec3::zeros();
        for row in 0..3 {
            new_extents[row] = (0..3)
                .map(|col| matrix[(row, col)].abs() * extents[col])
                .sum();
        }

        Aabb::from_center_extents(new_center, new_extents)
    }
}
