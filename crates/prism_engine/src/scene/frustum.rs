//! Frustum planes and corners used for culling and shadow fitting

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Plane defined by normal and distance from origin
///
/// Points with a non-negative signed distance are on the inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized, pointing inward)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Build a normalized plane from raw `ax + by + cz + d` coefficients
    fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = Vec3::new(coefficients.x, coefficients.y, coefficients.z);
        let length = normal.norm();
        if length <= f32::EPSILON {
            return Self { normal: Vec3::zeros(), distance: 0.0 };
        }
        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Dot product of the plane normal with a direction
    pub fn dot_direction(&self, direction: &Vec3) -> f32 {
        self.normal.dot(direction)
    }
}

/// Index of each plane in [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum FrustumPlane {
    /// Left side plane
    Left = 0,
    /// Right side plane
    Right = 1,
    /// Bottom side plane
    Bottom = 2,
    /// Top side plane
    Top = 3,
    /// Near plane
    Near = 4,
    /// Far plane
    Far = 5,
}

/// Frustum for visibility culling
///
/// Planes are ordered left, right, bottom, top, near, far, so the first four
/// are the side planes. Corners hold the four near corners followed by the
/// four far corners, with `corners[i + 4]` behind `corners[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six inward-facing planes
    pub planes: [Plane; 6],
    /// Eight world-space corners (near first)
    pub corners: [Vec3; 8],
}

impl Frustum {
    /// Extract frustum planes and corners from a view-projection matrix
    ///
    /// Planes come from the Gribb-Hartmann method for GL-style clip space;
    /// corners from unprojecting the NDC cube. A singular matrix yields corners
    /// at the origin.
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let m = view_projection;
        let row = |i: usize| Vec4::new(m[(i, 0)], m[(i, 1)], m[(i, 2)], m[(i, 3)]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let planes = [
            Plane::from_coefficients(r3 + r0),
            Plane::from_coefficients(r3 - r0),
            Plane::from_coefficients(r3 + r1),
            Plane::from_coefficients(r3 - r1),
            Plane::from_coefficients(r3 + r2),
            Plane::from_coefficients(r3 - r2),
        ];

        let inverse = view_projection.try_inverse().unwrap_or_else(Mat4::zeros);
        let ndc = [
            (-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0),
        ];
        let mut corners = [Vec3::zeros(); 8];
        for (i, (x, y)) in ndc.iter().enumerate() {
            corners[i] = unproject(&inverse, Vec4::new(*x, *y, -1.0, 1.0));
            corners[i + 4] = unproject(&inverse, Vec4::new(*x, *y, 1.0, 1.0));
        }

        Self { planes, corners }
    }

    /// Get a single plane
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// The four side planes (left, right, bottom, top)
    pub fn side_planes(&self) -> &[Plane] {
        &self.planes[..4]
    }
}

fn unproject(inverse: &Mat4, ndc: Vec4) -> Vec3 {
    let p = inverse * ndc;
    if p.w.abs() <= f32::EPSILON {
        return Vec3::zeros();
    }
    Vec3::new(p.x / p.w, p.y / p.w, p.z / p.w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    #[test]
    fn test_orthographic_frustum_planes_and_corners() {
        let projection = Mat4::orthographic_off_center(-1.0, 1.0, -2.0, 2.0, 0.0, 10.0);
        let frustum = Frustum::from_matrix(&projection);

        let inside = Vec3::new(0.0, 5.0, 0.0);
        assert!(frustum.planes.iter().all(|p| p.distance_to_point(&inside) > 0.0));

        let behind = Vec3::new(0.0, -1.0, 0.0);
        assert!(frustum.plane(FrustumPlane::Near).distance_to_point(&behind) < 0.0);

        let beyond_right = Vec3::new(3.0, 5.0, 0.0);
        assert!(frustum.plane(FrustumPlane::Right).distance_to_point(&beyond_right) < 0.0);

        assert_relative_eq!(frustum.corners[0], Vec3::new(-1.0, 0.0, -2.0), epsilon = 1e-5);
        assert_relative_eq!(frustum.corners[6], Vec3::new(1.0, 10.0, 2.0), epsilon = 1e-5);
    }

    #[test]
    fn test_far_corner_matches_near_corner_direction() {
        let projection = Mat4::perspective_y_forward(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 10.0);
        let frustum = Frustum::from_matrix(&projection);

        for i in 0..4 {
            let near = frustum.corners[i];
            let far = frustum.corners[i + 4];
            assert_relative_eq!(near.y, 1.0, epsilon = 1e-4);
            assert_relative_eq!(far.y, 10.0, epsilon = 1e-3);
            assert_relative_eq!(far, near * 10.0, epsilon = 1e-3);
        }
    }
}
