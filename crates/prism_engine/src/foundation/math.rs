//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics.
//!
//! ## Conventions
//!
//! World space is right-handed and Z-up. Cameras and lights look along their
//! local +Y axis, so the forward axis of any node is column 1 of its world
//! matrix. Clip space follows the GL convention (`-w <= z <= w`).

pub use nalgebra::{
    Vector3, Vector4,
    Matrix4,
    Quaternion,
    Rotation3,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform with position and uniform scale
    pub fn from_position_scale(position: Vec3, scale: f32) -> Self {
        Self {
            position,
            scale: Vec3::new(scale, scale, scale),
            ..Default::default()
        }
    }

    /// Create a transform at `position` whose forward (+Y) axis points along `direction`
    ///
    /// The local up (+Z) axis stays as close to world +Z as possible. When the
    /// direction is (anti)parallel to world Z, world +X is used as the reference instead.
    pub fn looking_along(position: Vec3, direction: Vec3) -> Self {
        Self::from_position_rotation(position, utils::rotation_looking_along(direction))
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Tolerance used when comparing directions against plane normals
    pub const DIRECTION_EPSILON: f32 = 0.001;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Quat, Rotation3, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Component-wise linear interpolation between two points
    pub fn lerp_vec3(a: &Vec3, b: &Vec3, t: f32) -> Vec3 {
        a + (b - a) * t
    }

    /// Rotation mapping local +Y onto `direction`, keeping local +Z near world +Z
    pub fn rotation_looking_along(direction: Vec3) -> Quat {
        let forward = direction
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::y);
        let reference = if forward.z.abs() > 0.999 { Vec3::x() } else { Vec3::z() };
        let right = forward.cross(&reference).normalize();
        let up = right.cross(&forward);
        let rotation = Rotation3::from_basis_unchecked(&[right, forward, up]);
        Quat::from_rotation_matrix(&rotation)
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a perspective projection for a camera looking along local +Y
    ///
    /// `fov_y` is the vertical field of view in radians, measured around the
    /// camera's local Z (up) axis.
    fn perspective_y_forward(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create an off-center orthographic projection for a camera looking along local +Y
    ///
    /// `left`/`right` bound local X, `bottom`/`top` bound local Z, `near`/`far`
    /// bound local Y. Near may be negative.
    fn orthographic_off_center(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Extract a basis column as a 3D vector
    fn axis(&self, column: usize) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn perspective_y_forward(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let y_scale = 1.0 / (fov_y * 0.5).tan();
        let x_scale = y_scale / aspect;
        let depth = far - near;

        // rows: clip x, clip y, clip z, clip w; columns: view x, y (forward), z (up), 1
        Mat4::new(
            x_scale, 0.0, 0.0, 0.0,
            0.0, 0.0, y_scale, 0.0,
            0.0, (far + near) / depth, 0.0, -2.0 * far * near / depth,
            0.0, 1.0, 0.0, 0.0,
        )
    }

    fn orthographic_off_center(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;

        Mat4::new(
            2.0 / width, 0.0, 0.0, -(right + left) / width,
            0.0, 0.0, 2.0 / height, -(top + bottom) / height,
            0.0, 2.0 / depth, 0.0, -(far + near) / depth,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn axis(&self, column: usize) -> Vec3 {
        Vec3::new(self[(0, column)], self[(1, column)], self[(2, column)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_matrix_applies_scale_rotation_translation() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_axis_angle(&Vec3::z_axis(), constants::PI * 0.5),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let p = transform.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(1.0, 4.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    fn test_looking_along_maps_forward_axis() {
        let direction = Vec3::new(1.0, -1.0, -2.0).normalize();
        let matrix = Transform::looking_along(Vec3::zeros(), direction).to_matrix();

        assert_relative_eq!(matrix.axis(1), direction, epsilon = 1e-5);
        // up stays orthogonal to forward
        assert_relative_eq!(matrix.axis(2).dot(&direction), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_looking_straight_down_is_well_defined() {
        let matrix = Transform::looking_along(Vec3::zeros(), -Vec3::z()).to_matrix();
        assert_relative_eq!(matrix.axis(1), -Vec3::z(), epsilon = 1e-5);
        assert!(matrix.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_clip_bounds() {
        let projection = Mat4::perspective_y_forward(utils::deg_to_rad(60.0), 1.5, 0.5, 50.0);

        let near = projection * Vec4::new(0.0, 0.5, 0.0, 1.0);
        let far = projection * Vec4::new(0.0, 50.0, 0.0, 1.0);

        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_orthographic_off_center_maps_box_to_ndc() {
        let projection = Mat4::orthographic_off_center(-2.0, 6.0, 1.0, 3.0, -4.0, 4.0);

        let min = projection * Vec4::new(-2.0, -4.0, 1.0, 1.0);
        let max = projection * Vec4::new(6.0, 4.0, 3.0, 1.0);

        assert_relative_eq!(min, Vec4::new(-1.0, -1.0, -1.0, 1.0), epsilon = 1e-5);
        assert_relative_eq!(max, Vec4::new(1.0, 1.0, 1.0, 1.0), epsilon = 1e-5);
    }
}
