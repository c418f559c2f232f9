//! # Camera
//!
//! Cameras used by the collector and the shadow renderer.
//!
//! ## Conventions
//!
//! A camera looks along the local +Y axis of its world matrix with local +Z
//! up. Projections map view-space Y onto clip depth, using GL-style clip space
//! (`-w <= z <= w`). Derived matrices and the frustum are recomputed eagerly
//! on every change, so reads are free.

use std::sync::Arc;

use crate::foundation::math::{Mat4, Mat4Ext, Vec3, utils};
use crate::scene::{Frustum, NodeId, Scene};

use super::effect::PostEffect;

/// Projection model of a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        /// Aspect ratio (width / height)
        aspect: f32,
    },
    /// Off-center orthographic box
    Orthographic {
        /// Minimum local X
        left: f32,
        /// Maximum local X
        right: f32,
        /// Minimum local Z
        bottom: f32,
        /// Maximum local Z
        top: f32,
    },
}

/// View and projection state with a cached frustum
///
/// # Coordinate System
/// - X+ = Right
/// - Y+ = Forward
/// - Z+ = Up
#[derive(Debug, Clone)]
pub struct Camera {
    world_matrix: Mat4,
    view_matrix: Mat4,
    projection: Projection,
    near: f32,
    far: f32,
    projection_matrix: Mat4,
    view_projection_matrix: Mat4,
    frustum: Frustum,
    effects: Vec<Arc<PostEffect>>,
}

impl Camera {
    /// Create a perspective camera at the origin looking along +Y
    ///
    /// # Arguments
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use prism_engine::render::Camera;
    ///
    /// let camera = Camera::perspective(60.0, 16.0 / 9.0, 0.1, 100.0);
    /// assert_eq!(camera.far_distance(), 100.0);
    /// ```
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_projection(
            Projection::Perspective { fov_y: utils::deg_to_rad(fov_degrees), aspect },
            near,
            far,
        )
    }

    /// Create an off-center orthographic camera at the origin looking along +Y
    ///
    /// `left`/`right` bound local X and `bottom`/`top` bound local Z. Near may
    /// be negative: orthographic cameras also see behind their origin.
    pub fn orthographic_off_center(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Orthographic { left, right, bottom, top }, near, far)
    }

    fn with_projection(projection: Projection, near: f32, far: f32) -> Self {
        let mut camera = Self {
            world_matrix: Mat4::identity(),
            view_matrix: Mat4::identity(),
            projection,
            near,
            far,
            projection_matrix: Mat4::identity(),
            view_projection_matrix: Mat4::identity(),
            frustum: Frustum::from_matrix(&Mat4::identity()),
            effects: Vec::new(),
        };
        camera.update_matrices();
        camera
    }

    /// Place the camera with a world matrix
    pub fn set_world_matrix(&mut self, world_matrix: Mat4) {
        self.world_matrix = world_matrix;
        self.view_matrix = world_matrix.try_inverse().unwrap_or_else(Mat4::identity);
        self.update_view_projection();
    }

    /// Place the camera at a scene node's world transform
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a live node of `scene`.
    pub fn sync_with_node(&mut self, scene: &Scene, node: NodeId) {
        self.set_world_matrix(scene.world_matrix(node));
    }

    /// Replace the projection model
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.update_matrices();
    }

    /// Set the orthographic box, switching to an orthographic projection
    pub fn set_bounds(&mut self, left: f32, right: f32, bottom: f32, top: f32) {
        self.set_projection(Projection::Orthographic { left, right, bottom, top });
    }

    /// Set the clip distances
    pub fn set_near_far(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.update_matrices();
    }

    /// Update the aspect ratio of a perspective camera
    ///
    /// Has no effect on orthographic cameras.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if let Projection::Perspective { fov_y, .. } = self.projection {
            self.projection = Projection::Perspective { fov_y, aspect };
            self.update_matrices();
            log::trace!("Camera aspect ratio updated to {:.3}", aspect);
        }
    }

    fn update_matrices(&mut self) {
        self.projection_matrix = match self.projection {
            Projection::Perspective { fov_y, aspect } => {
                Mat4::perspective_y_forward(fov_y, aspect, self.near, self.far)
            }
            Projection::Orthographic { left, right, bottom, top } => {
                Mat4::orthographic_off_center(left, right, bottom, top, self.near, self.far)
            }
        };
        self.update_view_projection();
    }

    fn update_view_projection(&mut self) {
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(&self.view_projection_matrix);
    }

    /// Camera-to-world matrix
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// World-to-camera matrix
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Camera-to-clip matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// World-to-clip matrix
    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection_matrix
    }

    /// World-space frustum
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Projection model
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Near clip distance
    pub fn near_distance(&self) -> f32 {
        self.near
    }

    /// Far clip distance
    pub fn far_distance(&self) -> f32 {
        self.far
    }

    /// World-space position
    pub fn position(&self) -> Vec3 {
        self.world_matrix.axis(3)
    }

    /// World-space viewing direction (local +Y), normalized
    pub fn forward(&self) -> Vec3 {
        self.world_matrix.axis(1).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y)
    }

    /// Post effects applied to this camera's image
    pub fn effects(&self) -> &[Arc<PostEffect>] {
        &self.effects
    }

    /// Append a post effect
    pub fn add_effect(&mut self, effect: Arc<PostEffect>) {
        self.effects.push(effect);
    }

    /// Remove all post effects
    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use approx::assert_relative_eq;

    #[test]
    fn test_frustum_follows_world_matrix() {
        let mut camera = Camera::perspective(90.0, 1.0, 0.1, 100.0);
        let ahead = Vec3::new(0.0, 10.0, 0.0);
        assert!(camera.frustum().planes.iter().all(|p| p.distance_to_point(&ahead) > 0.0));

        camera.set_world_matrix(Transform::looking_along(Vec3::zeros(), -Vec3::y()).to_matrix());
        assert!(camera.frustum().planes.iter().any(|p| p.distance_to_point(&ahead) < 0.0));
        assert_relative_eq!(camera.forward(), -Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn test_orthographic_bounds_update_frustum() {
        let mut camera = Camera::orthographic_off_center(-1.0, 1.0, -1.0, 1.0, 0.0, 10.0);
        camera.set_bounds(4.0, 6.0, -1.0, 1.0);

        let corners = &camera.frustum().corners;
        assert_relative_eq!(corners[0], Vec3::new(4.0, 0.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(corners[6], Vec3::new(6.0, 10.0, 1.0), epsilon = 1e-4);
    }

    #[test]
    fn test_translated_camera_position() {
        let mut camera = Camera::perspective(60.0, 1.5, 0.5, 50.0);
        camera.set_world_matrix(Transform::from_position(Vec3::new(1.0, 2.0, 3.0)).to_matrix());
        assert_relative_eq!(camera.position(), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
        assert_relative_eq!(
            camera.view_matrix() * camera.world_matrix(),
            Mat4::identity(),
            epsilon = 1e-5
        );
    }
}
