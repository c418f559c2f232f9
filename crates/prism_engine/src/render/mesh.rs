//! Drawable geometry: meshes, mesh instances and the model component

use std::sync::Arc;

use crate::ecs::Component;
use crate::foundation::math::Mat4;
use crate::impl_component_any;
use crate::scene::{Aabb, SceneVisitor, VisitContext};

use super::material::Material;

/// Identity of a mesh's GPU buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// Geometry uploaded to the GPU, described by what the core needs
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    id: MeshId,
    name: String,
    bounds: Aabb,
    num_indices: u32,
}

impl Mesh {
    /// Describe a mesh by id, local bounds and index count
    pub fn new(id: MeshId, name: impl Into<String>, bounds: Aabb, num_indices: u32) -> Self {
        Self { id, name: name.into(), bounds, num_indices }
    }

    /// Buffer identity
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Mesh name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local-space bounds
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Indices drawn per call
    pub fn num_indices(&self) -> u32 {
        self.num_indices
    }
}

/// Joint matrices of a skinned model for the current frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonPose {
    /// One matrix per joint, in skeleton order
    pub joint_matrices: Vec<Mat4>,
}

/// A mesh paired with the material it is drawn with
#[derive(Debug, Clone)]
pub struct MeshInstance {
    mesh: Arc<Mesh>,
    material: Arc<Material>,
    visible: bool,
}

impl MeshInstance {
    /// Pair a mesh with a material
    pub fn new(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self { mesh, material, visible: true }
    }

    /// Geometry
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// Material
    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    /// Swap the material
    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = material;
    }

    /// Whether the instance is drawn
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show or hide this instance only
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Component drawing a set of mesh instances at its entity
#[derive(Debug, Clone)]
pub struct ModelInstance {
    mesh_instances: Vec<MeshInstance>,
    cast_shadows: bool,
    skeleton_pose: Option<Arc<SkeletonPose>>,
}

impl ModelInstance {
    /// Model drawing the given instances; casts shadows by default
    pub fn new(mesh_instances: Vec<MeshInstance>) -> Self {
        Self { mesh_instances, cast_shadows: true, skeleton_pose: None }
    }

    /// Single mesh with a single material
    pub fn from_mesh(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self::new(vec![MeshInstance::new(mesh, material)])
    }

    /// Mesh instances in draw order
    pub fn mesh_instances(&self) -> &[MeshInstance] {
        &self.mesh_instances
    }

    /// Mutable mesh instances; changing meshes changes bounds
    pub fn mesh_instances_mut(&mut self) -> &mut [MeshInstance] {
        &mut self.mesh_instances
    }

    /// Append a mesh instance
    pub fn add_mesh_instance(&mut self, instance: MeshInstance) {
        self.mesh_instances.push(instance);
    }

    /// Whether the model is drawn into shadow maps
    pub fn casts_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// Enable or disable shadow casting
    pub fn set_cast_shadows(&mut self, cast_shadows: bool) {
        self.cast_shadows = cast_shadows;
    }

    /// Current skinning pose
    pub fn skeleton_pose(&self) -> Option<&Arc<SkeletonPose>> {
        self.skeleton_pose.as_ref()
    }

    /// Replace the skinning pose
    pub fn set_skeleton_pose(&mut self, pose: Option<Arc<SkeletonPose>>) {
        self.skeleton_pose = pose;
    }
}

impl Component for ModelInstance {
    fn bounds(&self) -> Option<Aabb> {
        let bounds = self
            .mesh_instances
            .iter()
            .fold(Aabb::empty(), |acc, instance| acc.union(instance.mesh.bounds()));
        Some(bounds)
    }

    fn accept_visitor(&self, ctx: &VisitContext<'_>, visitor: &mut dyn SceneVisitor) {
        visitor.visit_model_instance(self, ctx);
    }

    impl_component_any!();
}

/// Background model drawn around the camera
///
/// Always collected, regardless of culling, with the root's transform.
#[derive(Debug, Clone)]
pub struct Skybox {
    model: ModelInstance,
}

impl Skybox {
    /// Skybox drawing `mesh` with `material`
    pub fn new(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        let mut model = ModelInstance::from_mesh(mesh, material);
        model.set_cast_shadows(false);
        Self { model }
    }

    /// The skybox geometry
    pub fn model(&self) -> &ModelInstance {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::RenderPath;

    #[test]
    fn test_model_bounds_cover_all_meshes() {
        let material = Arc::new(Material::new("m", RenderPath::Deferred));
        let a = Arc::new(Mesh::new(MeshId(1), "a", Aabb::new(Vec3::zeros(), Vec3::repeat(1.0)), 36));
        let b = Arc::new(Mesh::new(MeshId(2), "b", Aabb::new(Vec3::repeat(-2.0), Vec3::zeros()), 36));
        let model = ModelInstance::new(vec![
            MeshInstance::new(a, Arc::clone(&material)),
            MeshInstance::new(b, material),
        ]);

        let bounds = model.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::repeat(-2.0));
        assert_eq!(bounds.max, Vec3::repeat(1.0));
        assert!(model.casts_shadows());
    }
}
