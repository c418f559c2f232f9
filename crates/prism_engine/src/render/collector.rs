//! Frustum-culling scene collector
//!
//! [`RenderCollector`] walks the scene once per camera and produces the draw
//! lists a frame needs:
//!
//! ```text
//! opaque lists    one per RenderPath, front to back
//! transparents    back to front
//! lights          directional, point, spot; shadow casters first per type
//! effects         scene effects, then the camera's own effects
//! ```
//!
//! Sorting uses the projection of each item's bounds center onto the camera's
//! forward axis rather than true view depth.

use std::sync::Arc;

use log::trace;

use crate::config::RenderOptions;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::scene::{Aabb, ComponentId, NodeId, Plane, Scene, SceneVisitor, VisitContext};

use super::camera::Camera;
use super::effect::PostEffect;
use super::light::{AmbientLight, Light};
use super::material::RenderPath;
use super::mesh::ModelInstance;
use super::render_item::{RenderItem, RenderItemPool, RenderList};

/// A light found during collection, resolved to world space
#[derive(Debug, Clone)]
pub struct CollectedLight {
    /// Entity carrying the light
    pub entity: NodeId,
    /// The light component
    pub component: ComponentId,
    /// Light parameters at collection time
    pub light: Light,
    /// World-space position of the entity
    pub position: Vec3,
    /// World-space direction the light shines in
    pub direction: Vec3,
}

/// Scene visitor producing culled, bucketed and sorted render lists
///
/// Every [`collect`](Self::collect) resets all outputs. Lists borrow the
/// collector, so they cannot outlive the next collection.
#[derive(Debug)]
pub struct RenderCollector {
    pool: RenderItemPool,
    opaques: [Vec<usize>; 3],
    transparents: Vec<usize>,
    lights: Vec<CollectedLight>,
    shadow_casters: Vec<CollectedLight>,
    effects: Vec<Arc<PostEffect>>,
    ambient_color: Vec3,
    camera_forward: Vec3,
    frustum_planes: Vec<Plane>,
    ambient_occlusion: bool,
    needs_normal_depth: bool,
    needs_backbuffer: bool,
    needs_forward_path: bool,
}

impl RenderCollector {
    /// Collector honoring `options` (ambient occlusion forces normal/depth)
    pub fn new(options: &RenderOptions) -> Self {
        Self {
            pool: RenderItemPool::new(),
            opaques: Default::default(),
            transparents: Vec::new(),
            lights: Vec::new(),
            shadow_casters: Vec::new(),
            effects: Vec::new(),
            ambient_color: Vec3::zeros(),
            camera_forward: Vec3::y(),
            frustum_planes: Vec::new(),
            ambient_occlusion: options.ambient_occlusion,
            needs_normal_depth: options.ambient_occlusion,
            needs_backbuffer: false,
            needs_forward_path: false,
        }
    }

    /// Gather everything `camera` can see in `scene`
    pub fn collect(&mut self, camera: &Camera, scene: &Scene) {
        self.reset();
        self.camera_forward = camera.forward();
        self.frustum_planes.extend_from_slice(&camera.frustum().planes);

        scene.accept_visitor(self);

        for list in &mut self.opaques {
            self.pool.sort_indices(list, false);
        }
        self.pool.sort_indices(&mut self.transparents, true);
        sort_lights(&mut self.lights);

        for effect in camera.effects() {
            self.needs_normal_depth |= effect.needs_normal_depth();
            self.effects.push(Arc::clone(effect));
        }

        self.needs_forward_path = !self.transparents.is_empty()
            || RenderPath::ALL
                .iter()
                .filter(|path| path.is_forward())
                .any(|path| !self.opaques[path.index()].is_empty());

        trace!(
            "Collected {} items ({} transparent), {} lights, {} effects",
            self.pool.len(),
            self.transparents.len(),
            self.lights.len(),
            self.effects.len()
        );
    }

    fn reset(&mut self) {
        self.pool.reset();
        for list in &mut self.opaques {
            list.clear();
        }
        self.transparents.clear();
        self.lights.clear();
        self.shadow_casters.clear();
        self.effects.clear();
        self.frustum_planes.clear();
        self.ambient_color = Vec3::zeros();
        self.needs_normal_depth = self.ambient_occlusion;
        self.needs_backbuffer = false;
        self.needs_forward_path = false;
    }

    fn add_model(
        &mut self,
        model: &ModelInstance,
        entity: Option<NodeId>,
        world_matrix: Mat4,
        world_bounds: Aabb,
    ) {
        let hint = world_bounds.center().dot(&self.camera_forward);

        for (mesh_index, instance) in model.mesh_instances().iter().enumerate() {
            if !instance.is_visible() {
                continue;
            }
            let material = instance.material();
            self.needs_normal_depth |= material.needs_normal_depth();
            self.needs_backbuffer |= material.needs_backbuffer();

            let index = self.pool.push(RenderItem {
                material: Arc::clone(material),
                mesh: Arc::clone(instance.mesh()),
                mesh_index,
                entity,
                world_matrix,
                world_bounds,
                skeleton: model.skeleton_pose().cloned(),
                render_order_hint: hint,
            });

            if material.is_transparent() {
                self.transparents.push(index);
            } else {
                self.opaques[material.render_path().index()].push(index);
            }
        }
    }

    /// Opaque items drawn with `path`, front to back
    pub fn opaque_items(&self, path: RenderPath) -> RenderList<'_> {
        RenderList::new(&self.pool, &self.opaques[path.index()])
    }

    /// Blended or back-buffer-reading items, back to front
    pub fn transparent_items(&self) -> RenderList<'_> {
        RenderList::new(&self.pool, &self.transparents)
    }

    /// Visible lights in render order
    pub fn lights(&self) -> &[CollectedLight] {
        &self.lights
    }

    /// Visible lights that cast shadows, in visit order
    pub fn shadow_casters(&self) -> &[CollectedLight] {
        &self.shadow_casters
    }

    /// Post effects, scene effects first
    pub fn effects(&self) -> &[Arc<PostEffect>] {
        &self.effects
    }

    /// Sum of all visible ambient lights
    pub fn ambient_color(&self) -> Vec3 {
        self.ambient_color
    }

    /// Whether a normal/depth buffer must be rendered this frame
    pub fn needs_normal_depth(&self) -> bool {
        self.needs_normal_depth
    }

    /// Whether any material samples the back buffer
    pub fn needs_backbuffer(&self) -> bool {
        self.needs_backbuffer
    }

    /// Whether the forward renderer has any work
    pub fn needs_forward_path(&self) -> bool {
        self.needs_forward_path
    }
}

fn sort_lights(lights: &mut [CollectedLight]) {
    lights.sort_by_key(|entry| (entry.light.light_type.priority(), !entry.light.cast_shadows));
}

impl SceneVisitor for RenderCollector {
    fn qualifies(&mut self, scene: &Scene, node: NodeId) -> bool {
        scene.is_visible(node) && scene.world_bounds(node).intersects_convex_solid(&self.frustum_planes)
    }

    fn visit_scene(&mut self, scene: &Scene) {
        if let Some(skybox) = scene.skybox() {
            let root = scene.root();
            self.add_model(skybox.model(), None, scene.world_matrix(root), scene.world_bounds(root));
        }
    }

    fn visit_model_instance(&mut self, model: &ModelInstance, ctx: &VisitContext<'_>) {
        self.add_model(model, Some(ctx.entity), ctx.world_matrix, ctx.world_bounds);
    }

    fn visit_light(&mut self, light: &Light, ctx: &VisitContext<'_>) {
        let entry = CollectedLight {
            entity: ctx.entity,
            component: ctx.component,
            light: light.clone(),
            position: ctx.world_matrix.axis(3),
            direction: ctx.world_matrix.axis(1).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y),
        };
        if light.cast_shadows {
            self.shadow_casters.push(entry.clone());
        }
        self.lights.push(entry);
    }

    fn visit_ambient_light(&mut self, light: &AmbientLight, _ctx: &VisitContext<'_>) {
        self.ambient_color += light.radiance();
    }

    fn visit_effects(&mut self, effects: &[Arc<PostEffect>], _ctx: &VisitContext<'_>) {
        self.effects.extend(effects.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use crate::render::{BlendState, EffectsComponent, MaterialFlags, Material, Mesh, MeshId, Skybox};
    use approx::assert_relative_eq;

    fn unit_mesh(id: u32) -> Arc<Mesh> {
        Arc::new(Mesh::new(MeshId(id), "cube", Aabb::new(Vec3::repeat(-0.5), Vec3::repeat(0.5)), 36))
    }

    fn add_model(scene: &mut Scene, position: Vec3, material: &Arc<Material>) -> NodeId {
        let entity = scene.create_entity();
        scene.set_transform(entity, Transform::from_position(position)).unwrap();
        let model = scene.create_component(ModelInstance::from_mesh(unit_mesh(1), Arc::clone(material)));
        scene.add_component(entity, model).unwrap();
        scene.add_child(entity).unwrap();
        entity
    }

    fn camera() -> Camera {
        Camera::perspective(90.0, 1.0, 0.1, 100.0)
    }

    fn hints(list: RenderList<'_>) -> Vec<f32> {
        list.iter().map(|item| item.render_order_hint).collect()
    }

    #[test]
    fn test_culls_objects_outside_frustum() {
        let mut scene = Scene::new();
        let material = Arc::new(Material::new("opaque", RenderPath::Deferred));
        let ahead = add_model(&mut scene, Vec3::new(0.0, 10.0, 0.0), &material);
        add_model(&mut scene, Vec3::new(0.0, -10.0, 0.0), &material);
        add_model(&mut scene, Vec3::new(0.0, 500.0, 0.0), &material);

        let mut collector = RenderCollector::new(&RenderOptions::default());
        collector.collect(&camera(), &scene);

        let items: Vec<_> = collector.opaque_items(RenderPath::Deferred).iter().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].entity, Some(ahead));
        assert!(!collector.needs_forward_path());
    }

    #[test]
    fn test_hidden_subtrees_are_skipped() {
        let mut scene = Scene::new();
        let material = Arc::new(Material::new("opaque", RenderPath::Deferred));
        let entity = add_model(&mut scene, Vec3::new(0.0, 10.0, 0.0), &material);
        scene.set_visible(entity, false).unwrap();

        let mut collector = RenderCollector::new(&RenderOptions::default());
        collector.collect(&camera(), &scene);
        assert!(collector.opaque_items(RenderPath::Deferred).is_empty());
    }

    #[test]
    fn test_sort_order_front_to_back_and_back_to_front() {
        let mut scene = Scene::new();
        let opaque = Arc::new(Material::new("opaque", RenderPath::ForwardFixed));
        let glass = Arc::new(Material::new("glass", RenderPath::ForwardDynamic).with_blend_state(BlendState::ALPHA));
        for depth in [5.0, 9.0, 1.0] {
            add_model(&mut scene, Vec3::new(0.0, depth, 0.0), &opaque);
            add_model(&mut scene, Vec3::new(0.0, depth, 0.0), &glass);
        }

        let mut collector = RenderCollector::new(&RenderOptions::default());
        collector.collect(&camera(), &scene);

        assert_eq!(hints(collector.opaque_items(RenderPath::ForwardFixed)), vec![1.0, 5.0, 9.0]);
        assert_eq!(hints(collector.transparent_items()), vec![9.0, 5.0, 1.0]);
        assert!(collector.opaque_items(RenderPath::ForwardDynamic).is_empty());
        assert!(collector.needs_forward_path());
    }

    #[test]
    fn test_backbuffer_materials_are_transparent() {
        let mut scene = Scene::new();
        let water = Arc::new(
            Material::new("water", RenderPath::Deferred).with_flags(MaterialFlags::NEEDS_BACKBUFFER),
        );
        add_model(&mut scene, Vec3::new(0.0, 3.0, 0.0), &water);

        let mut collector = RenderCollector::new(&RenderOptions::default());
        collector.collect(&camera(), &scene);

        assert_eq!(collector.transparent_items().len(), 1);
        assert!(collector.needs_backbuffer());
        assert!(collector.needs_forward_path());
        assert!(!collector.needs_normal_depth());
    }

    #[test]
    fn test_normal_depth_from_options_materials_and_effects() {
        let scene = Scene::new();
        let options = RenderOptions::default().with_ambient_occlusion(true);
        let mut collector = RenderCollector::new(&options);
        collector.collect(&camera(), &scene);
        assert!(collector.needs_normal_depth());

        let mut collector = RenderCollector::new(&RenderOptions::default());
        let mut cam = camera();
        cam.add_effect(Arc::new(PostEffect::new("ssao").with_normal_depth()));
        collector.collect(&cam, &scene);
        assert!(collector.needs_normal_depth());
        assert_eq!(collector.effects().len(), 1);
    }

    #[test]
    fn test_zero_extent_bounds_still_sort() {
        let mut scene = Scene::new();
        let material = Arc::new(Material::new("opaque", RenderPath::Deferred));
        let flat = Arc::new(Mesh::new(MeshId(7), "point", Aabb::from_points(&[Vec3::zeros()]), 3));
        for depth in [4.0, 2.0] {
            let entity = scene.create_entity();
            scene.set_transform(entity, Transform::from_position(Vec3::new(0.0, depth, 0.0))).unwrap();
            let model = scene.create_component(ModelInstance::from_mesh(Arc::clone(&flat), Arc::clone(&material)));
            scene.add_component(entity, model).unwrap();
            scene.add_child(entity).unwrap();
        }

        let mut collector = RenderCollector::new(&RenderOptions::default());
        collector.collect(&camera(), &scene);
        assert_eq!(hints(collector.opaque_items(RenderPath::Deferred)), vec![2.0, 4.0]);
    }

    #[test]
    fn test_lights_ambient_and_effects() {
        let mut scene = Scene::new();
        let entity = scene.create_entity();
        scene.add_child(entity).unwrap();

        let spot = scene.create_component(Light::spot(Vec3::repeat(1.0), 1.0, 50.0, 0.3, 0.5));
        let point = scene.create_component(Light::point(Vec3::repeat(1.0), 1.0, 50.0));
        let sun = scene.create_component(Light::directional(Vec3::repeat(1.0), 1.0));
        let shadowed_sun = scene.create_component(Light::directional(Vec3::repeat(1.0), 1.0).with_shadows());
        let ambient_a = scene.create_component(AmbientLight::new(Vec3::new(0.1, 0.2, 0.3), 1.0));
        let ambient_b = scene.create_component(AmbientLight::new(Vec3::new(0.1, 0.0, 0.0), 2.0));
        let effects = scene.create_component(EffectsComponent::new(vec![Arc::new(PostEffect::new("fog"))]));
        scene
            .add_components(entity, &[spot, point, sun, shadowed_sun, ambient_a, ambient_b, effects])
            .unwrap();

        let mut cam = camera();
        cam.add_effect(Arc::new(PostEffect::new("tonemap")));
        let mut collector = RenderCollector::new(&RenderOptions::default());
        collector.collect(&cam, &scene);

        let order: Vec<_> = collector.lights().iter().map(|l| l.component).collect();
        assert_eq!(order, vec![shadowed_sun, sun, point, spot]);
        assert_eq!(collector.shadow_casters().len(), 1);
        assert_eq!(collector.shadow_casters()[0].component, shadowed_sun);
        assert_relative_eq!(collector.ambient_color(), Vec3::new(0.3, 0.2, 0.3), epsilon = 1e-6);

        let names: Vec<_> = collector.effects().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["fog", "tonemap"]);
    }

    #[test]
    fn test_skybox_is_always_collected() {
        let mut scene = Scene::new();
        let sky = Arc::new(Material::new("sky", RenderPath::ForwardFixed));
        scene.set_skybox(Some(Skybox::new(unit_mesh(9), sky)));

        let mut collector = RenderCollector::new(&RenderOptions::default());
        collector.collect(&camera(), &scene);

        let items: Vec<_> = collector.opaque_items(RenderPath::ForwardFixed).iter().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].entity, None);
    }

    #[test]
    fn test_collect_resets_previous_results() {
        let mut scene = Scene::new();
        let material = Arc::new(Material::new("opaque", RenderPath::Deferred));
        let entity = add_model(&mut scene, Vec3::new(0.0, 10.0, 0.0), &material);

        let mut collector = RenderCollector::new(&RenderOptions::default());
        collector.collect(&camera(), &scene);
        assert_eq!(collector.opaque_items(RenderPath::Deferred).len(), 1);

        scene.destroy_node(entity).unwrap();
        collector.collect(&camera(), &scene);
        assert!(collector.opaque_items(RenderPath::Deferred).is_empty());
    }
}
