//! Cascaded shadow maps for one directional light
//!
//! The view frustum is split along its depth into up to four slices. Each
//! slice gets an orthographic camera fitted around it in light space and is
//! rendered into one tile of a shared atlas.
//!
//! ## Light space
//!
//! Light space is the local space of the light's node: the light shines along
//! local +Y, so light-space Y is shadow depth while X and Z span the shadow
//! map. Cascade boxes are snapped to whole texels in light space so shadow
//! edges stay put while the view camera moves.

use bytemuck::Zeroable;
use log::{debug, trace};

use crate::config::{RenderOptions, MAX_SHADOW_CASCADES};
use crate::foundation::math::{constants::DIRECTION_EPSILON, utils, Mat4, Mat4Ext, Point3, Vec3, Vec4};
use crate::render::{
    render_pass, Camera, GpuBackend, Light, LightType, PassType, RenderError, RenderResult,
};
use crate::scene::{Aabb, Expanse, Frustum, NodeId, Plane, Scene};

use super::atlas::{AtlasLayout, ShadowAtlas};
use super::caster_collector::CascadeShadowCasterCollector;
use super::filter::ShadowFilter;
use super::uniforms::CascadeShadowUniforms;

/// Smallest light-space depth range of a cascade
const MIN_DEPTH_RANGE: f32 = 1.0;

/// Atlas clear color: maximum depth everywhere
const CLEAR_DEPTH: Vec4 = Vec4::new(1.0, 1.0, 1.0, 1.0);

/// Clear color restored for the caller's target
const CLEAR_BLACK: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// One depth slice of the view frustum and its light camera
#[derive(Debug, Clone)]
pub struct Cascade {
    camera: Camera,
    split_ratio: f32,
    split_distance: f32,
    shadow_matrix: Mat4,
}

impl Cascade {
    fn new(split_ratio: f32) -> Self {
        Self {
            camera: Camera::orthographic_off_center(-1.0, 1.0, -1.0, 1.0, 0.0, 1.0),
            split_ratio,
            split_distance: 0.0,
            shadow_matrix: Mat4::identity(),
        }
    }

    /// Orthographic light camera fitted to the slice
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Far end of the slice as a fraction of the view range
    pub fn split_ratio(&self) -> f32 {
        self.split_ratio
    }

    /// Far end of the slice as a view distance
    pub fn split_distance(&self) -> f32 {
        self.split_distance
    }

    /// World to atlas UV (and depth) matrix
    pub fn shadow_matrix(&self) -> &Mat4 {
        &self.shadow_matrix
    }
}

/// Light-space box of a fitted cascade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeBox {
    /// Minimum light-space X
    pub left: f32,
    /// Maximum light-space X
    pub right: f32,
    /// Minimum light-space Z
    pub bottom: f32,
    /// Maximum light-space Z
    pub top: f32,
    /// Minimum light-space depth
    pub near: f32,
    /// Maximum light-space depth
    pub far: f32,
}

/// View distance at the far end of each cascade
///
/// `near + ratio * (far - near)` per ratio.
pub fn split_distances(near: f32, far: f32, ratios: &[f32]) -> Vec<f32> {
    ratios.iter().map(|ratio| near + ratio * (far - near)).collect()
}

/// Round `coord` down to a multiple of `1 / texels_per_unit`
///
/// Non-positive or non-finite densities leave `coord` unchanged.
pub fn texel_snap(coord: f32, texels_per_unit: f32) -> f32 {
    if !(texels_per_unit.is_finite() && texels_per_unit > 0.0) {
        return coord;
    }
    (coord * texels_per_unit).floor() / texels_per_unit
}

/// Fit a cascade box around a light-space slice
///
/// `casters` are the light-space bounds of all shadow casters, when any were
/// found. The box is clamped to them sideways and starts at their nearest
/// depth, so casters outside the slice still throw shadows into it.
pub fn fit_cascade(slice: &Aabb, casters: Option<&Aabb>, max_y: f32, resolution: u32, softness: f32) -> CascadeBox {
    let mut min = slice.min;
    let mut max = slice.max;
    max.y = max.y.min(max_y);

    if let Some(casters) = casters {
        min.x = min.x.max(casters.min.x);
        max.x = max.x.min(casters.max.x);
        min.z = min.z.max(casters.min.z);
        max.z = max.z.min(casters.max.z);
    }
    // casters beside the slice leave an inverted box
    max.x = max.x.max(min.x);
    max.z = max.z.max(min.z);

    let width = (max.x - min.x).ceil().max(1.0);
    let height = (max.z - min.z).ceil().max(1.0);
    let resolution = resolution.max(1) as f32;

    let left = texel_snap(min.x, resolution / width);
    let bottom = texel_snap(min.z, resolution / height);

    let near = casters.map_or(min.y, |casters| casters.min.y);
    let mut far = max.y;
    if !(far - near >= MIN_DEPTH_RANGE) {
        far = near + MIN_DEPTH_RANGE;
    }

    CascadeBox {
        left: left - softness,
        right: left + width + softness,
        bottom: bottom - softness,
        top: bottom + height + softness,
        near,
        far,
    }
}

/// # Cascade Shadow Map Renderer
///
/// Renders the shadow atlas of one directional light. Bound to the light's
/// node at construction; every frame, [`render`](Self::render) refits the
/// cascades to the view camera, gathers casters and draws their
/// `DirLightShadowMap` pass into the atlas.
///
/// GPU targets are created on the first render and recreated after
/// [`set_shadow_map_size`](Self::set_shadow_map_size).
#[derive(Debug)]
pub struct CascadeShadowMapRenderer {
    light: NodeId,
    filter: ShadowFilter,
    softness: f32,
    shadow_map_size: u32,
    cascades: Vec<Cascade>,
    layout: AtlasLayout,
    atlas: Option<ShadowAtlas>,
    collector_camera: Camera,
    cull_planes: Vec<Plane>,
    max_y: f32,
    caster_collector: CascadeShadowCasterCollector,
}

impl CascadeShadowMapRenderer {
    /// Renderer for the directional light on `light`
    ///
    /// # Errors
    ///
    /// [`RenderError::NotADirectionalLight`] if `light` carries no
    /// directional [`Light`], [`RenderError::InvalidOptions`] if `options`
    /// fail validation.
    pub fn new(scene: &Scene, light: NodeId, options: &RenderOptions) -> RenderResult<Self> {
        options
            .validate()
            .map_err(|err| RenderError::InvalidOptions(err.to_string()))?;
        Self::check_light(scene, light)?;

        let filter = options.directional_shadow_filter;
        let cascades: Vec<Cascade> = options.split_ratios().into_iter().map(Cascade::new).collect();
        let layout = AtlasLayout::new(options.shadow_map_size, cascades.len());

        debug!(
            "Created cascade shadow renderer: {} cascades, {} px, {} filter",
            cascades.len(),
            options.shadow_map_size,
            filter.name()
        );

        Ok(Self {
            light,
            filter,
            softness: filter.softness(),
            shadow_map_size: options.shadow_map_size,
            cascades,
            layout,
            atlas: None,
            collector_camera: Camera::orthographic_off_center(-1.0, 1.0, -1.0, 1.0, 0.0, 1.0),
            cull_planes: Vec::new(),
            max_y: 0.0,
            caster_collector: CascadeShadowCasterCollector::new(),
        })
    }

    fn check_light(scene: &Scene, light: NodeId) -> RenderResult<()> {
        let directional = scene
            .components_of::<Light>(light)
            .iter()
            .any(|l| l.light_type == LightType::Directional);
        if directional {
            Ok(())
        } else {
            Err(RenderError::NotADirectionalLight(light))
        }
    }

    /// Node of the light
    pub fn light(&self) -> NodeId {
        self.light
    }

    /// Filter the atlas is stored and blurred for
    pub fn filter(&self) -> &ShadowFilter {
        &self.filter
    }

    /// Light-space inflation of each cascade
    pub fn softness(&self) -> f32 {
        self.softness
    }

    /// Resolution of one cascade tile
    pub fn shadow_map_size(&self) -> u32 {
        self.shadow_map_size
    }

    /// Change the tile resolution; the atlas is recreated on the next render
    pub fn set_shadow_map_size(&mut self, size: u32) {
        let size = size.max(1);
        if size == self.shadow_map_size {
            return;
        }
        self.shadow_map_size = size;
        self.layout = AtlasLayout::new(size, self.cascades.len());
        self.atlas = None;
        debug!("Shadow map size set to {size}, atlas invalidated");
    }

    /// Number of cascades
    pub fn num_cascades(&self) -> usize {
        self.cascades.len()
    }

    /// All cascades, nearest first
    pub fn cascades(&self) -> &[Cascade] {
        &self.cascades
    }

    /// Cascade `index`
    pub fn cascade(&self, index: usize) -> RenderResult<&Cascade> {
        self.cascades
            .get(index)
            .ok_or(RenderError::InvalidCascade { index, count: self.cascades.len() })
    }

    /// World to atlas UV matrix of cascade `index`
    pub fn shadow_matrix(&self, index: usize) -> RenderResult<&Mat4> {
        self.cascade(index).map(Cascade::shadow_matrix)
    }

    /// View distance where each cascade ends, as of the last fit
    pub fn split_distances(&self) -> Vec<f32> {
        self.cascades.iter().map(Cascade::split_distance).collect()
    }

    /// Atlas tile arrangement
    pub fn layout(&self) -> &AtlasLayout {
        &self.layout
    }

    /// GPU targets, once allocated
    pub fn atlas(&self) -> Option<&ShadowAtlas> {
        self.atlas.as_ref()
    }

    /// Light-space box around the whole view frustum
    pub fn collector_camera(&self) -> &Camera {
        &self.collector_camera
    }

    /// Planes casters were culled against in the last fit
    pub fn cull_planes(&self) -> &[Plane] {
        &self.cull_planes
    }

    /// Casters gathered in the last fit
    pub fn caster_collector(&self) -> &CascadeShadowCasterCollector {
        &self.caster_collector
    }

    /// Uniform block for the lighting pass
    pub fn uniforms(&self) -> CascadeShadowUniforms {
        let mut uniforms = CascadeShadowUniforms::zeroed();
        for (i, cascade) in self.cascades.iter().enumerate().take(MAX_SHADOW_CASCADES) {
            uniforms.shadow_matrices[i] = cascade.shadow_matrix.into();
            uniforms.split_distances[i] = cascade.split_distance;
        }
        uniforms.num_cascades = u32::try_from(self.cascades.len().min(MAX_SHADOW_CASCADES)).unwrap_or(0);
        uniforms.softness = self.softness;
        uniforms
    }

    /// Fit the cascades to `view_camera` and gather casters, without drawing
    ///
    /// # Errors
    ///
    /// [`RenderError::NotADirectionalLight`] if the light node was destroyed.
    pub fn prepare(&mut self, view_camera: &Camera, scene: &Scene) -> RenderResult<()> {
        if !scene.contains_node(self.light) {
            return Err(RenderError::NotADirectionalLight(self.light));
        }
        let light_matrix = scene.world_matrix(self.light);
        let inverse_light = light_matrix.try_inverse().unwrap_or_else(Mat4::identity);
        let light_direction = light_matrix
            .axis(1)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vec3::z());

        let view_frustum = view_camera.frustum();
        let corners = view_frustum
            .corners
            .map(|corner| inverse_light.transform_point(&Point3::from(corner)).coords);

        self.update_collector_camera(&light_matrix, &corners);
        self.update_cull_planes(view_frustum, &light_direction);

        let near = view_camera.near_distance();
        let far = view_camera.far_distance();
        for cascade in &mut self.cascades {
            cascade.split_distance = near + cascade.split_ratio * (far - near);
        }

        self.caster_collector.collect(scene, &self.cull_planes, light_direction);
        let caster_bounds = self.caster_collector.bounds().transformed(&inverse_light);
        let casters = (caster_bounds.expanse() == Expanse::Finite).then_some(caster_bounds);

        let mut near_ratio = 0.0;
        for (i, cascade) in self.cascades.iter_mut().enumerate() {
            let far_ratio = cascade.split_ratio;
            let slice = Aabb::from_points(&slice_corners(&corners, near_ratio, far_ratio));
            let fit = fit_cascade(&slice, casters.as_ref(), self.max_y, self.shadow_map_size, self.softness);

            cascade.camera.set_world_matrix(light_matrix);
            cascade.camera.set_bounds(fit.left, fit.right, fit.bottom, fit.top);
            cascade.camera.set_near_far(fit.near, fit.far);
            cascade.shadow_matrix = self.layout.uv_transform(i) * cascade.camera.view_projection_matrix();
            near_ratio = far_ratio;
        }

        let frustums: Vec<Frustum> = self.cascades.iter().map(|c| c.camera.frustum().clone()).collect();
        self.caster_collector.assign_cascades(&frustums);

        trace!(
            "Fitted {} cascades around {} casters ({} cull planes)",
            self.cascades.len(),
            self.caster_collector.num_casters(),
            self.cull_planes.len()
        );
        Ok(())
    }

    fn update_collector_camera(&mut self, light_matrix: &Mat4, corners: &[Vec3; 8]) {
        let bounds = Aabb::from_points(corners);
        self.max_y = bounds.max.y;
        self.collector_camera.set_world_matrix(*light_matrix);
        self.collector_camera
            .set_bounds(bounds.min.x, bounds.max.x + 1.0, bounds.min.z, bounds.max.z + 1.0);
        self.collector_camera.set_near_far(bounds.min.y, bounds.max.y + 1.0);
    }

    fn update_cull_planes(&mut self, view_frustum: &Frustum, light_direction: &Vec3) {
        self.cull_planes.clear();
        self.cull_planes
            .extend_from_slice(self.collector_camera.frustum().side_planes());
        // planes the light shines out through bound where casters can matter
        self.cull_planes.extend(
            view_frustum
                .planes
                .iter()
                .filter(|plane| plane.dot_direction(light_direction) < -DIRECTION_EPSILON),
        );
    }

    /// Render the shadow atlas for `view_camera`
    ///
    /// Leaves no render target bound and the clear color black.
    ///
    /// # Errors
    ///
    /// Fails if the atlas cannot be created (for instance when the GPU lacks
    /// the filter's data type) or the light node is gone.
    pub fn render(&mut self, view_camera: &Camera, scene: &Scene, gpu: &mut dyn GpuBackend) -> RenderResult<()> {
        self.prepare(view_camera, scene)?;
        if self.atlas.is_none() {
            self.atlas = Some(ShadowAtlas::allocate(gpu, self.layout, &self.filter)?);
        }

        let Some(atlas) = &self.atlas else {
            return Ok(());
        };

        gpu.set_render_target(Some(atlas.front()));
        gpu.set_viewport(self.layout.full_viewport());
        gpu.set_clear_color(CLEAR_DEPTH);
        gpu.clear();

        let mut draws = 0;
        for (i, cascade) in self.cascades.iter().enumerate() {
            gpu.set_viewport(self.layout.viewport(i));
            draws += render_pass(
                gpu,
                &cascade.camera,
                PassType::DirLightShadowMap,
                self.caster_collector.render_list(i),
            );
        }
        gpu.set_color_mask(true);

        if let Some(blur) = atlas.blur_targets() {
            let step = 1.0 / self.shadow_map_size as f32;
            gpu.set_viewport(self.layout.full_viewport());
            for _ in 0..self.filter.blur_passes() {
                gpu.set_render_target(Some(blur.back));
                gpu.clear();
                gpu.blur(atlas.texture(), (step, 0.0));

                gpu.set_render_target(Some(blur.front_no_depth));
                gpu.clear();
                gpu.blur(blur.back_texture, (0.0, step));
            }
        }

        gpu.set_render_target(None);
        gpu.set_clear_color(CLEAR_BLACK);

        trace!("Rendered shadow atlas: {draws} draws");
        Ok(())
    }
}

/// Light-space corners of the view frustum between two depth ratios
fn slice_corners(corners: &[Vec3; 8], near_ratio: f32, far_ratio: f32) -> [Vec3; 8] {
    let mut slice = [Vec3::zeros(); 8];
    for i in 0..4 {
        let (near, far) = (&corners[i], &corners[i + 4]);
        slice[i] = utils::lerp_vec3(near, far, near_ratio);
        slice[i + 4] = utils::lerp_vec3(near, far, far_ratio);
    }
    slice
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::foundation::math::Transform;
    use crate::render::testing::{GpuCall, RecordingGpu, RecordingPass};
    use crate::render::{
        Material, Mesh, MeshId, ModelInstance, Rect, RenderPath, TextureDataType, TextureDesc, TextureFilter,
        TextureFormat,
    };
    use approx::assert_relative_eq;

    /// Scene with a sun shining straight down
    fn sun_scene() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let sun = scene.create_entity();
        scene
            .set_transform(sun, Transform::looking_along(Vec3::new(0.0, 0.0, 50.0), -Vec3::z()))
            .unwrap();
        let light = scene.create_component(Light::directional(Vec3::repeat(1.0), 1.0).with_shadows());
        scene.add_component(sun, light).unwrap();
        scene.add_child(sun).unwrap();
        (scene, sun)
    }

    fn add_caster(scene: &mut Scene, gpu: &RecordingGpu, id: u32, position: Vec3, half: f32) -> NodeId {
        let mesh = Arc::new(Mesh::new(MeshId(id), "cube", Aabb::new(Vec3::repeat(-half), Vec3::repeat(half)), 36));
        let material = Arc::new(
            Material::new("stone", RenderPath::Deferred)
                .with_pass(PassType::DirLightShadowMap, RecordingPass::shared("depth", gpu)),
        );
        let entity = scene.create_entity();
        scene.set_transform(entity, Transform::from_position(position)).unwrap();
        let model = scene.create_component(ModelInstance::from_mesh(mesh, material));
        scene.add_component(entity, model).unwrap();
        scene.add_child(entity).unwrap();
        entity
    }

    fn view_camera() -> Camera {
        Camera::perspective(90.0, 1.0, 0.1, 100.0)
    }

    /// Meshes drawn per cascade, split at the viewport changes
    fn draws_per_cascade(calls: &[GpuCall], layout: &AtlasLayout) -> Vec<Vec<u32>> {
        let mut per_cascade: Vec<Vec<u32>> = Vec::new();
        for call in calls {
            match call {
                GpuCall::SetViewport(rect) if *rect != layout.full_viewport() => per_cascade.push(Vec::new()),
                GpuCall::Draw(mesh) => {
                    if let Some(current) = per_cascade.last_mut() {
                        current.push(mesh.0);
                    }
                }
                _ => {}
            }
        }
        per_cascade
    }

    #[test]
    fn test_split_distances_follow_ratios() {
        let distances = split_distances(0.1, 100.0, &[0.125, 0.25, 0.5, 1.0]);
        let expected = [12.5875, 25.075, 50.05, 100.0];
        for (got, want) in distances.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-4);
        }

        let (scene, sun) = sun_scene();
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &RenderOptions::default()).unwrap();
        renderer.prepare(&view_camera(), &scene).unwrap();
        let fitted = renderer.split_distances();
        assert_eq!(fitted.len(), 4);
        for (got, want) in fitted.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-4);
        }
        assert!(fitted.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_texel_snap_is_stable_within_a_texel() {
        let s = 512.0 / 13.0 * 0.5;
        let a = texel_snap(-12.601, s);
        let b = texel_snap(-12.600, s);
        assert_eq!(a, b);
        assert!(a <= -12.601);
        assert!(-12.601 - a < 1.0 / s);

        assert_eq!(texel_snap(3.7, 0.0), 3.7);
        assert_eq!(texel_snap(3.7, f32::INFINITY), 3.7);
    }

    #[test]
    fn test_fit_rounds_extent_up_and_snaps_origin() {
        let slice = Aabb::new(Vec3::new(-3.3, 0.0, 1.2), Vec3::new(4.1, 20.0, 2.0));
        let fit = fit_cascade(&slice, None, 100.0, 1024, 0.0);

        assert_relative_eq!(fit.right - fit.left, 8.0, epsilon = 1e-4);
        assert_relative_eq!(fit.top - fit.bottom, 1.0, epsilon = 1e-4);
        // one tile texel is 8 / 1024 units
        let s = 1024.0 / 8.0;
        assert_relative_eq!((fit.left * s).round(), fit.left * s, epsilon = 1e-3);
        assert!(fit.left <= -3.3);
        assert!((-3.3 - fit.left) * s < 1.0);
        assert_relative_eq!(fit.left, -423.0 / 128.0, epsilon = 1e-5);
        assert_eq!((fit.near, fit.far), (0.0, 20.0));

        let soft = fit_cascade(&slice, None, 100.0, 1024, 0.5);
        assert_relative_eq!(soft.left, fit.left - 0.5);
        assert_relative_eq!(soft.top, fit.top + 0.5);
    }

    #[test]
    fn test_fit_clamps_to_casters_and_depth() {
        let slice = Aabb::new(Vec3::new(-10.0, -5.0, -10.0), Vec3::new(10.0, 30.0, 10.0));
        let casters = Aabb::new(Vec3::new(-2.0, -40.0, 0.0), Vec3::new(50.0, 3.0, 4.0));
        let fit = fit_cascade(&slice, Some(&casters), 25.0, 1024, 0.0);

        assert_eq!(fit.near, -40.0);
        assert_eq!(fit.far, 25.0);
        assert!(fit.left <= -2.0 && fit.left > -2.1);
        assert_relative_eq!(fit.right - fit.left, 12.0, epsilon = 1e-4);
        assert_relative_eq!(fit.top - fit.bottom, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_degenerate_fits_stay_finite() {
        let point = Aabb::from_points(&[Vec3::new(1.0, 2.0, 3.0)]);
        let fit = fit_cascade(&point, Some(&point), 2.0, 1024, 0.0);
        assert_relative_eq!(fit.right - fit.left, 1.0);
        assert_relative_eq!(fit.top - fit.bottom, 1.0);
        assert_relative_eq!(fit.far - fit.near, MIN_DEPTH_RANGE);

        // casters entirely beside the slice
        let slice = Aabb::new(Vec3::zeros(), Vec3::repeat(5.0));
        let beside = Aabb::new(Vec3::repeat(20.0), Vec3::repeat(30.0));
        let fit = fit_cascade(&slice, Some(&beside), 5.0, 1024, 0.0);
        let values = [fit.left, fit.right, fit.bottom, fit.top, fit.near, fit.far];
        assert!(values.iter().all(|v| v.is_finite()));
        assert!(fit.right > fit.left && fit.top > fit.bottom && fit.far > fit.near);
    }

    #[test]
    fn test_no_casters_still_yields_valid_matrices() {
        let (scene, sun) = sun_scene();
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &RenderOptions::default()).unwrap();
        renderer.prepare(&view_camera(), &scene).unwrap();

        assert_eq!(renderer.caster_collector().num_casters(), 0);
        for i in 0..renderer.num_cascades() {
            assert!(renderer.shadow_matrix(i).unwrap().iter().all(|v| v.is_finite()));
            assert!(renderer.caster_collector().render_list(i).is_empty());
        }
        assert_eq!(
            renderer.shadow_matrix(4).unwrap_err(),
            RenderError::InvalidCascade { index: 4, count: 4 }
        );
    }

    #[test]
    fn test_cull_planes_include_view_planes_facing_away_from_light() {
        let (scene, sun) = sun_scene();
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &RenderOptions::default()).unwrap();
        let camera = view_camera();
        renderer.prepare(&camera, &scene).unwrap();

        // sides of the collector box plus the view frustum's bottom plane
        assert_eq!(renderer.cull_planes().len(), 5);
        assert_eq!(
            renderer.cull_planes()[4],
            *camera.frustum().plane(crate::scene::FrustumPlane::Bottom)
        );
    }

    #[test]
    fn test_casters_land_in_their_cascades() {
        let mut gpu = RecordingGpu::default();
        let (mut scene, sun) = sun_scene();
        add_caster(&mut scene, &gpu, 1, Vec3::new(0.0, 5.0, 0.0), 0.25);
        add_caster(&mut scene, &gpu, 2, Vec3::new(0.0, 80.0, 0.0), 0.5);

        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &RenderOptions::default()).unwrap();
        renderer.render(&view_camera(), &scene, &mut gpu).unwrap();

        let draws = draws_per_cascade(&gpu.calls(), renderer.layout());
        assert_eq!(draws, vec![vec![1], vec![], vec![], vec![2]]);
    }

    #[test]
    fn test_shadow_matrix_maps_into_cascade_tile() {
        let gpu = RecordingGpu::default();
        let (mut scene, sun) = sun_scene();
        add_caster(&mut scene, &gpu, 1, Vec3::new(0.0, 5.0, 0.0), 0.25);
        add_caster(&mut scene, &gpu, 2, Vec3::new(0.0, 80.0, 0.0), 0.5);

        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &RenderOptions::default()).unwrap();
        renderer.prepare(&view_camera(), &scene).unwrap();

        let uv = |cascade: usize, p: Vec3| renderer.shadow_matrix(cascade).unwrap() * p.push(1.0);
        let near = uv(0, Vec3::new(0.0, 5.0, 0.0));
        assert!((0.0..=0.5).contains(&near.x) && (0.0..=0.5).contains(&near.y));
        assert!((0.0..=1.0).contains(&near.z));

        let far = uv(3, Vec3::new(0.0, 80.0, 0.0));
        assert!((0.5..=1.0).contains(&far.x) && (0.5..=1.0).contains(&far.y));
    }

    #[test]
    fn test_render_sequence_with_blur() {
        crate::foundation::logging::init();
        let mut gpu = RecordingGpu::default();
        let (mut scene, sun) = sun_scene();
        add_caster(&mut scene, &gpu, 1, Vec3::new(0.0, 5.0, 0.0), 0.25);

        let options = RenderOptions::default()
            .with_cascades(1)
            .with_shadow_map_size(256)
            .with_shadow_filter(ShadowFilter::exponential());
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &options).unwrap();
        renderer.render(&view_camera(), &scene, &mut gpu).unwrap();

        let atlas = renderer.atlas().unwrap().clone();
        let blur = *atlas.blur_targets().unwrap();
        let calls = gpu.calls();
        let start = calls
            .iter()
            .position(|call| *call == GpuCall::SetRenderTarget(Some(atlas.front())))
            .unwrap();
        let tile = Rect::new(0, 0, 256, 256);
        let step = 1.0 / 256.0;

        assert_eq!(
            calls[start..],
            [
                GpuCall::SetRenderTarget(Some(atlas.front())),
                GpuCall::SetViewport(tile),
                GpuCall::SetClearColor(CLEAR_DEPTH),
                GpuCall::Clear,
                GpuCall::SetViewport(tile),
                GpuCall::SetBlendState(None),
                GpuCall::PassState("depth".to_string()),
                GpuCall::InstanceState("depth".to_string()),
                GpuCall::BindMesh(MeshId(1)),
                GpuCall::Draw(MeshId(1)),
                GpuCall::SetBlendState(None),
                GpuCall::SetColorMask(true),
                GpuCall::SetViewport(tile),
                GpuCall::SetRenderTarget(Some(blur.back)),
                GpuCall::Clear,
                GpuCall::Blur(atlas.texture(), (step, 0.0)),
                GpuCall::SetRenderTarget(Some(blur.front_no_depth)),
                GpuCall::Clear,
                GpuCall::Blur(blur.back_texture, (0.0, step)),
                GpuCall::SetRenderTarget(None),
                GpuCall::SetClearColor(CLEAR_BLACK),
            ]
        );
    }

    #[test]
    fn test_atlas_is_allocated_lazily_and_recreated_on_resize() {
        let mut gpu = RecordingGpu::default();
        let (scene, sun) = sun_scene();
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &RenderOptions::default()).unwrap();
        assert!(renderer.atlas().is_none());

        let creations = |gpu: &RecordingGpu| {
            gpu.calls().iter().filter(|call| matches!(call, GpuCall::CreateTexture(_))).count()
        };

        renderer.render(&view_camera(), &scene, &mut gpu).unwrap();
        renderer.render(&view_camera(), &scene, &mut gpu).unwrap();
        assert_eq!(creations(&gpu), 1);
        assert_eq!(
            gpu.calls()[0],
            GpuCall::CreateTexture(TextureDesc {
                width: 2048,
                height: 2048,
                format: TextureFormat::Rgba,
                data_type: TextureDataType::UnsignedByte,
                filter: TextureFilter::Bilinear,
            })
        );

        renderer.set_shadow_map_size(1024);
        assert!(renderer.atlas().is_some());
        renderer.set_shadow_map_size(512);
        assert!(renderer.atlas().is_none());
        renderer.render(&view_camera(), &scene, &mut gpu).unwrap();
        assert_eq!(creations(&gpu), 2);
        assert_eq!(renderer.atlas().unwrap().layout().width(), 1024);
    }

    #[test]
    fn test_missing_float_support_is_reported() {
        let mut gpu = RecordingGpu::without(&[TextureDataType::HalfFloat, TextureDataType::Float]);
        let (scene, sun) = sun_scene();
        let options = RenderOptions::default().with_shadow_filter(ShadowFilter::variance());
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &options).unwrap();

        let result = renderer.render(&view_camera(), &scene, &mut gpu);
        assert_eq!(
            result,
            Err(RenderError::UnsupportedDataType { required: TextureDataType::HalfFloat })
        );
        assert!(renderer.atlas().is_none());
    }

    #[test]
    fn test_destroyed_light_fails_before_allocating() {
        let mut gpu = RecordingGpu::default();
        let (mut scene, sun) = sun_scene();
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &RenderOptions::default()).unwrap();
        scene.destroy_node(sun).unwrap();

        let result = renderer.render(&view_camera(), &scene, &mut gpu);
        assert_eq!(result, Err(RenderError::NotADirectionalLight(sun)));
        assert!(renderer.atlas().is_none());
        assert!(gpu.calls().is_empty());
    }

    #[test]
    fn test_default_renderer_inflates_by_default_softness() {
        let (scene, sun) = sun_scene();
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &RenderOptions::default()).unwrap();
        assert_eq!(renderer.filter(), &ShadowFilter::Hard);
        assert_relative_eq!(renderer.softness(), crate::shadow::DEFAULT_SOFTNESS);

        renderer.prepare(&view_camera(), &scene).unwrap();
        assert_relative_eq!(renderer.uniforms().softness, 0.002);
    }

    #[test]
    fn test_rejects_nodes_without_directional_light() {
        let mut scene = Scene::new();
        let lamp = scene.create_entity();
        let point = scene.create_component(Light::point(Vec3::repeat(1.0), 1.0, 10.0));
        scene.add_component(lamp, point).unwrap();

        let result = CascadeShadowMapRenderer::new(&scene, lamp, &RenderOptions::default());
        assert_eq!(result.unwrap_err(), RenderError::NotADirectionalLight(lamp));

        let (scene, sun) = sun_scene();
        let bad = RenderOptions::default().with_cascades(7);
        assert!(matches!(
            CascadeShadowMapRenderer::new(&scene, sun, &bad),
            Err(RenderError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_uniforms_mirror_cascades() {
        let (scene, sun) = sun_scene();
        let options = RenderOptions::default().with_cascades(2).with_shadow_filter(ShadowFilter::pcf());
        let mut renderer = CascadeShadowMapRenderer::new(&scene, sun, &options).unwrap();
        renderer.prepare(&view_camera(), &scene).unwrap();

        let uniforms = renderer.uniforms();
        assert_eq!(uniforms.num_cascades, 2);
        assert_relative_eq!(uniforms.softness, crate::shadow::DEFAULT_SOFTNESS);
        assert_relative_eq!(uniforms.split_distances[1], 100.0, epsilon = 1e-4);
        assert_eq!(uniforms.split_distances[2], 0.0);

        let matrix: [[f32; 4]; 4] = (*renderer.shadow_matrix(1).unwrap()).into();
        assert_eq!(uniforms.shadow_matrices[1], matrix);
        assert_eq!(bytemuck::bytes_of(&uniforms).len(), std::mem::size_of::<CascadeShadowUniforms>());
    }
}
