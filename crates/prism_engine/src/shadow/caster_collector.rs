//! Shadow caster gathering for cascaded shadow maps

use std::sync::Arc;

use log::trace;

use crate::foundation::math::Vec3;
use crate::render::{ModelInstance, RenderItem, RenderItemPool, RenderList};
use crate::scene::{Aabb, Frustum, NodeId, Plane, Scene, SceneVisitor, VisitContext};

/// Scene visitor gathering the shadow casters of one directional light
///
/// The scene is walked once per frame with the combined cull planes of all
/// cascades. Casters are then tagged with every cascade frustum they touch,
/// and each cascade list is sorted front to back along the light direction.
#[derive(Debug, Default)]
pub struct CascadeShadowCasterCollector {
    pool: RenderItemPool,
    casters: Vec<usize>,
    cascade_lists: Vec<Vec<usize>>,
    cull_planes: Vec<Plane>,
    light_direction: Vec3,
    bounds: Aabb,
}

impl CascadeShadowCasterCollector {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather every shadow-casting model of `scene` inside `cull_planes`
    pub fn collect(&mut self, scene: &Scene, cull_planes: &[Plane], light_direction: Vec3) {
        self.pool.reset();
        self.casters.clear();
        for list in &mut self.cascade_lists {
            list.clear();
        }
        self.cull_planes.clear();
        self.cull_planes.extend_from_slice(cull_planes);
        self.light_direction = light_direction;
        self.bounds.clear();

        scene.accept_visitor(self);

        trace!("Collected {} shadow casters", self.casters.len());
    }

    /// Tag casters with the cascades whose frustum they intersect
    pub fn assign_cascades(&mut self, frustums: &[Frustum]) {
        self.cascade_lists.resize_with(frustums.len(), Vec::new);

        for (list, frustum) in self.cascade_lists.iter_mut().zip(frustums) {
            list.clear();
            let pool = &self.pool;
            list.extend(self.casters.iter().copied().filter(|index| {
                pool.get(*index)
                    .is_some_and(|item| item.world_bounds.intersects_convex_solid(&frustum.planes))
            }));
            pool.sort_indices(list, false);
        }
    }

    /// World bounds of all gathered casters
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Number of gathered caster items
    pub fn num_casters(&self) -> usize {
        self.casters.len()
    }

    /// Casters of `cascade`, nearest to the light first
    ///
    /// Empty for cascades that were never assigned.
    pub fn render_list(&self, cascade: usize) -> RenderList<'_> {
        let indices = self.cascade_lists.get(cascade).map_or(&[][..], Vec::as_slice);
        RenderList::new(&self.pool, indices)
    }

    fn add_caster(&mut self, model: &ModelInstance, entity: NodeId, ctx: &VisitContext<'_>) {
        let hint = ctx.world_bounds.center().dot(&self.light_direction);

        for (mesh_index, instance) in model.mesh_instances().iter().enumerate() {
            if !instance.is_visible() {
                continue;
            }
            let index = self.pool.push(RenderItem {
                material: Arc::clone(instance.material()),
                mesh: Arc::clone(instance.mesh()),
                mesh_index,
                entity: Some(entity),
                world_matrix: ctx.world_matrix,
                world_bounds: ctx.world_bounds,
                skeleton: model.skeleton_pose().cloned(),
                render_order_hint: hint,
            });
            self.casters.push(index);
        }
    }
}

impl SceneVisitor for CascadeShadowCasterCollector {
    fn qualifies(&mut self, scene: &Scene, node: NodeId) -> bool {
        scene.is_visible(node) && scene.world_bounds(node).intersects_convex_solid(&self.cull_planes)
    }

    fn visit_model_instance(&mut self, model: &ModelInstance, ctx: &VisitContext<'_>) {
        if !model.casts_shadows() {
            return;
        }
        self.bounds.grow_to_include(&ctx.world_bounds);
        self.add_caster(model, ctx.entity, ctx);
    }
}
