//! Scene traversal protocol

use std::sync::Arc;

use crate::foundation::collections::{ComponentId, NodeId};
use crate::foundation::math::Mat4;
use crate::render::{AmbientLight, Light, ModelInstance, PostEffect};

use super::bounds::Aabb;
use super::graph::Scene;

/// Where a visited component sits in the world
#[derive(Debug, Clone, Copy)]
pub struct VisitContext<'a> {
    /// Scene being traversed
    pub scene: &'a Scene,
    /// Entity owning the component
    pub entity: NodeId,
    /// The component being visited
    pub component: ComponentId,
    /// World matrix of the owning entity
    pub world_matrix: Mat4,
    /// World bounds of the owning entity
    pub world_bounds: Aabb,
}

/// Visitor driven by [`Scene::accept_visitor`]
///
/// The scene asks [`qualifies`](Self::qualifies) before descending into each
/// child; components then call the matching `visit_*` hook. All hooks default
/// to no-ops so visitors only implement what they collect.
pub trait SceneVisitor {
    /// Whether traversal should descend into `node`
    fn qualifies(&mut self, scene: &Scene, node: NodeId) -> bool;

    /// Called once before the graph is walked
    fn visit_scene(&mut self, _scene: &Scene) {}

    /// A drawable model on an entity
    fn visit_model_instance(&mut self, _model: &ModelInstance, _ctx: &VisitContext<'_>) {}

    /// A directional, point or spot light
    fn visit_light(&mut self, _light: &Light, _ctx: &VisitContext<'_>) {}

    /// An ambient light
    fn visit_ambient_light(&mut self, _light: &AmbientLight, _ctx: &VisitContext<'_>) {}

    /// Post effects attached to an entity
    fn visit_effects(&mut self, _effects: &[Arc<PostEffect>], _ctx: &VisitContext<'_>) {}
}
