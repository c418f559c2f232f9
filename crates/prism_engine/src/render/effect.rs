//! Post-processing effects

use std::sync::Arc;

use crate::ecs::Component;
use crate::impl_component_any;
use crate::scene::{Aabb, SceneVisitor, VisitContext};

/// A screen-space effect applied after lighting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEffect {
    name: String,
    needs_normal_depth: bool,
}

impl PostEffect {
    /// Effect that only reads the lit color buffer
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), needs_normal_depth: false }
    }

    /// Mark the effect as sampling the normal/depth buffer
    pub fn with_normal_depth(mut self) -> Self {
        self.needs_normal_depth = true;
        self
    }

    /// Effect name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the normal/depth buffer must be rendered for this effect
    pub fn needs_normal_depth(&self) -> bool {
        self.needs_normal_depth
    }
}

/// Component applying effects while its entity is in view
///
/// Its bounds are infinite, so it is visited whenever its ancestors are.
#[derive(Debug, Clone, Default)]
pub struct EffectsComponent {
    effects: Vec<Arc<PostEffect>>,
}

impl EffectsComponent {
    /// Component applying `effects` in order
    pub fn new(effects: Vec<Arc<PostEffect>>) -> Self {
        Self { effects }
    }

    /// Effects in application order
    pub fn effects(&self) -> &[Arc<PostEffect>] {
        &self.effects
    }
}

impl Component for EffectsComponent {
    fn bounds(&self) -> Option<Aabb> {
        Some(Aabb::infinite())
    }

    fn accept_visitor(&self, ctx: &VisitContext<'_>, visitor: &mut dyn SceneVisitor) {
        visitor.visit_effects(&self.effects, ctx);
    }

    impl_component_any!();
}
