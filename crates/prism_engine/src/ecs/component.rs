//! Component trait and the per-scene component type registry

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::foundation::collections::{BitMask, NodeId};
use crate::foundation::math::Transform;
use crate::scene::{Aabb, SceneVisitor, VisitContext};

/// Behavior unit attached to an entity
///
/// Every hook has a no-op default, so a component only overrides the
/// capabilities it has: contributing bounds, per-frame updates, or showing
/// itself to scene visitors.
pub trait Component: Any + Send + Sync {
    /// Local-space bounds this component adds to its entity
    ///
    /// `None` means the component does not affect the entity's bounds.
    fn bounds(&self) -> Option<Aabb> {
        None
    }

    /// Whether [`update`](Self::update) should be called every frame
    fn wants_update(&self) -> bool {
        false
    }

    /// Per-frame update
    fn update(&mut self, _ctx: &mut UpdateContext, _dt: f32) {}

    /// Called when the component is attached (or re-enabled)
    fn on_added(&mut self, _entity: NodeId) {}

    /// Called when the component is detached (or disabled)
    fn on_removed(&mut self, _entity: NodeId) {}

    /// Dispatch to the matching visitor hook
    fn accept_visitor(&self, _ctx: &VisitContext<'_>, _visitor: &mut dyn SceneVisitor) {}

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// What a component may touch on its entity during [`Component::update`]
#[derive(Debug, Clone)]
pub struct UpdateContext {
    entity: NodeId,
    transform: Transform,
    transform_changed: bool,
    bounds_changed: bool,
}

impl UpdateContext {
    pub(crate) fn new(entity: NodeId, transform: Transform) -> Self {
        Self { entity, transform, transform_changed: false, bounds_changed: false }
    }

    /// The entity being updated
    pub fn entity(&self) -> NodeId {
        self.entity
    }

    /// Current local transform of the entity
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replace the entity's local transform
    ///
    /// The scene applies the change (and invalidates the subtree's world
    /// matrices) once the component returns.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.transform_changed = true;
    }

    /// Report that the component's [`bounds`](Component::bounds) changed
    pub fn invalidate_bounds(&mut self) {
        self.bounds_changed = true;
    }

    pub(crate) fn bounds_changed(&self) -> bool {
        self.bounds_changed
    }

    pub(crate) fn into_changed_transform(self) -> Option<Transform> {
        self.transform_changed.then_some(self.transform)
    }
}

/// Assigns each concrete component type a stable bit index
#[derive(Debug, Default)]
pub struct ComponentTypeRegistry {
    bits: HashMap<TypeId, usize>,
}

impl ComponentTypeRegistry {
    /// Bit for `type_id`, assigning the next free one on first sight
    pub fn register(&mut self, type_id: TypeId) -> usize {
        let next = self.bits.len();
        *self.bits.entry(type_id).or_insert(next)
    }

    /// Bit for `type_id` if the type was ever registered
    pub fn bit(&self, type_id: TypeId) -> Option<usize> {
        self.bits.get(&type_id).copied()
    }

    /// Mask with the bit of every listed type that is registered
    pub fn mask_of(&self, type_ids: &[TypeId]) -> BitMask {
        let mut mask = BitMask::default();
        for bit in type_ids.iter().filter_map(|id| self.bit(*id)) {
            mask.set(bit);
        }
        mask
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether no type has been registered yet
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// Component plus the bookkeeping the scene keeps for it
pub(crate) struct ComponentSlot {
    pub(crate) component: Box<dyn Component>,
    pub(crate) name: Option<String>,
    pub(crate) owner: Option<NodeId>,
    pub(crate) enabled: bool,
    pub(crate) type_bit: usize,
}

impl std::fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("enabled", &self.enabled)
            .field("type_bit", &self.type_bit)
            .finish_non_exhaustive()
    }
}

/// Payload of [`Scene::components_changed`](crate::scene::Scene::components_changed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentsChanged {
    /// Entity whose component set changed
    pub entity: NodeId,
    /// Type mask before the change
    pub old_mask: BitMask,
    /// Type mask after the change
    pub new_mask: BitMask,
}

/// Implement the `as_any` boilerplate of [`Component`]
#[macro_export]
macro_rules! impl_component_any {
    () => {
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn test_registry_assigns_stable_bits() {
        let mut registry = ComponentTypeRegistry::default();
        let a = registry.register(TypeId::of::<Marker>());
        let b = registry.register(TypeId::of::<u32>());
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(registry.register(TypeId::of::<Marker>()), 0);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.bit(TypeId::of::<f64>()), None);
    }

    #[test]
    fn test_update_context_reports_only_changes() {
        let entity = NodeId::default();
        let untouched = UpdateContext::new(entity, Transform::identity());
        assert!(untouched.into_changed_transform().is_none());

        let mut moved = UpdateContext::new(entity, Transform::identity());
        let target = Transform::from_position(crate::foundation::math::Vec3::new(1.0, 0.0, 0.0));
        moved.set_transform(target);
        assert_eq!(moved.into_changed_transform(), Some(target));
    }
}
