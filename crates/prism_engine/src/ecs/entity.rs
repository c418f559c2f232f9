//! Entity payload and the component operations of [`Scene`]

use std::any::TypeId;
use std::cell::Cell;

use log::{debug, trace, warn};

use crate::foundation::collections::{BitMask, ComponentId, NodeId};
use crate::scene::{Aabb, Scene, SceneError, SceneResult};

use super::component::{Component, ComponentSlot, ComponentsChanged, UpdateContext};

/// Per-entity component bookkeeping
///
/// Holds the ordered component handles, the component-type mask and the
/// cached local-space bounds of all enabled components.
#[derive(Debug, Default)]
pub struct EntityData {
    components: Vec<ComponentId>,
    mask: BitMask,
    requires_updates: bool,
    local_bounds: Cell<Aabb>,
    local_bounds_dirty: Cell<bool>,
}

impl EntityData {
    /// Component handles in insertion order
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Bit per attached component type
    pub fn mask(&self) -> &BitMask {
        &self.mask
    }

    /// Whether any enabled component wants per-frame updates
    pub fn requires_updates(&self) -> bool {
        self.requires_updates
    }
}

impl Scene {
    /// Store a standalone component and return its handle
    pub fn create_component<C: Component>(&mut self, component: C) -> ComponentId {
        let type_bit = self.registry.register(TypeId::of::<C>());
        self.components.insert(ComponentSlot {
            component: Box::new(component),
            name: None,
            owner: None,
            enabled: true,
            type_bit,
        })
    }

    /// Drop a component, detaching it from its owner first
    pub fn destroy_component(&mut self, id: ComponentId) -> SceneResult<()> {
        let owner = self.component_slot(id)?.owner;
        if let Some(entity) = owner {
            self.remove_component(entity, id)?;
        }
        self.components.remove(id);
        Ok(())
    }

    fn component_slot(&self, id: ComponentId) -> SceneResult<&ComponentSlot> {
        self.components.get(id).ok_or(SceneError::UnknownComponent(id))
    }

    fn entity_data(&self, entity: NodeId) -> SceneResult<&EntityData> {
        self.node_or_err(entity)?
            .as_entity()
            .ok_or(SceneError::NotAnEntity(entity))
    }

    /// Name a component for [`component_by_name`](Self::component_by_name)
    pub fn set_component_name(&mut self, id: ComponentId, name: impl Into<String>) -> SceneResult<()> {
        self.components
            .get_mut(id)
            .ok_or(SceneError::UnknownComponent(id))?
            .name = Some(name.into());
        Ok(())
    }

    /// Entity a component is attached to
    pub fn component_owner(&self, id: ComponentId) -> Option<NodeId> {
        self.components.get(id).and_then(|slot| slot.owner)
    }

    /// Borrow a component as its concrete type
    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.components.get(id)?.component.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow a component as its concrete type
    ///
    /// Changes to the component's bounds go unnoticed; use
    /// [`modify_component`](Self::modify_component) or call
    /// [`invalidate_component_bounds`](Self::invalidate_component_bounds).
    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.components.get_mut(id)?.component.as_any_mut().downcast_mut::<T>()
    }

    /// Run `f` on a component, then refresh its owner's bounds
    pub fn modify_component<T: Component, R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let result = f(self.component_mut::<T>(id)?);
        self.invalidate_component_bounds(id);
        Some(result)
    }

    /// Recompute the owner's bounds on next query after a component's bounds changed
    pub fn invalidate_component_bounds(&mut self, id: ComponentId) {
        if let Some(entity) = self.component_owner(id) {
            self.invalidate_entity_bounds(entity);
        }
    }

    fn invalidate_entity_bounds(&self, entity: NodeId) {
        if let Some(data) = self.nodes.get(entity).and_then(|node| node.as_entity()) {
            data.local_bounds_dirty.set(true);
            self.invalidate_world_bounds(entity);
        }
    }

    pub(crate) fn entity_local_bounds(&self, entity: &EntityData) -> Aabb {
        if entity.local_bounds_dirty.get() {
            let bounds = entity
                .components
                .iter()
                .filter_map(|id| self.components.get(*id))
                .filter(|slot| slot.enabled)
                .filter_map(|slot| slot.component.bounds())
                .fold(Aabb::empty(), |acc, bounds| acc.union(&bounds));
            entity.local_bounds.set(bounds);
            entity.local_bounds_dirty.set(false);
        }
        entity.local_bounds.get()
    }

    /// Attach a standalone component to `entity`
    ///
    /// Fails if the component already has an owner. On success the type bit
    /// is set, the added-callback runs (for enabled components), bounds are
    /// invalidated and [`components_changed`](Self::components_changed) fires.
    pub fn add_component(&mut self, entity: NodeId, id: ComponentId) -> SceneResult<()> {
        if let Err(err) = self.check_add(entity, id) {
            warn!("Rejected add_component: {}", err);
            return Err(err);
        }

        let slot = &mut self.components[id];
        slot.owner = Some(entity);
        let (type_bit, enabled) = (slot.type_bit, slot.enabled);
        let wants_update = enabled && slot.component.wants_update();
        let has_bounds = enabled && slot.component.bounds().is_some();
        if enabled {
            slot.component.on_added(entity);
        }

        let Some(data) = self.nodes[entity].as_entity_mut() else {
            return Err(SceneError::NotAnEntity(entity));
        };
        let old_mask = data.mask.clone();
        data.components.push(id);
        data.mask.set(type_bit);
        data.requires_updates |= wants_update;
        let new_mask = data.mask.clone();

        if has_bounds {
            self.invalidate_entity_bounds(entity);
        }
        trace!("Added component {:?} to {:?}", id, entity);
        self.components_changed.dispatch(&ComponentsChanged { entity, old_mask, new_mask });
        Ok(())
    }

    fn check_add(&self, entity: NodeId, id: ComponentId) -> SceneResult<()> {
        self.entity_data(entity)?;
        match self.component_slot(id)?.owner {
            Some(owner) => Err(SceneError::ComponentAlreadyAttached { component: id, owner }),
            None => Ok(()),
        }
    }

    /// Attach several components; fails without attaching any if one is taken
    pub fn add_components(&mut self, entity: NodeId, ids: &[ComponentId]) -> SceneResult<()> {
        for (i, id) in ids.iter().enumerate() {
            self.check_add(entity, *id)?;
            if ids[..i].contains(id) {
                return Err(SceneError::ComponentAlreadyAttached { component: *id, owner: entity });
            }
        }
        ids.iter().try_for_each(|id| self.add_component(entity, *id))
    }

    /// Detach a component from `entity`, leaving it standalone
    ///
    /// The type mask and update participation are rebuilt from the remaining
    /// components, so other components of the same type keep their bit.
    pub fn remove_component(&mut self, entity: NodeId, id: ComponentId) -> SceneResult<()> {
        let position = self
            .entity_data(entity)?
            .components
            .iter()
            .position(|c| *c == id);
        let Some(position) = position else {
            self.component_slot(id)?;
            let err = SceneError::ComponentNotAttached { component: id, entity };
            warn!("Rejected remove_component: {}", err);
            return Err(err);
        };

        let slot = &mut self.components[id];
        slot.owner = None;
        let has_bounds = slot.enabled && slot.component.bounds().is_some();
        if slot.enabled {
            slot.component.on_removed(entity);
        }

        let old_mask = self.entity_data(entity)?.mask.clone();
        if let Some(data) = self.nodes[entity].as_entity_mut() {
            data.components.remove(position);
        }
        self.rebuild_entity_index(entity);
        let new_mask = self.entity_data(entity)?.mask.clone();

        if has_bounds {
            self.invalidate_entity_bounds(entity);
        }
        trace!("Removed component {:?} from {:?}", id, entity);
        self.components_changed.dispatch(&ComponentsChanged { entity, old_mask, new_mask });
        Ok(())
    }

    /// Detach several components; fails without detaching any if one is missing
    pub fn remove_components(&mut self, entity: NodeId, ids: &[ComponentId]) -> SceneResult<()> {
        for id in ids {
            if self.component_owner(*id) != Some(entity) {
                self.component_slot(*id)?;
                return Err(SceneError::ComponentNotAttached { component: *id, entity });
            }
        }
        ids.iter().try_for_each(|id| self.remove_component(entity, *id))
    }

    fn rebuild_entity_index(&mut self, entity: NodeId) {
        let components = &self.components;
        let Some(data) = self.nodes.get_mut(entity).and_then(|node| node.as_entity_mut()) else {
            return;
        };
        data.mask.clear();
        data.requires_updates = false;
        for slot in data.components.iter().filter_map(|id| components.get(*id)) {
            data.mask.set(slot.type_bit);
            data.requires_updates |= slot.enabled && slot.component.wants_update();
        }
    }

    /// Whether a component takes part in updates, bounds and visits
    pub fn is_component_enabled(&self, id: ComponentId) -> bool {
        self.components.get(id).is_some_and(|slot| slot.enabled)
    }

    /// Enable or disable a component
    ///
    /// An attached component receives its added-callback when enabled and its
    /// removed-callback when disabled; its owner's bounds are invalidated.
    pub fn set_component_enabled(&mut self, id: ComponentId, enabled: bool) -> SceneResult<()> {
        let slot = self
            .components
            .get_mut(id)
            .ok_or(SceneError::UnknownComponent(id))?;
        if slot.enabled == enabled {
            return Ok(());
        }
        slot.enabled = enabled;

        let Some(entity) = slot.owner else {
            return Ok(());
        };
        let has_bounds = slot.component.bounds().is_some();
        if enabled {
            slot.component.on_added(entity);
        } else {
            slot.component.on_removed(entity);
        }

        self.rebuild_entity_index(entity);
        if has_bounds {
            self.invalidate_entity_bounds(entity);
        }
        Ok(())
    }

    /// Component handles of `entity` in insertion order
    pub fn components(&self, entity: NodeId) -> &[ComponentId] {
        self.entity_data(entity).map_or(&[][..], |data| data.components.as_slice())
    }

    /// First component of type `T` on `entity`
    pub fn first_component<T: Component>(&self, entity: NodeId) -> Option<&T> {
        self.components(entity)
            .iter()
            .find_map(|id| self.component::<T>(*id))
    }

    /// Handle of the first component of type `T` on `entity`
    pub fn first_component_id<T: Component>(&self, entity: NodeId) -> Option<ComponentId> {
        self.components(entity)
            .iter()
            .copied()
            .find(|id| self.component::<T>(*id).is_some())
    }

    /// Every component of type `T` on `entity`, in insertion order
    pub fn components_of<T: Component>(&self, entity: NodeId) -> Vec<&T> {
        self.components(entity)
            .iter()
            .filter_map(|id| self.component::<T>(*id))
            .collect()
    }

    /// First component on `entity` with the given name
    pub fn component_by_name(&self, entity: NodeId, name: &str) -> Option<ComponentId> {
        self.components(entity)
            .iter()
            .copied()
            .find(|id| self.components[*id].name.as_deref() == Some(name))
    }

    /// Whether `entity` holds at least one component of type `T`
    pub fn has_component_type<T: Component>(&self, entity: NodeId) -> bool {
        let Some(bit) = self.registry.bit(TypeId::of::<T>()) else {
            return false;
        };
        self.entity_data(entity).is_ok_and(|data| data.mask.contains(bit))
    }

    /// Type mask of `entity`
    pub fn component_mask(&self, entity: NodeId) -> Option<&BitMask> {
        self.entity_data(entity).ok().map(|data| &data.mask)
    }

    /// Mask bit of component type `T`, once any `T` was created
    pub fn component_type_bit<T: Component>(&self) -> Option<usize> {
        self.registry.bit(TypeId::of::<T>())
    }

    /// Entities in the scene whose mask covers every bit of `query`
    pub fn entities_matching(&self, query: &BitMask) -> Vec<NodeId> {
        self.entities_in_scene()
            .into_iter()
            .filter(|entity| {
                self.component_mask(*entity)
                    .is_some_and(|mask| mask.contains_all(query))
            })
            .collect()
    }

    /// Observers of component additions and removals
    pub fn components_changed(&mut self) -> &mut crate::foundation::signal::Signal<ComponentsChanged> {
        &mut self.components_changed
    }

    /// Run the update hook of every enabled component of `entity`
    pub fn update_entity(&mut self, entity: NodeId, dt: f32) -> SceneResult<()> {
        let data = self.entity_data(entity)?;
        if !data.requires_updates {
            return Ok(());
        }
        let ids = data.components.clone();

        for id in ids {
            let transform = self.nodes[entity].transform;
            let Some(slot) = self.components.get_mut(id) else {
                continue;
            };
            if !slot.enabled || !slot.component.wants_update() {
                continue;
            }

            let mut ctx = UpdateContext::new(entity, transform);
            slot.component.update(&mut ctx, dt);

            if ctx.bounds_changed() {
                self.invalidate_entity_bounds(entity);
            }
            if let Some(transform) = ctx.into_changed_transform() {
                self.set_transform(entity, transform)?;
            }
        }
        Ok(())
    }

    /// Update every entity reachable from the root
    pub fn update(&mut self, dt: f32) {
        for entity in self.entities_in_scene() {
            if let Err(err) = self.update_entity(entity, dt) {
                warn!("Skipped update of {:?}: {}", entity, err);
            }
        }
    }

    /// Remove a node and its subtree from the scene and the arena
    ///
    /// Components of destroyed entities are detached (running their removed
    /// callbacks) and dropped; then the node is detached from its parent.
    pub fn destroy_node(&mut self, id: NodeId) -> SceneResult<()> {
        self.node_or_err(id)?;
        if id == self.root() {
            return Err(SceneError::RootNode(id));
        }

        let mut subtree = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            subtree.push(current);
            stack.extend_from_slice(self.children(current));
        }

        for node in subtree.iter().rev() {
            let components = self.components(*node).to_vec();
            for component in components {
                self.destroy_component(component)?;
            }
        }

        if let Some(parent) = self.parent(id) {
            self.detach(parent, id)?;
        }
        for node in subtree {
            self.nodes.remove(node);
        }
        debug!("Destroyed node {:?}", id);
        Ok(())
    }
}
