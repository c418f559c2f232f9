//! The scene arena and its structural operations

use std::sync::Arc;

use log::{debug, warn};

use crate::ecs::{ComponentSlot, ComponentTypeRegistry, ComponentsChanged, EntityData};
use crate::foundation::collections::{ComponentId, NodeId, SlotMap};
use crate::foundation::math::{Mat4, Transform};
use crate::foundation::signal::Signal;
use crate::render::{Material, ModelInstance, Skybox};

use super::bounds::Aabb;
use super::node::{NodeKind, SceneNode};
use super::visitor::{SceneVisitor, VisitContext};
use super::{SceneError, SceneResult};

/// Owns every node and component of one scene
///
/// The root is a group that always exists and can never be attached
/// elsewhere. Nodes created with [`create_group`](Self::create_group) or
/// [`create_entity`](Self::create_entity) start detached; they join the scene
/// when attached under a node that is itself in the scene.
pub struct Scene {
    pub(crate) nodes: SlotMap<NodeId, SceneNode>,
    pub(crate) components: SlotMap<ComponentId, ComponentSlot>,
    pub(crate) registry: ComponentTypeRegistry,
    pub(crate) components_changed: Signal<ComponentsChanged>,
    root: NodeId,
    skybox: Option<Skybox>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.nodes.len())
            .field("components", &self.components.len())
            .field("root", &self.root)
            .field("skybox", &self.skybox.is_some())
            .finish()
    }
}

impl Scene {
    /// Create a scene holding only its root group
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root = SceneNode::new(NodeKind::Group { children: Vec::new() });
        root.in_scene = true;
        root.name = Some("root".to_string());
        let root = nodes.insert(root);

        Self {
            nodes,
            components: SlotMap::with_key(),
            registry: ComponentTypeRegistry::default(),
            components_changed: Signal::new(),
            root,
            skybox: None,
        }
    }

    /// The root group
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached, empty group
    pub fn create_group(&mut self) -> NodeId {
        self.nodes.insert(SceneNode::new(NodeKind::Group { children: Vec::new() }))
    }

    /// Create a detached entity without components
    pub fn create_entity(&mut self) -> NodeId {
        self.nodes.insert(SceneNode::new(NodeKind::Entity(EntityData::default())))
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Whether `id` refers to a live node
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node_or_err(&self, id: NodeId) -> SceneResult<&SceneNode> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode(id))
    }

    pub(crate) fn node_mut_or_err(&mut self, id: NodeId) -> SceneResult<&mut SceneNode> {
        self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))
    }

    /// Assign a name used by [`find_node_by_name`](Self::find_node_by_name)
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> SceneResult<()> {
        self.node_mut_or_err(id)?.name = Some(name.into());
        Ok(())
    }

    /// Parent of `id`, if any
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Children of `id`; empty for entities and unknown handles
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[][..], SceneNode::children)
    }

    /// Local transform of `id`
    pub fn transform(&self, id: NodeId) -> Option<&Transform> {
        self.nodes.get(id).map(|node| &node.transform)
    }

    /// Replace the local transform and invalidate the subtree's world matrices
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> SceneResult<()> {
        self.node_mut_or_err(id)?.transform = transform;
        self.invalidate_world_matrix(id);
        Ok(())
    }

    /// Whether `id` is visible; unknown handles are not
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.visible)
    }

    /// Show or hide a node and its subtree
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> SceneResult<()> {
        self.node_mut_or_err(id)?.visible = visible;
        Ok(())
    }

    /// Whether `id` is reachable from the root
    pub fn is_in_scene(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.in_scene)
    }

    /// Attach `child` under the root
    pub fn add_child(&mut self, child: NodeId) -> SceneResult<()> {
        self.attach(self.root, child)
    }

    /// Attach `child` as the last child of the group `parent`
    ///
    /// Fails when either handle is unknown, `parent` is not a group, `child`
    /// already has a parent, or `child` is the root or an ancestor of `parent`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        let result = self.check_attach(parent, child);
        if let Err(err) = &result {
            warn!("Rejected attach: {}", err);
        }
        result?;

        let in_scene = self.nodes[parent].in_scene;
        if let NodeKind::Group { children } = &mut self.nodes[parent].kind {
            children.push(child);
        }
        self.nodes[child].parent = Some(parent);
        self.set_in_scene(child, in_scene);

        self.invalidate_world_matrix(child);
        self.invalidate_world_bounds(parent);
        debug!("Attached {:?} under {:?}", child, parent);
        Ok(())
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        let parent_node = self.node_or_err(parent)?;
        let child_node = self.node_or_err(child)?;

        if !parent_node.is_group() {
            return Err(SceneError::NotAGroup(parent));
        }
        if let Some(current) = child_node.parent {
            return Err(SceneError::AlreadyParented { child, parent: current });
        }
        if child == self.root || self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::CyclicAttachment { parent, child });
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Remove `child` from the group `parent`
    pub fn detach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        self.node_or_err(child)?;
        let position = match &self.node_or_err(parent)?.kind {
            NodeKind::Group { children } => children.iter().position(|c| *c == child),
            NodeKind::Entity(_) => None,
        };
        let Some(position) = position else {
            let err = SceneError::NotAChild { parent, child };
            warn!("Rejected detach: {}", err);
            return Err(err);
        };

        if let NodeKind::Group { children } = &mut self.nodes[parent].kind {
            children.remove(position);
        }
        self.nodes[child].parent = None;
        self.set_in_scene(child, false);

        self.invalidate_world_matrix(child);
        self.invalidate_world_bounds(parent);
        debug!("Detached {:?} from {:?}", child, parent);
        Ok(())
    }

    fn set_in_scene(&mut self, id: NodeId, in_scene: bool) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current) {
                node.in_scene = in_scene;
                stack.extend_from_slice(node.children());
            }
        }
    }

    /// World matrix of `id`, recomputed only if invalidated since last query
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a live node, like indexing a slotmap.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = &self.nodes[id];
        if node.world_matrix_dirty.get() {
            let local = node.transform.to_matrix();
            let world = match node.parent {
                Some(parent) => self.world_matrix(parent) * local,
                None => local,
            };
            node.world_matrix.set(world);
            node.world_matrix_dirty.set(false);
        }
        node.world_matrix.get()
    }

    /// World bounds of `id`, recomputed only if invalidated since last query
    ///
    /// Groups cover the union of their children; entities cover their
    /// components' bounds in world space.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a live node, like indexing a slotmap.
    pub fn world_bounds(&self, id: NodeId) -> Aabb {
        let node = &self.nodes[id];
        if node.world_bounds_dirty.get() {
            let bounds = match &node.kind {
                NodeKind::Group { children } => children
                    .iter()
                    .fold(Aabb::empty(), |acc, child| acc.union(&self.world_bounds(*child))),
                NodeKind::Entity(entity) => self
                    .entity_local_bounds(entity)
                    .transformed(&self.world_matrix(id)),
            };
            node.world_bounds.set(bounds);
            node.world_bounds_dirty.set(false);
        }
        node.world_bounds.get()
    }

    /// Mark the world bounds of `id` and its ancestors stale
    ///
    /// Stops at the first node that is already stale, so repeated calls cost
    /// nothing until the bounds are queried again.
    pub fn invalidate_world_bounds(&self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.nodes.get(id)) {
            if node.world_bounds_dirty.get() {
                return;
            }
            node.world_bounds_dirty.set(true);
            current = node.parent;
        }
    }

    /// Mark the world matrix of `id` and its whole subtree stale
    pub fn invalidate_world_matrix(&self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        node.world_matrix_dirty.set(true);
        self.invalidate_world_bounds(id);
        for child in node.children() {
            self.invalidate_world_matrix(*child);
        }
    }

    /// First node below the root with the given name, depth first
    pub fn find_node_by_name(&self, name: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.children(self.root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.name.as_deref() == Some(name) {
                return Some(id);
            }
            stack.extend(node.children().iter().rev());
        }
        None
    }

    /// First material with the given name used by a model in the scene
    pub fn find_material_by_name(&self, name: &str) -> Option<Arc<Material>> {
        self.entities_in_scene()
            .into_iter()
            .flat_map(|entity| self.components_of::<ModelInstance>(entity))
            .flat_map(ModelInstance::mesh_instances)
            .map(|instance| instance.material())
            .find(|material| material.name() == name)
            .cloned()
    }

    /// Every entity reachable from the root, in depth-first order
    pub fn entities_in_scene(&self) -> Vec<NodeId> {
        let mut entities = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            match &node.kind {
                NodeKind::Group { children } => stack.extend(children.iter().rev()),
                NodeKind::Entity(_) => entities.push(id),
            }
        }
        entities
    }

    /// Skybox drawn behind everything, if any
    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    /// Install or clear the skybox
    pub fn set_skybox(&mut self, skybox: Option<Skybox>) {
        self.skybox = skybox;
    }

    /// Walk the graph from the root
    ///
    /// The root itself is always visited. Each child is entered only if
    /// [`SceneVisitor::qualifies`] accepts it; enabled components of visited
    /// entities then dispatch to the visitor in insertion order.
    pub fn accept_visitor(&self, visitor: &mut dyn SceneVisitor) {
        visitor.visit_scene(self);
        self.visit_node(self.root, visitor);
    }

    fn visit_node(&self, id: NodeId, visitor: &mut dyn SceneVisitor) {
        match &self.nodes[id].kind {
            NodeKind::Group { children } => {
                for child in children {
                    if visitor.qualifies(self, *child) {
                        self.visit_node(*child, visitor);
                    }
                }
            }
            NodeKind::Entity(entity) => {
                let world_matrix = self.world_matrix(id);
                let world_bounds = self.world_bounds(id);
                for component_id in entity.components() {
                    let Some(slot) = self.components.get(*component_id) else {
                        continue;
                    };
                    if !slot.enabled {
                        continue;
                    }
                    let ctx = VisitContext {
                        scene: self,
                        entity: id,
                        component: *component_id,
                        world_matrix,
                        world_bounds,
                    };
                    slot.component.accept_visitor(&ctx, visitor);
                }
            }
        }
    }
}
