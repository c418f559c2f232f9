//! Scene node storage
//!
//! A [`SceneNode`] is plain data held in the [`Scene`](super::Scene) arena.
//! The caches use `Cell` so world matrices and bounds can be resolved lazily
//! through a shared borrow.

use std::cell::Cell;

use crate::ecs::EntityData;
use crate::foundation::collections::NodeId;
use crate::foundation::math::{Mat4, Transform};

use super::bounds::Aabb;

/// Variant-specific node payload
#[derive(Debug)]
pub enum NodeKind {
    /// Interior node holding ordered children
    Group {
        /// Child handles in insertion order
        children: Vec<NodeId>,
    },
    /// Leaf node holding components
    Entity(EntityData),
}

/// A node in the scene graph
#[derive(Debug)]
pub struct SceneNode {
    pub(crate) name: Option<String>,
    pub(crate) transform: Transform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) visible: bool,
    pub(crate) in_scene: bool,
    pub(crate) kind: NodeKind,

    pub(crate) world_matrix: Cell<Mat4>,
    pub(crate) world_matrix_dirty: Cell<bool>,
    pub(crate) world_bounds: Cell<Aabb>,
    pub(crate) world_bounds_dirty: Cell<bool>,
}

impl SceneNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            transform: Transform::identity(),
            parent: None,
            visible: true,
            in_scene: false,
            kind,
            world_matrix: Cell::new(Mat4::identity()),
            world_matrix_dirty: Cell::new(true),
            world_bounds: Cell::new(Aabb::empty()),
            world_bounds_dirty: Cell::new(true),
        }
    }

    /// Node name, if one was assigned
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Local transform relative to the parent
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Parent handle; `None` for the root and for detached nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the node and its subtree take part in rendering
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the node is reachable from the scene root
    pub fn is_in_scene(&self) -> bool {
        self.in_scene
    }

    /// Variant payload
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Children of a group; empty for entities
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group { children } => children,
            NodeKind::Entity(_) => &[],
        }
    }

    /// Entity payload, if this node is an entity
    pub fn as_entity(&self) -> Option<&EntityData> {
        match &self.kind {
            NodeKind::Entity(entity) => Some(entity),
            NodeKind::Group { .. } => None,
        }
    }

    pub(crate) fn as_entity_mut(&mut self) -> Option<&mut EntityData> {
        match &mut self.kind {
            NodeKind::Entity(entity) => Some(entity),
            NodeKind::Group { .. } => None,
        }
    }

    /// Whether this node can hold children
    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }

    /// Whether this node can hold components
    pub fn is_entity(&self) -> bool {
        matches!(self.kind, NodeKind::Entity(_))
    }

    /// Whether the cached world matrix must be recomputed on next query
    pub fn is_world_matrix_dirty(&self) -> bool {
        self.world_matrix_dirty.get()
    }

    /// Whether the cached world bounds must be recomputed on next query
    pub fn is_world_bounds_dirty(&self) -> bool {
        self.world_bounds_dirty.get()
    }
}
