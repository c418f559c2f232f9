//! Scene graph
//!
//! Nodes live in a slotmap arena owned by [`Scene`]. Parents own their
//! children through handle lists; children refer back to their parent with a
//! non-owning [`NodeId`]. Every node is one of a closed set of variants:
//!
//! ```text
//! Group  - ordered children, bounds = union of child world bounds
//! Entity - ordered components, bounds = component bounds in world space
//! ```
//!
//! World matrices and world bounds are pulled lazily and memoized. Bounds
//! invalidation travels up towards the root; matrix invalidation travels down
//! into the subtree.
//!
//! Graph mutation must not interleave with a traversal. The borrow checker
//! enforces this: visitors receive `&Scene`, mutation needs `&mut Scene`.

mod bounds;
mod frustum;
mod graph;
mod node;
mod visitor;

pub use bounds::{Aabb, Expanse};
pub use frustum::{Frustum, FrustumPlane, Plane};
pub use graph::Scene;
pub use node::{NodeKind, SceneNode};
pub use visitor::{SceneVisitor, VisitContext};

pub use crate::foundation::collections::{ComponentId, NodeId};

use thiserror::Error;

/// Structural misuse of the scene graph or the component model
///
/// These signal programming errors in graph construction. The failing call
/// leaves the scene untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The node handle does not refer to a live node
    #[error("Unknown scene node {0:?}")]
    UnknownNode(NodeId),

    /// The component handle does not refer to a live component
    #[error("Unknown component {0:?}")]
    UnknownComponent(ComponentId),

    /// Attaching a node that already has a parent
    #[error("Node {child:?} is already parented to {parent:?}")]
    AlreadyParented {
        /// The node being attached
        child: NodeId,
        /// Its current parent
        parent: NodeId,
    },

    /// Detaching a node from a parent it does not belong to
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The node the child was expected under
        parent: NodeId,
        /// The node being detached
        child: NodeId,
    },

    /// Attaching would make a node its own ancestor (or re-parent the root)
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    CyclicAttachment {
        /// The intended parent
        parent: NodeId,
        /// The node being attached
        child: NodeId,
    },

    /// The root cannot be detached or destroyed
    #[error("Node {0:?} is the scene root")]
    RootNode(NodeId),

    /// The operation needs a group node
    #[error("Node {0:?} is not a group and cannot hold children")]
    NotAGroup(NodeId),

    /// The operation needs an entity node
    #[error("Node {0:?} is not an entity and cannot hold components")]
    NotAnEntity(NodeId),

    /// Adding a component that already belongs to an entity
    #[error("Component {component:?} is already attached to {owner:?}")]
    ComponentAlreadyAttached {
        /// The component being added
        component: ComponentId,
        /// Its current owner
        owner: NodeId,
    },

    /// Removing a component from an entity that does not own it
    #[error("Component {component:?} is not attached to {entity:?}")]
    ComponentNotAttached {
        /// The component being removed
        component: ComponentId,
        /// The entity it was expected on
        entity: NodeId,
    },
}

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;
