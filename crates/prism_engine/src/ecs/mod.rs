//! Entity-Component model
//!
//! Entities are scene nodes carrying an ordered list of components. A
//! component is created standalone, attached to at most one entity, and may
//! be enabled or disabled while attached.

mod component;
mod entity;

pub use component::{Component, ComponentTypeRegistry, ComponentsChanged, UpdateContext};
pub use entity::EntityData;

pub(crate) use component::ComponentSlot;
