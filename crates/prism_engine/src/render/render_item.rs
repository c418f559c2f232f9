//! Per-frame draw records and the arena they live in

use std::sync::Arc;

use crate::foundation::math::Mat4;
use crate::scene::{Aabb, NodeId};

use super::material::Material;
use super::mesh::{Mesh, SkeletonPose};

/// One mesh instance to draw, as resolved during collection
///
/// Items hold no camera. The camera a list is drawn with is passed to
/// [`render_pass`](super::render_pass) instead, so one collected list can be
/// drawn from several viewpoints.
#[derive(Debug, Clone)]
pub struct RenderItem {
    /// Material of the mesh instance
    pub material: Arc<Material>,
    /// Geometry to draw
    pub mesh: Arc<Mesh>,
    /// Index of the mesh instance within its model
    pub mesh_index: usize,
    /// Entity the model belongs to; `None` for the skybox
    pub entity: Option<NodeId>,
    /// World matrix of the owning entity
    pub world_matrix: Mat4,
    /// World bounds of the owning entity
    pub world_bounds: Aabb,
    /// Skinning pose, if the model is animated
    pub skeleton: Option<Arc<SkeletonPose>>,
    /// Sort key: world bounds center projected on the camera's forward axis
    pub render_order_hint: f32,
}

/// Arena of render items, reset once per collection
///
/// Lists refer to items by index. Clearing keeps the allocation, so steady
/// scenes stop allocating after the first frames.
#[derive(Debug, Default)]
pub struct RenderItemPool {
    items: Vec<RenderItem>,
}

impl RenderItemPool {
    /// Empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all items, keeping capacity
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Store an item and return its index
    pub fn push(&mut self, item: RenderItem) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    /// Item at `index`
    pub fn get(&self, index: usize) -> Option<&RenderItem> {
        self.items.get(index)
    }

    /// All items in insertion order
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    /// Number of live items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no item was pushed since the last reset
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sort `indices` by hint, ascending or descending
    pub(crate) fn sort_indices(&self, indices: &mut [usize], descending: bool) {
        indices.sort_by(|a, b| {
            let order = self.items[*a]
                .render_order_hint
                .total_cmp(&self.items[*b].render_order_hint);
            if descending { order.reverse() } else { order }
        });
    }
}

/// Ordered view into a [`RenderItemPool`]
#[derive(Debug, Clone, Copy)]
pub struct RenderList<'a> {
    pool: &'a RenderItemPool,
    indices: &'a [usize],
}

impl<'a> RenderList<'a> {
    pub(crate) fn new(pool: &'a RenderItemPool, indices: &'a [usize]) -> Self {
        Self { pool, indices }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Item at position `i` of the list
    pub fn get(&self, i: usize) -> Option<&'a RenderItem> {
        self.indices.get(i).and_then(|index| self.pool.get(*index))
    }

    /// Items in list order
    pub fn iter(&self) -> impl Iterator<Item = &'a RenderItem> + 'a {
        let (pool, indices) = (self.pool, self.indices);
        indices.iter().filter_map(move |index| pool.get(*index))
    }
}

impl<'a> IntoIterator for RenderList<'a> {
    type Item = &'a RenderItem;
    type IntoIter = Box<dyn Iterator<Item = &'a RenderItem> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
