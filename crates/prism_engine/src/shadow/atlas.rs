//! Shadow atlas layout and GPU targets
//!
//! Cascades are packed as square tiles, two per row:
//!
//! ```text
//! +-----+-----+
//! |  2  |  3  |
//! +-----+-----+
//! |  0  |  1  |
//! +-----+-----+
//! ```

use log::info;

use crate::foundation::math::Mat4;
use crate::render::{
    GpuBackend, Rect, RenderResult, RenderTargetId, TextureDataType, TextureDesc, TextureFilter, TextureId,
};

use super::filter::ShadowFilter;

/// Tile arrangement of a cascade atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasLayout {
    tile_size: u32,
    num_tiles: usize,
    columns: u32,
    rows: u32,
}

impl AtlasLayout {
    /// Layout for `num_tiles` tiles of `tile_size` pixels
    pub fn new(tile_size: u32, num_tiles: usize) -> Self {
        let columns = if num_tiles > 1 { 2 } else { 1 };
        let rows = u32::try_from(num_tiles.div_ceil(2)).unwrap_or(1).max(1);
        Self { tile_size, num_tiles, columns, rows }
    }

    /// Side of one tile in pixels
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of tiles
    pub fn num_tiles(&self) -> usize {
        self.num_tiles
    }

    /// Tiles per row
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Tile rows
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Atlas width in pixels
    pub fn width(&self) -> u32 {
        self.tile_size * self.columns
    }

    /// Atlas height in pixels
    pub fn height(&self) -> u32 {
        self.tile_size * self.rows
    }

    /// Whole atlas
    pub fn full_viewport(&self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }

    fn tile_coords(&self, tile: usize) -> (u32, u32) {
        let tile = u32::try_from(tile).unwrap_or(0);
        (tile % self.columns, tile / self.columns)
    }

    /// Pixel rectangle of `tile`
    pub fn viewport(&self, tile: usize) -> Rect {
        let (column, row) = self.tile_coords(tile);
        Rect::new(column * self.tile_size, row * self.tile_size, self.tile_size, self.tile_size)
    }

    /// Matrix from clip space of a cascade to UV space of its tile
    ///
    /// Maps `[-1, 1]` to `[0, 1]` on all axes, then scales and offsets x/y
    /// into the tile.
    pub fn uv_transform(&self, tile: usize) -> Mat4 {
        let (column, row) = self.tile_coords(tile);
        let scale_u = 1.0 / self.columns as f32;
        let scale_v = 1.0 / self.rows as f32;
        let offset_u = column as f32 * scale_u;
        let offset_v = row as f32 * scale_v;

        Mat4::new(
            0.5 * scale_u, 0.0, 0.0, 0.5 * scale_u + offset_u,
            0.0, 0.5 * scale_v, 0.0, 0.5 * scale_v + offset_v,
            0.0, 0.0, 0.5, 0.5,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

/// Extra targets used by the separable blur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurTargets {
    /// Intermediate texture
    pub back_texture: TextureId,
    /// Target rendering into the intermediate texture
    pub back: RenderTargetId,
    /// Target rendering into the atlas texture without depth
    pub front_no_depth: RenderTargetId,
}

/// GPU resources of a cascade atlas
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowAtlas {
    layout: AtlasLayout,
    data_type: TextureDataType,
    texture: TextureId,
    front: RenderTargetId,
    blur: Option<BlurTargets>,
}

impl ShadowAtlas {
    /// Create the atlas texture, its depth target and any blur targets
    pub fn allocate(gpu: &mut dyn GpuBackend, layout: AtlasLayout, filter: &ShadowFilter) -> RenderResult<Self> {
        let data_type = filter.resolve_data_type(gpu)?;
        let desc = TextureDesc {
            width: layout.width(),
            height: layout.height(),
            format: filter.format(),
            data_type,
            filter: TextureFilter::Bilinear,
        };

        let texture = gpu.create_texture(&desc)?;
        let depth = gpu.create_depth_buffer(desc.width, desc.height)?;
        let front = gpu.create_render_target(texture, Some(depth))?;

        let blur = if filter.needs_blur() {
            let back_texture = gpu.create_texture(&desc)?;
            Some(BlurTargets {
                back_texture,
                back: gpu.create_render_target(back_texture, None)?,
                front_no_depth: gpu.create_render_target(texture, None)?,
            })
        } else {
            None
        };

        info!(
            "Allocated {}x{} {:?} shadow atlas ({} cascades, {} filter)",
            desc.width,
            desc.height,
            data_type,
            layout.num_tiles(),
            filter.name()
        );
        Ok(Self { layout, data_type, texture, front, blur })
    }

    /// Tile arrangement
    pub fn layout(&self) -> &AtlasLayout {
        &self.layout
    }

    /// Storage the atlas was created with
    pub fn data_type(&self) -> TextureDataType {
        self.data_type
    }

    /// Texture sampled by the lighting pass
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Target the cascades are rendered into
    pub fn front(&self) -> RenderTargetId {
        self.front
    }

    /// Blur targets, when the filter blurs
    pub fn blur_targets(&self) -> Option<&BlurTargets> {
        self.blur.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    #[test]
    fn test_layout_dimensions() {
        let one = AtlasLayout::new(512, 1);
        assert_eq!((one.width(), one.height()), (512, 512));

        let three = AtlasLayout::new(512, 3);
        assert_eq!((three.columns(), three.rows()), (2, 2));
        assert_eq!(three.viewport(2), Rect::new(0, 512, 512, 512));

        let four = AtlasLayout::new(1024, 4);
        assert_eq!(four.viewport(0), Rect::new(0, 0, 1024, 1024));
        assert_eq!(four.viewport(1), Rect::new(1024, 0, 1024, 1024));
        assert_eq!(four.viewport(3), Rect::new(1024, 1024, 1024, 1024));
    }

    #[test]
    fn test_uv_transform_maps_clip_cube_into_tile() {
        let layout = AtlasLayout::new(1024, 4);

        let low = layout.uv_transform(3) * Vec4::new(-1.0, -1.0, -1.0, 1.0);
        let high = layout.uv_transform(3) * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert_relative_eq!(low, Vec4::new(0.5, 0.5, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(high, Vec4::new(1.0, 1.0, 1.0, 1.0), epsilon = 1e-6);

        let single = AtlasLayout::new(1024, 1);
        let center = single.uv_transform(0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(center, Vec4::new(0.5, 0.5, 0.5, 1.0), epsilon = 1e-6);
    }
}
