//! GPU backend abstraction consumed by the render core
//!
//! The core never talks to a graphics API directly. It selects targets,
//! clears, sets viewports and issues draws through [`GpuBackend`]; the
//! implementation owns shaders, uniform binding and the actual resources.

use crate::foundation::math::Vec4;

use super::material::{BlendState, PassType};
use super::mesh::Mesh;
use super::RenderResult;

/// Handle to a texture created by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Handle to a depth buffer created by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthBufferId(pub u32);

/// Handle to a frame buffer (color texture plus optional depth)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub u32);

/// Texel layout of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    /// Four channels
    Rgba,
    /// Single channel
    Red,
}

/// Per-channel storage of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureDataType {
    /// 8-bit normalized
    UnsignedByte,
    /// 16-bit float
    HalfFloat,
    /// 32-bit float
    Float,
}

/// Sampling filter of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    /// Nearest texel
    Nearest,
    /// Linear interpolation
    Bilinear,
}

/// Everything needed to allocate a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Channel layout
    pub format: TextureFormat,
    /// Channel storage
    pub data_type: TextureDataType,
    /// Sampling filter
    pub filter: TextureFilter,
}

/// Pixel rectangle of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge
    pub x: u32,
    /// Bottom edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a rectangle
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Graphics API seam
///
/// All calls are blocking and happen on the render thread.
pub trait GpuBackend {
    /// Whether textures of `data_type` can be rendered to
    fn supports_data_type(&self, data_type: TextureDataType) -> bool;

    /// Allocate a texture
    fn create_texture(&mut self, desc: &TextureDesc) -> RenderResult<TextureId>;

    /// Allocate a depth buffer
    fn create_depth_buffer(&mut self, width: u32, height: u32) -> RenderResult<DepthBufferId>;

    /// Combine a color texture and optional depth buffer into a target
    fn create_render_target(
        &mut self,
        color: TextureId,
        depth: Option<DepthBufferId>,
    ) -> RenderResult<RenderTargetId>;

    /// Select a target; `None` selects the default frame buffer
    fn set_render_target(&mut self, target: Option<RenderTargetId>);

    /// Restrict drawing to a rectangle of the current target
    fn set_viewport(&mut self, viewport: Rect);

    /// Color used by [`clear`](Self::clear)
    fn set_clear_color(&mut self, color: Vec4);

    /// Clear color and depth of the current viewport
    fn clear(&mut self);

    /// Enable or disable color writes
    fn set_color_mask(&mut self, enabled: bool);

    /// Set or reset (`None`) blending
    fn set_blend_state(&mut self, state: Option<BlendState>);

    /// Bind vertex and index data of `mesh` for `pass`
    fn bind_mesh(&mut self, mesh: &Mesh, pass: PassType);

    /// Draw the bound mesh
    fn draw(&mut self, mesh: &Mesh);

    /// Run one direction of the separable shadow blur, sampling `source`
    ///
    /// `step` is the texel offset between samples in UV units.
    fn blur(&mut self, source: TextureId, step: (f32, f32));
}
