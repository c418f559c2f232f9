//! # Rendering core
//!
//! Graphics-API independent part of the renderer: materials, meshes, lights
//! and cameras as the core sees them, the per-camera [`RenderCollector`] and
//! the [`render_pass`] helper that turns a render list into draw calls.
//!
//! ## Architecture
//!
//! - **GpuBackend**: the only way the core reaches the GPU
//! - **RenderCollector**: culls and sorts the scene into per-path lists
//! - **MaterialPass**: shader binding, implemented outside the core

mod backend;
mod camera;
mod collector;
mod effect;
mod light;
mod material;
mod mesh;
mod pass;
mod render_item;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    DepthBufferId, GpuBackend, Rect, RenderTargetId, TextureDataType, TextureDesc, TextureFilter,
    TextureFormat, TextureId,
};
pub use camera::{Camera, Projection};
pub use collector::{CollectedLight, RenderCollector};
pub use effect::{EffectsComponent, PostEffect};
pub use light::{AmbientLight, Light, LightType};
pub use material::{
    BlendFactor, BlendOperator, BlendState, Material, MaterialFlags, MaterialPass, PassType, RenderPath,
};
pub use mesh::{Mesh, MeshId, MeshInstance, ModelInstance, SkeletonPose, Skybox};
pub use pass::render_pass;
pub use render_item::{RenderItem, RenderItemPool, RenderList};

use thiserror::Error;

use crate::scene::NodeId;

/// Errors from GPU resource setup and shadow rendering
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Resource creation or management failed
    ///
    /// Occurs when GPU resources (textures, depth buffers, targets) cannot be
    /// created, typically due to memory constraints or invalid sizes.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// The GPU cannot render to the texture data type a shadow filter needs
    #[error("Shadow filter needs {required:?} render targets, which the GPU does not support")]
    UnsupportedDataType {
        /// Data type the filter asked for
        required: TextureDataType,
    },

    /// A cascade index past the configured cascade count
    #[error("Cascade {index} out of range (renderer has {count} cascades)")]
    InvalidCascade {
        /// Requested cascade
        index: usize,
        /// Configured cascade count
        count: usize,
    },

    /// Render options failed validation
    #[error("Invalid render options: {0}")]
    InvalidOptions(String),

    /// The shadow renderer was bound to a node without a directional light
    #[error("Node {0:?} carries no directional light")]
    NotADirectionalLight(NodeId),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
