//! GPU layout of the cascade shadow uniforms

// bytemuck's derives expand to unsafe impls
#![allow(unsafe_code)]

use bytemuck::{Pod, Zeroable};

use crate::config::MAX_SHADOW_CASCADES;

/// Uniform block consumed by the directional lighting pass
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CascadeShadowUniforms {
    /// World to atlas matrices, column-major
    pub shadow_matrices: [[[f32; 4]; 4]; MAX_SHADOW_CASCADES],
    /// View distance where each cascade ends
    pub split_distances: [f32; MAX_SHADOW_CASCADES],
    /// Number of active cascades
    pub num_cascades: u32,
    /// Filter softness in light space
    pub softness: f32,
    /// Padding to a 16-byte multiple
    pub _padding: [u32; 2],
}
