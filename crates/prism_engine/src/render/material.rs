//! Materials as seen by the render core
//!
//! Shader selection is left to [`MaterialPass`] implementations. The core only
//! needs a material's render path, blend state, buffer requirements and the
//! pass to bind for a given [`PassType`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use super::backend::GpuBackend;
use super::camera::Camera;
use super::render_item::RenderItem;

/// Lighting pipeline a material is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPath {
    /// Forward shading with a fixed light set baked into the shader
    ForwardFixed,
    /// Forward shading, one pass per light
    ForwardDynamic,
    /// Written to the G-buffer, lit in screen space
    Deferred,
}

impl RenderPath {
    /// Every path, in bucket order
    pub const ALL: [RenderPath; 3] = [Self::ForwardFixed, Self::ForwardDynamic, Self::Deferred];

    /// Bucket index of this path
    pub fn index(self) -> usize {
        match self {
            Self::ForwardFixed => 0,
            Self::ForwardDynamic => 1,
            Self::Deferred => 2,
        }
    }

    /// Whether items on this path are drawn by the forward renderer
    pub fn is_forward(self) -> bool {
        !matches!(self, Self::Deferred)
    }
}

/// Blend equation factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source alpha
    SourceAlpha,
    /// 1 - source alpha
    OneMinusSourceAlpha,
    /// Destination color
    DestinationColor,
}

/// Blend equation operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperator {
    /// src + dst
    Add,
    /// src - dst
    Subtract,
    /// dst - src
    ReverseSubtract,
}

/// How a material's output combines with the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Source factor
    pub source: BlendFactor,
    /// Destination factor
    pub destination: BlendFactor,
    /// Operator
    pub operator: BlendOperator,
}

impl BlendState {
    /// Classic alpha blending
    pub const ALPHA: Self = Self {
        source: BlendFactor::SourceAlpha,
        destination: BlendFactor::OneMinusSourceAlpha,
        operator: BlendOperator::Add,
    };

    /// Additive blending
    pub const ADD: Self = Self {
        source: BlendFactor::One,
        destination: BlendFactor::One,
        operator: BlendOperator::Add,
    };

    /// Multiplicative blending
    pub const MULTIPLY: Self = Self {
        source: BlendFactor::DestinationColor,
        destination: BlendFactor::Zero,
        operator: BlendOperator::Add,
    };
}

bitflags! {
    /// Extra render targets a material reads from
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        /// Samples the normal/depth buffer
        const NEEDS_NORMAL_DEPTH = 1 << 0;
        /// Samples a copy of the back buffer (refraction and similar)
        const NEEDS_BACKBUFFER = 1 << 1;
    }
}

/// Purpose of a draw pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassType {
    /// Unlit or fixed-light color pass
    Base,
    /// Normal and depth output
    NormalDepth,
    /// G-buffer fill
    GBuffer,
    /// Additive directional light
    DirLight,
    /// Additive directional light with shadows
    DirLightShadow,
    /// Additive point light
    PointLight,
    /// Additive spot light
    SpotLight,
    /// Depth rendered from a directional light into a shadow map
    DirLightShadowMap,
}

/// A compiled shader pass of a material
///
/// Implemented by the GPU layer. The core calls
/// [`update_pass_render_state`](Self::update_pass_render_state) once when the
/// pass becomes active and
/// [`update_instance_render_state`](Self::update_instance_render_state) once
/// per drawn item.
pub trait MaterialPass: fmt::Debug + Send + Sync {
    /// Bind shader and per-pass uniforms
    fn update_pass_render_state(&self, camera: &Camera, gpu: &mut dyn GpuBackend);

    /// Upload per-instance uniforms (world matrix, skinning)
    fn update_instance_render_state(&self, camera: &Camera, item: &RenderItem, gpu: &mut dyn GpuBackend);
}

/// Surface description shared by mesh instances
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    render_path: RenderPath,
    blend_state: Option<BlendState>,
    flags: MaterialFlags,
    passes: HashMap<PassType, Arc<dyn MaterialPass>>,
}

impl Material {
    /// Create an opaque material without passes
    pub fn new(name: impl Into<String>, render_path: RenderPath) -> Self {
        Self {
            name: name.into(),
            render_path,
            blend_state: None,
            flags: MaterialFlags::empty(),
            passes: HashMap::new(),
        }
    }

    /// Set the blend state; blended materials are drawn as transparents
    pub fn with_blend_state(mut self, blend_state: BlendState) -> Self {
        self.blend_state = Some(blend_state);
        self
    }

    /// Add buffer requirements
    pub fn with_flags(mut self, flags: MaterialFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Register the pass used for `pass_type`
    pub fn with_pass(mut self, pass_type: PassType, pass: Arc<dyn MaterialPass>) -> Self {
        self.passes.insert(pass_type, pass);
        self
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lighting pipeline
    pub fn render_path(&self) -> RenderPath {
        self.render_path
    }

    /// Blend state, `None` for opaque materials
    pub fn blend_state(&self) -> Option<BlendState> {
        self.blend_state
    }

    /// Buffer requirements
    pub fn flags(&self) -> MaterialFlags {
        self.flags
    }

    /// Whether the material samples the normal/depth buffer
    pub fn needs_normal_depth(&self) -> bool {
        self.flags.contains(MaterialFlags::NEEDS_NORMAL_DEPTH)
    }

    /// Whether the material samples the back buffer
    pub fn needs_backbuffer(&self) -> bool {
        self.flags.contains(MaterialFlags::NEEDS_BACKBUFFER)
    }

    /// Whether the material must be drawn back to front after opaques
    pub fn is_transparent(&self) -> bool {
        self.blend_state.is_some() || self.needs_backbuffer()
    }

    /// Pass for `pass_type`, if the material supports it
    pub fn pass(&self, pass_type: PassType) -> Option<&Arc<dyn MaterialPass>> {
        self.passes.get(&pass_type)
    }
}
