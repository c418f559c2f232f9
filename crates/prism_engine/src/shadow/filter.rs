//! Directional shadow filters
//!
//! A filter decides how the shadow atlas is stored and post-processed. The
//! lighting shaders that sample it live outside the core.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::render::{GpuBackend, RenderError, RenderResult, TextureDataType, TextureFormat};

/// Default world-space softness (blur radius and cascade inflation)
pub const DEFAULT_SOFTNESS: f32 = 0.002;

fn default_softness() -> f32 {
    DEFAULT_SOFTNESS
}

fn default_pcf_samples() -> u32 {
    6
}

fn default_darkening_factor() -> f32 {
    350.0
}

fn default_light_bleed_reduction() -> f32 {
    0.35
}

fn default_blur_passes() -> u32 {
    1
}

/// Shadow map filtering technique
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShadowFilter {
    /// Single depth comparison
    Hard,
    /// Percentage-closer filtering
    Pcf {
        /// Sampling radius in light space
        #[serde(default = "default_softness")]
        softness: f32,
        /// Depth comparisons per pixel
        #[serde(default = "default_pcf_samples")]
        num_samples: u32,
    },
    /// Exponential shadow maps
    Exponential {
        /// Blur radius in light space
        #[serde(default = "default_softness")]
        softness: f32,
        /// Exponent applied to depth
        #[serde(default = "default_darkening_factor")]
        darkening_factor: f32,
        /// Separable blur iterations
        #[serde(default = "default_blur_passes")]
        blur_passes: u32,
    },
    /// Variance shadow maps
    Variance {
        /// Blur radius in light space
        #[serde(default = "default_softness")]
        softness: f32,
        /// Fraction of the variance tail cut off against light bleeding
        #[serde(default = "default_light_bleed_reduction")]
        light_bleed_reduction: f32,
        /// Separable blur iterations
        #[serde(default = "default_blur_passes")]
        blur_passes: u32,
        /// Fall back to 8-bit storage when no float target is available
        #[serde(default)]
        allow_low_precision: bool,
    },
}

impl Default for ShadowFilter {
    fn default() -> Self {
        Self::Hard
    }
}

impl ShadowFilter {
    /// PCF with default parameters
    pub fn pcf() -> Self {
        Self::Pcf { softness: DEFAULT_SOFTNESS, num_samples: default_pcf_samples() }
    }

    /// ESM with default parameters
    pub fn exponential() -> Self {
        Self::Exponential {
            softness: DEFAULT_SOFTNESS,
            darkening_factor: default_darkening_factor(),
            blur_passes: default_blur_passes(),
        }
    }

    /// VSM with default parameters
    pub fn variance() -> Self {
        Self::Variance {
            softness: DEFAULT_SOFTNESS,
            light_bleed_reduction: default_light_bleed_reduction(),
            blur_passes: default_blur_passes(),
            allow_low_precision: false,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Pcf { .. } => "pcf",
            Self::Exponential { .. } => "exponential",
            Self::Variance { .. } => "variance",
        }
    }

    /// Light-space amount each cascade box is inflated by
    pub fn softness(&self) -> f32 {
        match self {
            Self::Hard => DEFAULT_SOFTNESS,
            Self::Pcf { softness, .. }
            | Self::Exponential { softness, .. }
            | Self::Variance { softness, .. } => *softness,
        }
    }

    /// Separable blur iterations run after rendering the atlas
    pub fn blur_passes(&self) -> u32 {
        match self {
            Self::Hard | Self::Pcf { .. } => 0,
            Self::Exponential { blur_passes, .. } | Self::Variance { blur_passes, .. } => *blur_passes,
        }
    }

    /// Whether the atlas is blurred (and needs a back buffer)
    pub fn needs_blur(&self) -> bool {
        self.blur_passes() > 0
    }

    /// Texel layout of the atlas
    pub fn format(&self) -> TextureFormat {
        TextureFormat::Rgba
    }

    /// Preferred texel storage of the atlas
    pub fn data_type(&self) -> TextureDataType {
        match self {
            Self::Hard | Self::Pcf { .. } | Self::Exponential { .. } => TextureDataType::UnsignedByte,
            Self::Variance { .. } => TextureDataType::HalfFloat,
        }
    }

    /// Storage the atlas is actually created with on `gpu`
    ///
    /// Half floats fall back to full floats, then to bytes when the filter
    /// allows low precision. Anything else unsupported is an error.
    pub fn resolve_data_type(&self, gpu: &dyn GpuBackend) -> RenderResult<TextureDataType> {
        let preferred = self.data_type();
        if gpu.supports_data_type(preferred) {
            return Ok(preferred);
        }

        if preferred == TextureDataType::HalfFloat && gpu.supports_data_type(TextureDataType::Float) {
            warn!("Half-float shadow maps unsupported, using float for {} filter", self.name());
            return Ok(TextureDataType::Float);
        }

        let allows_bytes = matches!(self, Self::Variance { allow_low_precision: true, .. });
        if allows_bytes && gpu.supports_data_type(TextureDataType::UnsignedByte) {
            warn!("Float shadow maps unsupported, degrading {} filter to 8-bit", self.name());
            return Ok(TextureDataType::UnsignedByte);
        }

        Err(RenderError::UnsupportedDataType { required: preferred })
    }

    /// Validate the parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let softness = self.softness();
        if !softness.is_finite() || softness < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "{} shadow softness must be finite and non-negative, got {softness}",
                self.name()
            )));
        }

        match self {
            Self::Pcf { num_samples: 0, .. } => {
                Err(ConfigError::Invalid("pcf shadow filter needs at least one sample".to_string()))
            }
            Self::Exponential { darkening_factor, .. } if *darkening_factor <= 0.0 => Err(
                ConfigError::Invalid(format!("darkening factor must be positive, got {darkening_factor}")),
            ),
            Self::Variance { light_bleed_reduction, .. }
                if !(0.0..1.0).contains(light_bleed_reduction) =>
            {
                Err(ConfigError::Invalid(format!(
                    "light bleed reduction must lie in [0, 1), got {light_bleed_reduction}"
                )))
            }
            _ => Ok(()),
        }
    }
}
