//! Render options shared by the collector and the shadow renderers

use serde::{Serialize, Deserialize};

use super::{Config, ConfigError};
use crate::shadow::ShadowFilter;

/// Upper bound on directional shadow cascades (one atlas quadrant each)
pub const MAX_SHADOW_CASCADES: usize = 4;

/// # Render Options
///
/// Immutable rendering configuration. Constructed once and handed by
/// reference to [`RenderCollector`](crate::render::RenderCollector) and
/// [`CascadeShadowMapRenderer`](crate::shadow::CascadeShadowMapRenderer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Number of cascades for directional light shadows (1..=4)
    pub num_shadow_cascades: usize,

    /// Resolution in pixels of a single cascade tile
    pub shadow_map_size: u32,

    /// Far-distance fraction of the view range covered by each cascade
    ///
    /// `None` selects the halving scheme (`..., 0.25, 0.5, 1.0`). Ratios must
    /// strictly increase with the cascade index and lie in `(0, 1]`.
    pub cascade_split_ratios: Option<Vec<f32>>,

    /// Filter used by directional light shadow maps
    pub directional_shadow_filter: ShadowFilter,

    /// Whether an ambient occlusion pass runs; forces normal-depth data
    pub ambient_occlusion: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            num_shadow_cascades: MAX_SHADOW_CASCADES,
            shadow_map_size: 1024,
            cascade_split_ratios: None,
            directional_shadow_filter: ShadowFilter::Hard,
            ambient_occlusion: false,
        }
    }
}

impl Config for RenderOptions {}

impl RenderOptions {
    /// Set the cascade count
    pub fn with_cascades(mut self, count: usize) -> Self {
        self.num_shadow_cascades = count;
        self
    }

    /// Set the per-cascade shadow map resolution
    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size;
        self
    }

    /// Set explicit split ratios
    pub fn with_split_ratios(mut self, ratios: Vec<f32>) -> Self {
        self.cascade_split_ratios = Some(ratios);
        self
    }

    /// Set the directional shadow filter
    pub fn with_shadow_filter(mut self, filter: ShadowFilter) -> Self {
        self.directional_shadow_filter = filter;
        self
    }

    /// Enable or disable ambient occlusion
    pub fn with_ambient_occlusion(mut self, enabled: bool) -> Self {
        self.ambient_occlusion = enabled;
        self
    }

    /// Split ratios for the configured cascade count, nearest cascade first
    pub fn split_ratios(&self) -> Vec<f32> {
        if let Some(ratios) = &self.cascade_split_ratios {
            return ratios.clone();
        }

        let mut ratios = vec![0.0; self.num_shadow_cascades];
        let mut ratio = 1.0;
        for slot in ratios.iter_mut().rev() {
            *slot = ratio;
            ratio *= 0.5;
        }
        ratios
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_shadow_cascades == 0 || self.num_shadow_cascades > MAX_SHADOW_CASCADES {
            return Err(ConfigError::Invalid(format!(
                "num_shadow_cascades must be in 1..={MAX_SHADOW_CASCADES}, got {}",
                self.num_shadow_cascades
            )));
        }

        if self.shadow_map_size == 0 {
            return Err(ConfigError::Invalid("shadow_map_size must be at least 1".to_string()));
        }

        let ratios = self.split_ratios();
        if ratios.len() != self.num_shadow_cascades {
            return Err(ConfigError::Invalid(format!(
                "expected {} split ratios, got {}",
                self.num_shadow_cascades,
                ratios.len()
            )));
        }

        if ratios.iter().any(|r| !(*r > 0.0 && *r <= 1.0)) {
            return Err(ConfigError::Invalid("split ratios must lie in (0, 1]".to_string()));
        }

        if ratios.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::Invalid(
                "split ratios must strictly increase from the nearest cascade".to_string(),
            ));
        }

        self.directional_shadow_filter.validate()
    }
}
