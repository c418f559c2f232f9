//! # Directional shadows
//!
//! Cascaded shadow maps for directional lights: the
//! [`CascadeShadowMapRenderer`] fits up to four orthographic cascades to the
//! view frustum, gathers casters with a [`CascadeShadowCasterCollector`] and
//! renders them into a tiled [`ShadowAtlas`] stored as the configured
//! [`ShadowFilter`] requires.

mod atlas;
mod caster_collector;
mod cascade;
mod filter;
mod uniforms;

pub use atlas::{AtlasLayout, BlurTargets, ShadowAtlas};
pub use caster_collector::CascadeShadowCasterCollector;
pub use cascade::{
    fit_cascade, split_distances, texel_snap, Cascade, CascadeBox, CascadeShadowMapRenderer,
};
pub use filter::{ShadowFilter, DEFAULT_SOFTNESS};
pub use uniforms::CascadeShadowUniforms;
