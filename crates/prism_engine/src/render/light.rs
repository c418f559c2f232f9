//! Light components
//!
//! Lights carry only their photometric data. Position and direction come from
//! the owning entity: lights shine along the entity's local +Y axis.

use crate::ecs::Component;
use crate::foundation::math::Vec3;
use crate::impl_component_any;
use crate::scene::{Aabb, SceneVisitor, VisitContext};

/// Types of lights supported by the lighting system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Directional light (like sunlight) with parallel rays
    Directional,
    /// Point light that radiates in all directions from a position
    Point,
    /// Spot light that creates a cone of light from a position
    Spot,
}

impl LightType {
    /// Order in which lights of this type are rendered
    pub fn priority(self) -> u8 {
        match self {
            Self::Directional => 0,
            Self::Point => 1,
            Self::Spot => 2,
        }
    }
}

/// Directional, point or spot light component
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// The type of light
    pub light_type: LightType,
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Light intensity multiplier
    pub intensity: f32,
    /// Maximum range for point/spot lights
    pub range: f32,
    /// Inner cone angle for spot lights in radians
    pub inner_cone: f32,
    /// Outer cone angle for spot lights in radians
    pub outer_cone: f32,
    /// Whether this light should cast shadows
    pub cast_shadows: bool,
}

impl Light {
    /// Directional light shining along the entity's forward axis
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            color,
            intensity,
            range: f32::INFINITY,
            inner_cone: 0.0,
            outer_cone: 0.0,
            cast_shadows: false,
        }
    }

    /// Point light at the entity's origin
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            range,
            ..Self::directional(color, intensity)
        }
    }

    /// Spot light at the entity's origin shining along its forward axis
    pub fn spot(color: Vec3, intensity: f32, range: f32, inner_cone: f32, outer_cone: f32) -> Self {
        Self {
            light_type: LightType::Spot,
            range,
            inner_cone,
            outer_cone,
            ..Self::directional(color, intensity)
        }
    }

    /// Enable shadow casting
    pub fn with_shadows(mut self) -> Self {
        self.cast_shadows = true;
        self
    }

    /// Color scaled by intensity
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

impl Component for Light {
    fn bounds(&self) -> Option<Aabb> {
        Some(match self.light_type {
            LightType::Directional => Aabb::infinite(),
            LightType::Point | LightType::Spot => {
                Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(self.range))
            }
        })
    }

    fn accept_visitor(&self, ctx: &VisitContext<'_>, visitor: &mut dyn SceneVisitor) {
        visitor.visit_light(self, ctx);
    }

    impl_component_any!();
}

/// Uniform light reaching every surface
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    /// RGB color
    pub color: Vec3,
    /// Intensity multiplier
    pub intensity: f32,
}

impl AmbientLight {
    /// Ambient light of the given color and intensity
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self { color, intensity }
    }

    /// Color scaled by intensity
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

impl Component for AmbientLight {
    fn bounds(&self) -> Option<Aabb> {
        Some(Aabb::infinite())
    }

    fn accept_visitor(&self, ctx: &VisitContext<'_>, visitor: &mut dyn SceneVisitor) {
        visitor.visit_ambient_light(self, ctx);
    }

    impl_component_any!();
}
