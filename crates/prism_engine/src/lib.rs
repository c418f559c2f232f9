//! # Prism Engine
//!
//! Scene and rendering core of a real-time 3D engine: a hierarchical scene
//! graph with attachable components, a frustum-culling render collector and
//! cascaded shadow maps for directional lights.
//!
//! ## Features
//!
//! - **Scene Graph**: groups and entities in an arena, with lazily cached
//!   world matrices and bounds
//! - **Components**: type-indexed capabilities attached to entities
//! - **Render Collection**: culled, bucketed and sorted draw lists per camera
//! - **Cascaded Shadows**: texel-snapped cascades in a shared atlas
//!
//! The core never talks to a graphics API directly; it drives an
//! implementation of [`render::GpuBackend`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use prism_engine::prelude::*;
//!
//! let mut scene = Scene::new();
//!
//! let sun = scene.create_entity();
//! scene.set_transform(sun, Transform::looking_along(Vec3::new(0.0, 0.0, 20.0), -Vec3::z())).unwrap();
//! let light = scene.create_component(Light::directional(Vec3::repeat(1.0), 1.0).with_shadows());
//! scene.add_component(sun, light).unwrap();
//! scene.add_child(sun).unwrap();
//!
//! let mesh = Arc::new(Mesh::new(MeshId(1), "cube", Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)), 36));
//! let material = Arc::new(Material::new("stone", RenderPath::Deferred));
//! let crate_box = scene.create_entity();
//! scene.set_transform(crate_box, Transform::from_position(Vec3::new(0.0, 10.0, 0.0))).unwrap();
//! let model = scene.create_component(ModelInstance::from_mesh(mesh, material));
//! scene.add_component(crate_box, model).unwrap();
//! scene.add_child(crate_box).unwrap();
//!
//! let options = RenderOptions::default();
//! let camera = Camera::perspective(60.0, 16.0 / 9.0, 0.1, 100.0);
//!
//! let mut collector = RenderCollector::new(&options);
//! collector.collect(&camera, &scene);
//! assert_eq!(collector.opaque_items(RenderPath::Deferred).len(), 1);
//!
//! let mut shadows = CascadeShadowMapRenderer::new(&scene, sun, &options).unwrap();
//! shadows.prepare(&camera, &scene).unwrap();
//! assert_eq!(shadows.split_distances().len(), 4);
//! ```

pub mod foundation;
pub mod config;
pub mod scene;
pub mod ecs;
pub mod render;
pub mod shadow;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, RenderOptions},
        ecs::{Component, UpdateContext},
        foundation::math::{Mat4, Quat, Transform, Vec3, Vec4},
        render::{
            AmbientLight, Camera, GpuBackend, Light, Material, MaterialPass, Mesh, MeshId, ModelInstance,
            PassType, RenderCollector, RenderError, RenderPath,
        },
        scene::{Aabb, ComponentId, NodeId, Scene, SceneError, SceneVisitor},
        shadow::{CascadeShadowMapRenderer, ShadowFilter},
    };
}
