//! # Prism Engine
//!
//! A modular real-time 3D rendering engine core written in Rust.
//!
//! ## Features
//!
//! - **Resource Management**: Named, reference-counted handles with a
//!   full dependency graph (cycle detection, depth queries, DOT export)
//! - **Async Loading**: Worker-pool CPU decode with strictly ordered
//!   main-thread GPU upload and per-task completion callbacks
//! - **ECS Architecture**: Data-oriented entities, sparse-set component
//!   storage, registration-ordered systems, and a scene stack
//! - **Layered Rendering**: Per-frame render queue sorted by layer and
//!   priority, filtered through a 32-bit active-layer mask
//! - **Backend Agnostic**: All GPU work goes through the [`render::RenderDevice`]
//!   trait; a headless implementation ships for tests and tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prism_engine::prelude::*;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::default();
//! let resources = Arc::new(ResourceManager::with_defaults());
//! let loader = Arc::new(AsyncResourceLoader::with_default_workers(Arc::clone(&resources)));
//! let mut host = ModuleHost::new(config, resources, loader);
//! let mut device = HeadlessDevice::new();
//!
//! // Per frame:
//! let stats = host.frame(&mut device, 1.0 / 60.0).unwrap();
//! assert_eq!(stats.skipped, 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod core;
pub mod ecs;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{
            AsyncResourceLoader, DependencyTracker, LoadState, ResourceKind, ResourceManager,
        },
        core::{
            config::{EngineConfig, LoaderConfig, LoggingConfig, RendererConfig},
            module_host::{Module, ModuleContext, ModuleHost},
        },
        ecs::{
            components::{
                ActiveComponent, CameraComponent, MeshRenderComponent, NameComponent,
                TagComponent, TransformComponent,
            },
            Component, Entity, Scene, SceneContext, SceneManager, System, World,
        },
        foundation::{
            geometry::{Aabb, Plane, Ray},
            math::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4},
        },
        render::{
            HeadlessDevice, LayerId, LayerMask, LayerRegistry, Material, Mesh, RenderDevice,
            RenderQueue, Renderable, RenderableKind, Shader, Texture,
        },
    };
}
