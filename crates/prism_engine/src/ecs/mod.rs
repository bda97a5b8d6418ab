//! Entity component system
//!
//! Entities are generational indices, components live in per-type sparse
//! sets, and systems run in registration order against a [`World`]. Scenes
//! stack on top of the world through the [`SceneManager`].

pub mod components;
pub mod entity;
pub mod query;
pub mod scene;
pub mod scene_manager;
pub mod storage;
pub mod system;
pub mod systems;
pub mod world;

pub use entity::{Entity, EntityAllocator};
pub use scene::{Scene, SceneContext};
pub use scene_manager::SceneManager;
pub use storage::{Component, SparseSet};
pub use system::{FrameContext, System};
pub use world::{EcsError, World};
