//! Asset management
//!
//! CPU-side resource registries, dependency tracking between named
//! resources, and background loading. Resources live behind shared
//! read-write handles so gameplay systems, the render queue and loader
//! worker threads can hold the same asset; GPU uploads still only ever
//! happen on the main thread.

pub mod async_loader;
pub mod dependency_tracker;
pub mod image_loader;
pub mod obj_loader;
pub mod resource_manager;
pub mod shader_loader;

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::render::{Font, Material, Mesh, Model, Shader, SpriteAtlas, Texture};

pub use async_loader::{
    AsyncResourceLoader, AsyncTask, LoadError, LoadState, LoadedResource, TaskId,
};
pub use dependency_tracker::{DependencyError, DependencyTracker, TrackerStatistics};
pub use image_loader::ImageData;
pub use resource_manager::{ResourceManager, ResourceStats};

/// Shared handle to a resource
///
/// Clone is cheap; writers take the lock only for mutation (uploads, edits).
pub type Handle<T> = Arc<RwLock<T>>;

/// Wrap a resource in a shared handle
pub fn handle<T>(value: T) -> Handle<T> {
    Arc::new(RwLock::new(value))
}

/// Shared mesh handle
pub type MeshHandle = Handle<Mesh>;
/// Shared texture handle
pub type TextureHandle = Handle<Texture>;
/// Shared material handle
pub type MaterialHandle = Handle<Material>;
/// Shared shader handle
pub type ShaderHandle = Handle<Shader>;
/// Shared model handle
pub type ModelHandle = Handle<Model>;
/// Shared sprite atlas handle
pub type SpriteAtlasHandle = Handle<SpriteAtlas>;
/// Shared font handle
pub type FontHandle = Handle<Font>;

/// The kind of a registered resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Triangle mesh
    Mesh,
    /// 2D texture
    Texture,
    /// Shader plus parameter set
    Material,
    /// Linked shader program sources
    Shader,
    /// Multi-part mesh/material grouping
    Model,
    /// Named regions over a texture
    SpriteAtlas,
    /// Bitmap font
    Font,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mesh => "mesh",
            Self::Texture => "texture",
            Self::Material => "material",
            Self::Shader => "shader",
            Self::Model => "model",
            Self::SpriteAtlas => "sprite_atlas",
            Self::Font => "font",
        };
        f.write_str(name)
    }
}
