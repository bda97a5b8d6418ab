//! Rendering layer: resource types, the GPU device abstraction, and the
//! per-frame render queue
//!
//! The core never talks to a graphics API directly. Everything GPU-shaped
//! goes through the [`RenderDevice`] trait; [`HeadlessDevice`] is a complete
//! implementation used by tests and tools.

pub mod device;
pub mod layers;
pub mod material;
pub mod mesh;
pub mod model;
pub mod queue;
pub mod shader;
pub mod shapes;
pub mod sprite;
pub mod texture;
pub mod uniforms;

pub use device::{DrawMode, HeadlessDevice, MeshBuffers, RenderDevice};
pub use layers::{LayerId, LayerMask, LayerRegistry};
pub use material::{Material, MaterialParam};
pub use mesh::{Mesh, Vertex};
pub use model::{Model, ModelPart};
pub use queue::{QueueStats, RenderQueue, Renderable, RenderableKind};
pub use shader::Shader;
pub use sprite::{Font, Glyph, SpriteAtlas, SpriteRegion};
pub use texture::Texture;
pub use uniforms::{FrameGlobals, UniformBinder, UniformValue};

use thiserror::Error;

/// Rendering and GPU-upload errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// A payload was rejected during GPU upload
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Shader program linkage failed
    #[error("shader link failed: {0}")]
    LinkFailed(String),

    /// Mesh data violates an invariant (e.g. a non-multiple-of-three index count)
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// All 32 layer mask indices are already assigned
    #[error("layer limit reached: all 32 mask indices are in use")]
    LayerLimit,

    /// A draw referenced a resource the manager does not hold
    #[error("missing resource during draw: {kind} '{name}'")]
    MissingResource {
        /// Kind of the missing resource
        kind: &'static str,
        /// Name the draw referenced
        name: String,
    },
}
