//! Built-in systems
//!
//! The module host registers these in a fixed order: transforms first, then
//! camera, then uniforms, then the render submitters.

mod camera;
mod render;
mod transform;
mod uniform;

pub use camera::CameraSystem;
pub use render::{MeshRenderSystem, ModelRenderSystem};
pub use transform::TransformSystem;
pub use uniform::UniformSystem;
