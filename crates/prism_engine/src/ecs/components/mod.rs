//! Built-in component types

mod camera;
mod misc;
mod render;
mod transform;

pub use camera::{CameraComponent, Projection};
pub use misc::{ActiveComponent, LightComponent, LightKind, NameComponent, TagComponent};
pub use render::{MeshRenderComponent, ModelComponent};
pub use transform::TransformComponent;
