//! Render components
//!
//! Both components reference resources by name and resolve them lazily from
//! the resource manager; `resources_loaded` flips once every handle is
//! bound. Entities whose assets are still loading simply skip submission.

use crate::assets::{MaterialHandle, MeshHandle, ModelHandle};
use crate::render::LayerId;

/// Draws one mesh with one material
#[derive(Debug, Clone)]
pub struct MeshRenderComponent {
    /// Mesh resource name
    pub mesh_name: String,
    /// Material resource name
    pub material_name: String,
    /// Resolved mesh handle
    pub mesh: Option<MeshHandle>,
    /// Resolved material handle
    pub material: Option<MaterialHandle>,
    /// Whether both handles have been resolved
    pub resources_loaded: bool,
    /// Whether the entity submits to the queue
    pub visible: bool,
    /// Render layer
    pub layer: LayerId,
    /// Ordering within the layer, lower draws first
    pub priority: i32,
    /// Shadow pass participation
    pub cast_shadows: bool,
    /// Shadow receiving
    pub receive_shadows: bool,
}

impl MeshRenderComponent {
    /// Reference a mesh and material by resource name on the default world
    /// layer
    #[must_use]
    pub fn new(mesh_name: impl Into<String>, material_name: impl Into<String>) -> Self {
        Self {
            mesh_name: mesh_name.into(),
            material_name: material_name.into(),
            mesh: None,
            material: None,
            resources_loaded: false,
            visible: true,
            layer: LayerId(1),
            priority: 0,
            cast_shadows: true,
            receive_shadows: true,
        }
    }

    /// Set the render layer
    #[must_use]
    pub fn with_layer(mut self, layer: LayerId) -> Self {
        self.layer = layer;
        self
    }

    /// Set the in-layer priority
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Forget resolved handles so they re-resolve next frame
    pub fn invalidate(&mut self) {
        self.mesh = None;
        self.material = None;
        self.resources_loaded = false;
    }
}

/// Draws a multi-part model
#[derive(Debug, Clone)]
pub struct ModelComponent {
    /// Model resource name
    pub model_name: String,
    /// Resolved model handle
    pub model: Option<ModelHandle>,
    /// Resolved per-part mesh/material handles
    pub parts: Vec<(MeshHandle, MaterialHandle)>,
    /// Whether the model and all part handles are resolved
    pub resources_loaded: bool,
    /// Whether the entity submits to the queue
    pub visible: bool,
    /// Render layer
    pub layer: LayerId,
    /// Ordering within the layer, lower draws first
    pub priority: i32,
}

impl ModelComponent {
    /// Reference a model by resource name on the default world layer
    #[must_use]
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model: None,
            parts: Vec::new(),
            resources_loaded: false,
            visible: true,
            layer: LayerId(1),
            priority: 0,
        }
    }

    /// Forget resolved handles so they re-resolve next frame
    pub fn invalidate(&mut self) {
        self.model = None;
        self.parts.clear();
        self.resources_loaded = false;
    }
}
