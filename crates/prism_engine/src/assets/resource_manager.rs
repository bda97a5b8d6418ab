//! Resource manager
//!
//! Process-wide registry of named CPU-side resources, one `name -> handle`
//! table per kind. Registration also records the resource in the dependency
//! tracker; materials, models, atlases and fonts install their own outgoing
//! edges since they can describe them. `update_resource_dependencies` stays
//! the canonical way to rewrite edges for everything else.
//!
//! The manager never touches the GPU. Handles it hands out are uploaded
//! lazily by the render queue or by the async loader's upload window.

use std::collections::HashMap;
use std::sync::Mutex;

use super::dependency_tracker::{DependencyError, DependencyTracker};
use super::{handle, Handle, ResourceKind};
use super::{
    FontHandle, MaterialHandle, MeshHandle, ModelHandle, ShaderHandle, SpriteAtlasHandle,
    TextureHandle,
};
use crate::render::{Font, Material, Mesh, Model, Shader, SpriteAtlas, Texture};

/// Per-kind resource counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    /// Registered meshes
    pub meshes: usize,
    /// Registered textures
    pub textures: usize,
    /// Registered materials
    pub materials: usize,
    /// Registered shaders
    pub shaders: usize,
    /// Registered models
    pub models: usize,
    /// Registered sprite atlases
    pub sprite_atlases: usize,
    /// Registered fonts
    pub fonts: usize,
}

impl ResourceStats {
    /// Total registered resources across all kinds
    #[must_use]
    pub const fn total(&self) -> usize {
        self.meshes
            + self.textures
            + self.materials
            + self.shaders
            + self.models
            + self.sprite_atlases
            + self.fonts
    }
}

/// Thread-safe registry of named resources
#[derive(Debug, Default)]
pub struct ResourceManager {
    meshes: Mutex<HashMap<String, MeshHandle>>,
    textures: Mutex<HashMap<String, TextureHandle>>,
    materials: Mutex<HashMap<String, MaterialHandle>>,
    shaders: Mutex<HashMap<String, ShaderHandle>>,
    models: Mutex<HashMap<String, ModelHandle>>,
    sprite_atlases: Mutex<HashMap<String, SpriteAtlasHandle>>,
    fonts: Mutex<HashMap<String, FontHandle>>,
    tracker: DependencyTracker,
}

/// Duplicate registration replaces the stored handle and logs a warning.
fn insert<T>(
    map: &Mutex<HashMap<String, Handle<T>>>,
    kind: ResourceKind,
    name: &str,
    value: T,
) -> Handle<T> {
    let shared = handle(value);
    let previous = map
        .lock()
        .unwrap()
        .insert(name.to_string(), shared.clone());
    if previous.is_some() {
        log::warn!("Replacing already-registered {} '{}'", kind, name);
    }
    shared
}

impl ResourceManager {
    /// Create an empty manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager preloaded with the engine fallback resources
    ///
    /// Installs a 1x1 white texture `default_white`, a passthrough shader
    /// `default_shader` and a material `default_material` over both, so
    /// content can render before its real assets finish loading.
    #[must_use]
    pub fn with_defaults() -> Self {
        let manager = Self::new();
        manager.register_texture("default_white", Texture::white());
        manager.register_shader(
            "default_shader",
            Shader::new(
                "void main() { gl_Position = u_view_projection * u_model * vec4(a_position, 1.0); }",
                "void main() { frag_color = u_color * texture(u_albedo, v_uv); }",
            ),
        );
        let mut material = Material::new("default_shader");
        material.set_texture("u_albedo", "default_white");
        manager.register_material("default_material", material);
        manager
    }

    /// The dependency graph shared by every resource kind
    #[must_use]
    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    /// Register a mesh under a name
    pub fn register_mesh(&self, name: &str, mesh: Mesh) -> MeshHandle {
        self.tracker.register(name, ResourceKind::Mesh);
        insert(&self.meshes, ResourceKind::Mesh, name, mesh)
    }

    /// Look up a mesh
    #[must_use]
    pub fn get_mesh(&self, name: &str) -> Option<MeshHandle> {
        self.meshes.lock().unwrap().get(name).cloned()
    }

    /// Remove a mesh; unknown names are a no-op
    pub fn unregister_mesh(&self, name: &str) {
        if self.meshes.lock().unwrap().remove(name).is_some() {
            self.tracker.unregister(name);
        }
    }

    /// Register a texture under a name
    pub fn register_texture(&self, name: &str, texture: Texture) -> TextureHandle {
        self.tracker.register(name, ResourceKind::Texture);
        insert(&self.textures, ResourceKind::Texture, name, texture)
    }

    /// Look up a texture
    #[must_use]
    pub fn get_texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures.lock().unwrap().get(name).cloned()
    }

    /// Remove a texture; unknown names are a no-op
    pub fn unregister_texture(&self, name: &str) {
        if self.textures.lock().unwrap().remove(name).is_some() {
            self.tracker.unregister(name);
        }
    }

    /// Register a material under a name
    ///
    /// The material's shader and texture references are installed as
    /// dependency edges.
    pub fn register_material(&self, name: &str, material: Material) -> MaterialHandle {
        self.tracker.register(name, ResourceKind::Material);
        let dependencies = material.dependencies();
        let shared = insert(&self.materials, ResourceKind::Material, name, material);
        self.install_edges(name, &dependencies);
        shared
    }

    /// Look up a material
    #[must_use]
    pub fn get_material(&self, name: &str) -> Option<MaterialHandle> {
        self.materials.lock().unwrap().get(name).cloned()
    }

    /// Remove a material; unknown names are a no-op
    pub fn unregister_material(&self, name: &str) {
        if self.materials.lock().unwrap().remove(name).is_some() {
            self.tracker.unregister(name);
        }
    }

    /// Register a shader under a name
    pub fn register_shader(&self, name: &str, shader: Shader) -> ShaderHandle {
        self.tracker.register(name, ResourceKind::Shader);
        insert(&self.shaders, ResourceKind::Shader, name, shader)
    }

    /// Look up a shader
    #[must_use]
    pub fn get_shader(&self, name: &str) -> Option<ShaderHandle> {
        self.shaders.lock().unwrap().get(name).cloned()
    }

    /// Remove a shader; unknown names are a no-op
    pub fn unregister_shader(&self, name: &str) {
        if self.shaders.lock().unwrap().remove(name).is_some() {
            self.tracker.unregister(name);
        }
    }

    /// Register a model under a name
    ///
    /// The model's mesh and material references are installed as dependency
    /// edges.
    pub fn register_model(&self, name: &str, model: Model) -> ModelHandle {
        self.tracker.register(name, ResourceKind::Model);
        let dependencies = model.dependencies();
        let shared = insert(&self.models, ResourceKind::Model, name, model);
        self.install_edges(name, &dependencies);
        shared
    }

    /// Look up a model
    #[must_use]
    pub fn get_model(&self, name: &str) -> Option<ModelHandle> {
        self.models.lock().unwrap().get(name).cloned()
    }

    /// Remove a model; unknown names are a no-op
    pub fn unregister_model(&self, name: &str) {
        if self.models.lock().unwrap().remove(name).is_some() {
            self.tracker.unregister(name);
        }
    }

    /// Register a sprite atlas under a name, with its texture edge
    pub fn register_sprite_atlas(&self, name: &str, atlas: SpriteAtlas) -> SpriteAtlasHandle {
        self.tracker.register(name, ResourceKind::SpriteAtlas);
        let dependencies = atlas.dependencies();
        let shared = insert(&self.sprite_atlases, ResourceKind::SpriteAtlas, name, atlas);
        self.install_edges(name, &dependencies);
        shared
    }

    /// Look up a sprite atlas
    #[must_use]
    pub fn get_sprite_atlas(&self, name: &str) -> Option<SpriteAtlasHandle> {
        self.sprite_atlases.lock().unwrap().get(name).cloned()
    }

    /// Remove a sprite atlas; unknown names are a no-op
    pub fn unregister_sprite_atlas(&self, name: &str) {
        if self.sprite_atlases.lock().unwrap().remove(name).is_some() {
            self.tracker.unregister(name);
        }
    }

    /// Register a font under a name, with its texture edge
    pub fn register_font(&self, name: &str, font: Font) -> FontHandle {
        self.tracker.register(name, ResourceKind::Font);
        let dependencies = font.dependencies();
        let shared = insert(&self.fonts, ResourceKind::Font, name, font);
        self.install_edges(name, &dependencies);
        shared
    }

    /// Look up a font
    #[must_use]
    pub fn get_font(&self, name: &str) -> Option<FontHandle> {
        self.fonts.lock().unwrap().get(name).cloned()
    }

    /// Remove a font; unknown names are a no-op
    pub fn unregister_font(&self, name: &str) {
        if self.fonts.lock().unwrap().remove(name).is_some() {
            self.tracker.unregister(name);
        }
    }

    /// Rewrite the outgoing dependency edges of a resource atomically
    ///
    /// # Errors
    /// Returns [`DependencyError::NotFound`] when the name was never
    /// registered.
    pub fn update_resource_dependencies(
        &self,
        name: &str,
        dependencies: &[String],
    ) -> Result<(), DependencyError> {
        self.tracker.set_dependencies(name, dependencies)
    }

    /// Drop every resource of every kind and the whole dependency graph
    pub fn clear(&self) {
        self.meshes.lock().unwrap().clear();
        self.textures.lock().unwrap().clear();
        self.materials.lock().unwrap().clear();
        self.shaders.lock().unwrap().clear();
        self.models.lock().unwrap().clear();
        self.sprite_atlases.lock().unwrap().clear();
        self.fonts.lock().unwrap().clear();
        self.tracker.clear();
        log::debug!("Resource manager cleared");
    }

    /// Per-kind resource counts
    #[must_use]
    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            meshes: self.meshes.lock().unwrap().len(),
            textures: self.textures.lock().unwrap().len(),
            materials: self.materials.lock().unwrap().len(),
            shaders: self.shaders.lock().unwrap().len(),
            models: self.models.lock().unwrap().len(),
            sprite_atlases: self.sprite_atlases.lock().unwrap().len(),
            fonts: self.fonts.lock().unwrap().len(),
        }
    }

    fn install_edges(&self, name: &str, dependencies: &[String]) {
        if let Err(err) = self.tracker.set_dependencies(name, dependencies) {
            log::error!("Failed to install dependencies for '{}': {}", name, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Material, Texture};

    #[test]
    fn duplicate_registration_replaces_handle() {
        let manager = ResourceManager::new();
        let first = manager.register_texture("tex", Texture::white());
        let second = manager.register_texture("tex", Texture::solid_color([255, 0, 0, 255]));
        assert!(!std::sync::Arc::ptr_eq(&first, &second));
        let current = manager.get_texture("tex").unwrap();
        assert!(std::sync::Arc::ptr_eq(&current, &second));
        assert_eq!(manager.stats().textures, 1);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let manager = ResourceManager::new();
        manager.unregister_mesh("ghost");
        assert_eq!(manager.stats().total(), 0);
    }

    #[test]
    fn material_registration_installs_edges() {
        let manager = ResourceManager::new();
        let mut material = Material::new("lit");
        material.set_texture("u_albedo", "bricks");
        manager.register_material("wall", material);

        let mut deps = manager.tracker().get_dependencies("wall");
        deps.sort();
        assert_eq!(deps, vec!["bricks", "lit"]);
        assert_eq!(manager.tracker().depth("wall"), 1);
    }

    #[test]
    fn clear_empties_every_kind_and_graph() {
        let manager = ResourceManager::with_defaults();
        assert!(manager.stats().total() > 0);
        manager.clear();
        assert_eq!(manager.stats().total(), 0);
        assert!(manager.tracker().get_dependencies("default_material").is_empty());
    }

    #[test]
    fn defaults_are_renderable_fallbacks() {
        let manager = ResourceManager::with_defaults();
        assert!(manager.get_texture("default_white").is_some());
        assert!(manager.get_shader("default_shader").is_some());
        let material = manager.get_material("default_material").unwrap();
        assert_eq!(material.read().unwrap().shader(), "default_shader");
    }
}
