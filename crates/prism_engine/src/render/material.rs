//! Material resource
//!
//! A shader reference plus a typed parameter table. The dirty flag tells
//! observers that parameters changed since the last draw.

use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use std::collections::HashMap;

/// A typed material parameter
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialParam {
    /// Scalar float
    Float(f32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// RGBA color
    Color(Vec4),
    /// 4x4 matrix
    Mat4(Mat4),
    /// Reference to a texture resource by name
    Texture(String),
}

/// Material: shader reference + parameter table
#[derive(Debug, Clone)]
pub struct Material {
    shader: String,
    params: HashMap<String, MaterialParam>,
    dirty: bool,
}

impl Material {
    /// Create a material referencing a shader resource by name
    pub fn new(shader: impl Into<String>) -> Self {
        Self {
            shader: shader.into(),
            params: HashMap::new(),
            dirty: true,
        }
    }

    /// Name of the shader resource this material binds
    pub fn shader(&self) -> &str {
        &self.shader
    }

    /// Replace the shader reference
    pub fn set_shader(&mut self, shader: impl Into<String>) {
        self.shader = shader.into();
        self.dirty = true;
    }

    /// Set or replace a parameter
    pub fn set_param(&mut self, name: impl Into<String>, value: MaterialParam) {
        self.params.insert(name.into(), value);
        self.dirty = true;
    }

    /// Set a scalar parameter
    pub fn set_float(&mut self, name: impl Into<String>, value: f32) {
        self.set_param(name, MaterialParam::Float(value));
    }

    /// Set a color parameter
    pub fn set_color(&mut self, name: impl Into<String>, value: Vec4) {
        self.set_param(name, MaterialParam::Color(value));
    }

    /// Set a texture reference parameter
    pub fn set_texture(&mut self, name: impl Into<String>, texture: impl Into<String>) {
        self.set_param(name, MaterialParam::Texture(texture.into()));
    }

    /// Look up a parameter
    pub fn param(&self, name: &str) -> Option<&MaterialParam> {
        self.params.get(name)
    }

    /// Remove a parameter
    pub fn remove_param(&mut self, name: &str) -> Option<MaterialParam> {
        let removed = self.params.remove(name);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Iterate over all parameters
    pub fn params(&self) -> impl Iterator<Item = (&String, &MaterialParam)> {
        self.params.iter()
    }

    /// All texture references as (uniform name, texture resource name)
    pub fn texture_refs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .filter_map(|(name, param)| match param {
                MaterialParam::Texture(texture) => Some((name.as_str(), texture.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Names of resources this material depends on: its shader and every
    /// referenced texture. The resource manager installs these as graph edges.
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = vec![self.shader.clone()];
        for (_, texture) in self.texture_refs() {
            deps.push(texture.to_string());
        }
        deps
    }

    /// Whether parameters changed since the last [`Material::mark_clean`]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge that current parameters have been applied
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
