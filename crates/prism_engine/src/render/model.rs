//! Model resource
//!
//! A model groups mesh/material pairs so multi-part objects render as one
//! named resource. Parts reference meshes and materials by name; handles
//! are resolved through the resource manager at render time.

/// One drawable part of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPart {
    /// Mesh resource name
    pub mesh: String,
    /// Material resource name
    pub material: String,
}

/// Named collection of mesh/material parts
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Parts in draw order
    pub parts: Vec<ModelPart>,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part
    pub fn add_part(&mut self, mesh: impl Into<String>, material: impl Into<String>) {
        self.parts.push(ModelPart {
            mesh: mesh.into(),
            material: material.into(),
        });
    }

    /// Names of all resources this model depends on
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = Vec::with_capacity(self.parts.len() * 2);
        for part in &self.parts {
            deps.push(part.mesh.clone());
            deps.push(part.material.clone());
        }
        deps.sort();
        deps.dedup();
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_are_deduplicated() {
        let mut model = Model::new();
        model.add_part("hull", "paint");
        model.add_part("wing", "paint");
        let deps = model.dependencies();
        assert_eq!(deps, vec!["hull", "paint", "wing"]);
    }
}
