//! Shader source decoder
//!
//! Reads paired GLSL sources from disk: a stem path `shaders/lit` resolves
//! to `shaders/lit.vert` and `shaders/lit.frag`. Reading is CPU-only and
//! safe to run on loader worker threads; program linkage happens later on
//! the main thread.

use std::path::Path;

use super::async_loader::LoadError;
use crate::render::Shader;

/// Shader source pair decoder
pub struct ShaderLoader;

impl ShaderLoader {
    /// Read `<stem>.vert` and `<stem>.frag` into an unlinked shader
    ///
    /// # Errors
    /// Returns [`LoadError::Decode`] when either file is missing, unreadable
    /// or empty.
    pub fn load_sources<P: AsRef<Path>>(stem: P) -> Result<Shader, LoadError> {
        let stem = stem.as_ref();
        let vertex_path = stem.with_extension("vert");
        let fragment_path = stem.with_extension("frag");
        log::debug!("Loading shader sources {:?} / {:?}", vertex_path, fragment_path);

        let vertex = read_source(&vertex_path)?;
        let fragment = read_source(&fragment_path)?;
        Ok(Shader::new(vertex, fragment))
    }
}

fn read_source(path: &Path) -> Result<String, LoadError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Decode(format!("failed to read shader source {path:?}: {e}")))?;
    if source.trim().is_empty() {
        return Err(LoadError::Decode(format!("shader source {path:?} is empty")));
    }
    Ok(source)
}
