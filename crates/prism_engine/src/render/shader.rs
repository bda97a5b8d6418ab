//! Shader resource
//!
//! Vertex/fragment source pair, the linked program id, and the per-program
//! uniform binding table created at link time.

use super::device::RenderDevice;
use super::uniforms::UniformBinder;
use super::RenderError;

/// Shader program with optional GPU residency
#[derive(Debug)]
pub struct Shader {
    vertex_source: String,
    fragment_source: String,
    program: u32,
    uploaded: bool,
    binder: Option<UniformBinder>,
}

impl Shader {
    /// Create from vertex and fragment sources
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            program: 0,
            uploaded: false,
            binder: None,
        }
    }

    /// Vertex shader source
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    /// Fragment shader source
    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    /// Linked program id; zero until uploaded
    pub fn program(&self) -> u32 {
        self.program
    }

    /// Whether the program has been linked
    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// The uniform binding table; present once linked
    pub fn binder_mut(&mut self) -> Option<&mut UniformBinder> {
        self.binder.as_mut()
    }

    /// Link the program on the device. Idempotent once linked.
    pub fn upload(&mut self, device: &mut dyn RenderDevice) -> Result<(), RenderError> {
        if self.uploaded {
            return Ok(());
        }
        self.program = device.link_program(&self.vertex_source, &self.fragment_source)?;
        self.binder = Some(UniformBinder::new(self.program));
        self.uploaded = true;
        log::debug!("linked shader program {}", self.program);
        Ok(())
    }

    /// Release the program and binding table together
    pub fn clear(&mut self, device: &mut dyn RenderDevice) {
        if self.uploaded {
            device.destroy_program(self.program);
        }
        self.program = 0;
        self.uploaded = false;
        self.binder = None;
    }
}
