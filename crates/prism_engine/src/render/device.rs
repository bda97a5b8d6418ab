//! GPU device abstraction
//!
//! The engine core issues an abstract command sequence per frame:
//! `begin_frame`, `clear`, then per renderable `bind_program` /
//! `set_uniform` / `bind_texture` / `draw_indexed`, then `end_frame` and
//! `present`. Resource creation (buffers, textures, program linkage) goes
//! through the same trait so the upload path stays backend-agnostic.
//!
//! All device calls happen on the main thread; worker threads never see a
//! `RenderDevice`.

use super::uniforms::UniformValue;
use super::RenderError;
use std::collections::{HashMap, HashSet};

/// Primitive assembly mode for indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Independent triangles
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
    /// Independent lines
    Lines,
    /// Connected line strip
    LineStrip,
    /// Closed line loop
    LineLoop,
    /// Points
    Points,
}

/// GPU-side identifiers for an uploaded mesh. All zero until upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshBuffers {
    /// Vertex array object id
    pub vertex_array: u32,
    /// Vertex buffer id
    pub vertex_buffer: u32,
    /// Index buffer id
    pub index_buffer: u32,
}

impl MeshBuffers {
    /// Unuploaded state
    pub const NONE: Self = Self {
        vertex_array: 0,
        vertex_buffer: 0,
        index_buffer: 0,
    };

    /// Whether all three ids have been assigned
    pub fn is_allocated(&self) -> bool {
        self.vertex_array != 0 && self.vertex_buffer != 0 && self.index_buffer != 0
    }
}

/// Abstract GPU submission and resource-creation interface
pub trait RenderDevice {
    /// Start a frame
    fn begin_frame(&mut self);

    /// Clear the current render target
    fn clear(&mut self, color: [f32; 4], depth: bool, stencil: bool);

    /// Bind a linked program for subsequent draws
    fn bind_program(&mut self, program: u32);

    /// Query the location of a named uniform in a program
    fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32>;

    /// Write a uniform value at a location of the bound program
    fn set_uniform(&mut self, program: u32, location: i32, value: &UniformValue);

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: u32);

    /// Issue an indexed draw with the bound state
    fn draw_indexed(&mut self, mode: DrawMode, index_count: u32);

    /// Finish the frame
    fn end_frame(&mut self);

    /// Present the frame to the surface
    fn present(&mut self);

    /// Create vertex/index buffers for a mesh from raw vertex bytes
    fn create_mesh_buffers(
        &mut self,
        vertex_data: &[u8],
        indices: &[u32],
    ) -> Result<MeshBuffers, RenderError>;

    /// Release mesh buffers
    fn destroy_mesh_buffers(&mut self, buffers: MeshBuffers);

    /// Create a 2D RGBA8 texture
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8])
        -> Result<u32, RenderError>;

    /// Release a texture
    fn destroy_texture(&mut self, texture: u32);

    /// Compile and link a program from vertex and fragment sources
    fn link_program(&mut self, vertex_src: &str, fragment_src: &str) -> Result<u32, RenderError>;

    /// Release a program
    fn destroy_program(&mut self, program: u32);
}

/// A recorded draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedDraw {
    /// Program bound at draw time
    pub program: u32,
    /// Assembly mode
    pub mode: DrawMode,
    /// Index count
    pub index_count: u32,
}

/// A complete [`RenderDevice`] with no GPU behind it
///
/// Allocates fake ids, memoizes uniform locations per program, and records
/// the submitted command stream so tests can assert on ordering and counts.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u32,
    next_location: HashMap<u32, i32>,
    locations: HashMap<(u32, String), i32>,
    missing_uniforms: HashSet<String>,
    fail_link: bool,
    fail_texture: bool,

    /// Frames begun
    pub frames: u32,
    /// Clears issued
    pub clears: u32,
    /// Presents issued
    pub presents: u32,
    /// Programs bound, in order
    pub bound_programs: Vec<u32>,
    /// (unit, texture) bindings, in order
    pub bound_textures: Vec<(u32, u32)>,
    /// Uniform writes issued
    pub uniform_writes: u32,
    /// Draw calls, in order
    pub draws: Vec<RecordedDraw>,
    /// Live mesh buffer allocations
    pub live_mesh_buffers: u32,
    /// Live texture allocations
    pub live_textures: u32,
    /// Live program allocations
    pub live_programs: u32,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `name` as absent from every program, so location queries for it
    /// return `None`
    pub fn mark_uniform_missing(&mut self, name: impl Into<String>) {
        self.missing_uniforms.insert(name.into());
    }

    /// Make the next `link_program` calls fail
    pub fn set_fail_link(&mut self, fail: bool) {
        self.fail_link = fail;
    }

    /// Make the next `create_texture` calls fail
    pub fn set_fail_texture(&mut self, fail: bool) {
        self.fail_texture = fail;
    }

    /// Total draw call count
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderDevice for HeadlessDevice {
    fn begin_frame(&mut self) {
        self.frames += 1;
    }

    fn clear(&mut self, _color: [f32; 4], _depth: bool, _stencil: bool) {
        self.clears += 1;
    }

    fn bind_program(&mut self, program: u32) {
        self.bound_programs.push(program);
    }

    fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32> {
        if self.missing_uniforms.contains(name) {
            return None;
        }
        if let Some(&loc) = self.locations.get(&(program, name.to_string())) {
            return Some(loc);
        }
        let next = self.next_location.entry(program).or_insert(0);
        let loc = *next;
        // Reserve a generous span so array setters get consecutive slots.
        *next += 16;
        self.locations.insert((program, name.to_string()), loc);
        Some(loc)
    }

    fn set_uniform(&mut self, _program: u32, _location: i32, _value: &UniformValue) {
        self.uniform_writes += 1;
    }

    fn bind_texture(&mut self, unit: u32, texture: u32) {
        self.bound_textures.push((unit, texture));
    }

    fn draw_indexed(&mut self, mode: DrawMode, index_count: u32) {
        let program = self.bound_programs.last().copied().unwrap_or(0);
        self.draws.push(RecordedDraw {
            program,
            mode,
            index_count,
        });
    }

    fn end_frame(&mut self) {}

    fn present(&mut self) {
        self.presents += 1;
    }

    fn create_mesh_buffers(
        &mut self,
        vertex_data: &[u8],
        indices: &[u32],
    ) -> Result<MeshBuffers, RenderError> {
        if vertex_data.is_empty() || indices.is_empty() {
            return Err(RenderError::UploadFailed(
                "empty vertex or index data".to_string(),
            ));
        }
        self.live_mesh_buffers += 1;
        Ok(MeshBuffers {
            vertex_array: self.alloc_id(),
            vertex_buffer: self.alloc_id(),
            index_buffer: self.alloc_id(),
        })
    }

    fn destroy_mesh_buffers(&mut self, buffers: MeshBuffers) {
        if buffers.is_allocated() {
            self.live_mesh_buffers = self.live_mesh_buffers.saturating_sub(1);
        }
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<u32, RenderError> {
        if self.fail_texture {
            return Err(RenderError::UploadFailed("texture creation failed".into()));
        }
        if rgba.len() != (width * height * 4) as usize {
            return Err(RenderError::UploadFailed(format!(
                "texture data size {} does not match {}x{} RGBA8",
                rgba.len(),
                width,
                height
            )));
        }
        self.live_textures += 1;
        Ok(self.alloc_id())
    }

    fn destroy_texture(&mut self, texture: u32) {
        if texture != 0 {
            self.live_textures = self.live_textures.saturating_sub(1);
        }
    }

    fn link_program(&mut self, vertex_src: &str, fragment_src: &str) -> Result<u32, RenderError> {
        if self.fail_link {
            return Err(RenderError::LinkFailed("program link failed".into()));
        }
        if vertex_src.trim().is_empty() || fragment_src.trim().is_empty() {
            return Err(RenderError::LinkFailed("empty shader source".into()));
        }
        self.live_programs += 1;
        Ok(self.alloc_id())
    }

    fn destroy_program(&mut self, program: u32) {
        if program != 0 {
            self.live_programs = self.live_programs.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_locations_are_memoized_per_program() {
        let mut device = HeadlessDevice::new();
        let a1 = device.uniform_location(1, "u_model").unwrap();
        let a2 = device.uniform_location(1, "u_model").unwrap();
        let b = device.uniform_location(1, "u_view").unwrap();
        let other = device.uniform_location(2, "u_model").unwrap();

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        // Separate programs allocate independently.
        assert_eq!(other, 0);
    }

    #[test]
    fn missing_uniforms_return_none() {
        let mut device = HeadlessDevice::new();
        device.mark_uniform_missing("u_ghost");
        assert!(device.uniform_location(1, "u_ghost").is_none());
        assert!(device.uniform_location(1, "u_real").is_some());
    }

    #[test]
    fn resource_lifecycle_is_balanced() {
        let mut device = HeadlessDevice::new();
        let buffers = device
            .create_mesh_buffers(&[0u8; 16], &[0, 1, 2])
            .unwrap();
        assert!(buffers.is_allocated());
        assert_eq!(device.live_mesh_buffers, 1);
        device.destroy_mesh_buffers(buffers);
        assert_eq!(device.live_mesh_buffers, 0);
    }

    #[test]
    fn link_rejects_empty_source() {
        let mut device = HeadlessDevice::new();
        assert!(device.link_program("", "void main() {}").is_err());
        assert!(device.link_program("void main() {}", "void main() {}").is_ok());
    }
}
