//! Texture resource
//!
//! CPU-side RGBA8 pixel data plus the GPU texture id assigned at upload.

use super::device::RenderDevice;
use super::RenderError;

/// 2D texture with optional GPU residency
#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    channels: u8,
    pixels: Vec<u8>,
    gpu_id: u32,
    uploaded: bool,
}

impl Texture {
    /// Create from raw RGBA8 pixel data
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RenderError> {
        if pixels.len() != (width * height * 4) as usize {
            return Err(RenderError::UploadFailed(format!(
                "pixel data size {} does not match {width}x{height} RGBA8",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels: 4,
            pixels,
            gpu_id: 0,
            uploaded: false,
        })
    }

    /// A 1x1 solid color texture, useful as a fallback binding
    pub fn solid_color(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            channels: 4,
            pixels: color.to_vec(),
            gpu_id: 0,
            uploaded: false,
        }
    }

    /// A 1x1 white texture
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255])
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count (always 4 after decode)
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Raw pixel bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// GPU texture id; zero until uploaded
    pub fn gpu_id(&self) -> u32 {
        self.gpu_id
    }

    /// Whether the texture currently exists on the GPU
    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// Upload to the GPU. Idempotent once uploaded.
    pub fn upload(&mut self, device: &mut dyn RenderDevice) -> Result<(), RenderError> {
        if self.uploaded {
            return Ok(());
        }
        self.gpu_id = device.create_texture(self.width, self.height, &self.pixels)?;
        self.uploaded = true;
        log::debug!("uploaded texture {}x{}", self.width, self.height);
        Ok(())
    }

    /// Release GPU and CPU data together
    pub fn clear(&mut self, device: &mut dyn RenderDevice) {
        if self.uploaded {
            device.destroy_texture(self.gpu_id);
        }
        self.gpu_id = 0;
        self.uploaded = false;
        self.pixels.clear();
        self.width = 0;
        self.height = 0;
    }
}
