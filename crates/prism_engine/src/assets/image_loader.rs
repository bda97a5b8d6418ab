//! Image decoding for texture data
//!
//! PNG/JPEG decode into RGBA8 pixel buffers ready for GPU upload. Decoding
//! is CPU-only and safe to run on loader worker threads.

use std::path::Path;

use super::async_loader::LoadError;
use crate::render::{RenderError, Texture};

/// Decoded image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels, always 4 after decode
    pub channels: u8,
}

impl ImageData {
    /// Decode an image file into RGBA8
    ///
    /// # Errors
    /// Returns [`LoadError::Decode`] when the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        log::debug!("Loading image from {:?}", path_ref);

        let img = image::open(path_ref)
            .map_err(|e| LoadError::Decode(format!("failed to load image {path_ref:?}: {e}")))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::info!("Loaded image {}x{} from {:?}", width, height, path_ref);

        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
            channels: 4,
        })
    }

    /// Decode an in-memory image into RGBA8
    ///
    /// # Errors
    /// Returns [`LoadError::Decode`] when the bytes cannot be parsed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| LoadError::Decode(format!("failed to decode image bytes: {e}")))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::debug!("Loaded image {}x{} from memory", width, height);

        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
            channels: 4,
        })
    }

    /// Create a solid color image
    #[must_use]
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }
        Self {
            data,
            width,
            height,
            channels: 4,
        }
    }

    /// Convert into a CPU-side texture resource
    ///
    /// # Errors
    /// Returns [`RenderError::UploadFailed`] when the pixel buffer does not
    /// match the stated dimensions.
    pub fn into_texture(self) -> Result<Texture, RenderError> {
        Texture::new(self.width, self.height, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_color_fills_every_pixel() {
        let image = ImageData::solid_color(2, 2, [10, 20, 30, 255]);
        assert_eq!(image.data.len(), 16);
        assert_eq!(&image.data[4..8], &[10, 20, 30, 255]);
        assert!(image.into_texture().is_ok());
    }

    #[test]
    fn missing_file_reports_decode_error() {
        let result = ImageData::from_file("definitely/not/here.png");
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(ImageData::from_bytes(&[0, 1, 2, 3]).is_err());
    }
}
