//! Sprite atlas and font resources
//!
//! Both are thin lookup tables over a texture resource: an atlas maps region
//! names to UV rectangles, a font maps characters to glyph metrics.

use std::collections::HashMap;

/// Normalized UV rectangle inside an atlas texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteRegion {
    /// Left edge (0..1)
    pub u0: f32,
    /// Top edge (0..1)
    pub v0: f32,
    /// Right edge (0..1)
    pub u1: f32,
    /// Bottom edge (0..1)
    pub v1: f32,
}

/// Named regions over one texture resource
#[derive(Debug, Clone)]
pub struct SpriteAtlas {
    texture: String,
    regions: HashMap<String, SpriteRegion>,
}

impl SpriteAtlas {
    /// Create an atlas over a texture resource
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            regions: HashMap::new(),
        }
    }

    /// Texture resource name
    pub fn texture(&self) -> &str {
        &self.texture
    }

    /// Add or replace a named region
    pub fn add_region(&mut self, name: impl Into<String>, region: SpriteRegion) {
        self.regions.insert(name.into(), region);
    }

    /// Look up a region
    pub fn region(&self, name: &str) -> Option<&SpriteRegion> {
        self.regions.get(name)
    }

    /// Number of regions
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Names of resources this atlas depends on
    pub fn dependencies(&self) -> Vec<String> {
        vec![self.texture.clone()]
    }
}

/// Metrics for one glyph in a font atlas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    /// UV rectangle in the font texture
    pub region: SpriteRegion,
    /// Horizontal advance in em units
    pub advance: f32,
}

/// Bitmap font over one texture resource
#[derive(Debug, Clone)]
pub struct Font {
    texture: String,
    glyphs: HashMap<char, Glyph>,
    line_height: f32,
}

impl Font {
    /// Create a font over a texture resource
    pub fn new(texture: impl Into<String>, line_height: f32) -> Self {
        Self {
            texture: texture.into(),
            glyphs: HashMap::new(),
            line_height,
        }
    }

    /// Texture resource name
    pub fn texture(&self) -> &str {
        &self.texture
    }

    /// Line height in em units
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Add or replace a glyph
    pub fn add_glyph(&mut self, character: char, glyph: Glyph) {
        self.glyphs.insert(character, glyph);
    }

    /// Look up a glyph
    pub fn glyph(&self, character: char) -> Option<&Glyph> {
        self.glyphs.get(&character)
    }

    /// Names of resources this font depends on
    pub fn dependencies(&self) -> Vec<String> {
        vec![self.texture.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_region_lookup() {
        let mut atlas = SpriteAtlas::new("ui_atlas");
        atlas.add_region(
            "button",
            SpriteRegion {
                u0: 0.0,
                v0: 0.0,
                u1: 0.5,
                v1: 0.5,
            },
        );
        assert_eq!(atlas.region_count(), 1);
        assert!(atlas.region("button").is_some());
        assert!(atlas.region("missing").is_none());
        assert_eq!(atlas.dependencies(), vec!["ui_atlas"]);
    }
}
