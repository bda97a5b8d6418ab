//! Render layers and layer masks
//!
//! A layer is a small integer that groups renderables for ordering and
//! filtering. Layers sort before per-renderable priority, so everything in
//! layer 0 draws before anything in layer 1. A [`LayerMask`] is a bitset over
//! layer ids used by the queue to skip whole layers during a flush.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::render::RenderError;

/// Maximum number of layers a registry can hold
///
/// The mask is 32 bits wide, one bit per layer id.
pub const MAX_LAYERS: u8 = 32;

/// Identifier of a registered render layer
///
/// Lower ids draw first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u8);

impl LayerId {
    /// Raw layer index
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

bitflags! {
    /// Bitset over layer ids used to filter queue flushes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerMask: u32 {
        /// No layers pass the filter
        const NONE = 0;
        /// Every layer passes the filter
        const ALL = u32::MAX;
    }
}

impl LayerMask {
    /// Build a mask from a set of layer ids
    #[must_use]
    pub fn from_layers(layers: &[LayerId]) -> Self {
        let mut mask = Self::NONE;
        for layer in layers {
            mask = mask.with_layer(*layer);
        }
        mask
    }

    /// Return this mask with one more layer set
    ///
    /// Ids at or past [`MAX_LAYERS`] have no bit; the mask is unchanged.
    #[must_use]
    pub fn with_layer(self, layer: LayerId) -> Self {
        if layer.0 >= MAX_LAYERS {
            return self;
        }
        self | Self::from_bits_retain(1 << layer.0)
    }

    /// Whether a layer passes this mask
    ///
    /// Ids at or past [`MAX_LAYERS`] can never be registered and never pass.
    #[must_use]
    pub const fn contains_layer(self, layer: LayerId) -> bool {
        layer.0 < MAX_LAYERS && self.bits() & (1 << layer.0) != 0
    }
}

/// Registry of named render layers
///
/// Names use a `Group.Name` convention. The registry seeds the standard
/// engine layers so systems can resolve them without setup code.
#[derive(Debug)]
pub struct LayerRegistry {
    by_name: HashMap<String, LayerId>,
    names: Vec<String>,
}

impl LayerRegistry {
    /// Create a registry seeded with the standard engine layers
    ///
    /// # Returns
    /// A registry containing `World.Background` (0), `World.Midground` (1),
    /// `World.Foreground` (2), `UI.Default` (3) and `Debug.Overlay` (4).
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            by_name: HashMap::new(),
            names: Vec::new(),
        };
        for name in [
            "World.Background",
            "World.Midground",
            "World.Foreground",
            "UI.Default",
            "Debug.Overlay",
        ] {
            // The seed list is well under MAX_LAYERS, insertion cannot fail.
            let _ = registry.register(name);
        }
        registry
    }

    /// Register a layer name and return its id
    ///
    /// Registering an existing name returns the existing id.
    ///
    /// # Errors
    /// Returns [`RenderError::LayerLimit`] when all [`MAX_LAYERS`] slots are
    /// taken.
    pub fn register(&mut self, name: &str) -> Result<LayerId, RenderError> {
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }
        let next = self.names.len();
        if next >= MAX_LAYERS as usize {
            return Err(RenderError::LayerLimit);
        }
        let id = LayerId(next as u8);
        self.by_name.insert(name.to_string(), id);
        self.names.push(name.to_string());
        log::debug!("Registered render layer '{}' as {}", name, next);
        Ok(id)
    }

    /// Look up a layer id by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<LayerId> {
        self.by_name.get(name).copied()
    }

    /// Look up a layer name by id
    #[must_use]
    pub fn name(&self, id: LayerId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Number of registered layers
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Build a mask over every layer in a named group
    ///
    /// The group of `World.Background` is `World`.
    #[must_use]
    pub fn group_mask(&self, group: &str) -> LayerMask {
        let mut mask = LayerMask::NONE;
        for (index, name) in self.names.iter().enumerate() {
            let layer_group = name.split('.').next().unwrap_or(name);
            if layer_group == group {
                mask = mask.with_layer(LayerId(index as u8));
            }
        }
        mask
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
