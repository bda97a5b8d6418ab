//! Name, tag, activity and light components

use crate::foundation::math::Vec3;

/// Human-readable entity name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameComponent(pub String);

impl NameComponent {
    /// Name an entity
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Multiset of string tags
///
/// Adding the same tag twice requires removing it twice; `has_tag` matches
/// on at least one occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagComponent {
    tags: Vec<String>,
}

impl TagComponent {
    /// Empty tag set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-tag set
    #[must_use]
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            tags: vec![tag.into()],
        }
    }

    /// Add one occurrence of a tag
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }

    /// Remove one occurrence of a tag; returns whether one was present
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        if let Some(index) = self.tags.iter().position(|t| t == tag) {
            self.tags.swap_remove(index);
            return true;
        }
        false
    }

    /// Whether the multiset contains at least one occurrence
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// All tags, duplicates included
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Opt-out switch for per-frame processing
///
/// Systems skip entities carrying an inactive component; entities without
/// one count as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveComponent(pub bool);

impl Default for ActiveComponent {
    fn default() -> Self {
        Self(true)
    }
}

/// Light source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Infinitely distant light along the entity's -Z
    Directional,
    /// Omnidirectional light at the entity's position
    Point,
}

/// Light source parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightComponent {
    /// Kind of the light
    pub kind: LightKind,
    /// Linear RGB color
    pub color: Vec3,
    /// Scalar intensity multiplier
    pub intensity: f32,
    /// Falloff range for point lights
    pub range: f32,
}

impl LightComponent {
    /// White directional light
    #[must_use]
    pub fn directional() -> Self {
        Self {
            kind: LightKind::Directional,
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            range: f32::INFINITY,
        }
    }

    /// White point light with a falloff range
    #[must_use]
    pub fn point(range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            range,
        }
    }
}
