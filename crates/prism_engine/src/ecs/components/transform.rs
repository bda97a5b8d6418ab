//! Transform component
//!
//! Local TRS plus cached local and world matrices. Mutators set a dirty
//! flag; the transform system refreshes caches in hierarchy order each
//! frame, so `world_matrix()` reads are free for everything downstream.
//! The parent link is by entity id; a stale parent handle demotes the
//! entity to a root on the next update.

use crate::ecs::entity::Entity;
use crate::foundation::math::{Mat4, Quat, Transform, Vec3};

/// Position, rotation and scale of an entity, with optional parenting
#[derive(Debug, Clone)]
pub struct TransformComponent {
    local: Transform,
    parent: Option<Entity>,
    local_matrix: Mat4,
    world_matrix: Mat4,
    dirty: bool,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            local: Transform::identity(),
            parent: None,
            local_matrix: Mat4::identity(),
            world_matrix: Mat4::identity(),
            dirty: true,
        }
    }
}

impl TransformComponent {
    /// Identity transform with no parent
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an explicit local transform
    #[must_use]
    pub fn from_transform(local: Transform) -> Self {
        Self {
            local,
            ..Self::default()
        }
    }

    /// Build at a world/local position
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self::from_transform(Transform::from_position(position))
    }

    /// Local position
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.local.position
    }

    /// Set the local position
    pub fn set_position(&mut self, position: Vec3) {
        self.local.position = position;
        self.dirty = true;
    }

    /// Move by a local-space offset
    pub fn translate(&mut self, offset: Vec3) {
        self.local.position += offset;
        self.dirty = true;
    }

    /// Local rotation
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.local.rotation
    }

    /// Set the local rotation
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.local.rotation = rotation;
        self.dirty = true;
    }

    /// Local scale
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.local.scale
    }

    /// Set the local scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.local.scale = scale;
        self.dirty = true;
    }

    /// The full local transform
    #[must_use]
    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// Replace the full local transform
    pub fn set_local(&mut self, local: Transform) {
        self.local = local;
        self.dirty = true;
    }

    /// Parent entity, if any
    #[must_use]
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Attach to a parent (or detach with `None`)
    pub fn set_parent(&mut self, parent: Option<Entity>) {
        self.parent = parent;
        self.dirty = true;
    }

    /// Whether caches need a refresh
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a cache refresh on the next update
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Cached local matrix; valid after the last transform system pass
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        self.local_matrix
    }

    /// Cached world matrix; valid after the last transform system pass
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// Recompute the local matrix and install the world matrix, clearing
    /// the dirty flag. Called by the transform system in hierarchy order.
    pub fn apply_world(&mut self, parent_world: Mat4) {
        self.local_matrix = self.local.to_matrix();
        self.world_matrix = parent_world * self.local_matrix;
        self.dirty = false;
    }
}
