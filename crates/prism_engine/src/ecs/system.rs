//! System trait and per-frame context
//!
//! Systems are ordinary objects the world invokes in registration order
//! every update. They receive the world plus a [`FrameContext`] carrying the
//! frame's timing, the resource manager, the render queue and the per-frame
//! globals.

use std::sync::Arc;

use crate::assets::ResourceManager;
use crate::render::{FrameGlobals, LayerRegistry, RenderQueue};

use super::world::World;

/// Everything a system may touch besides the world during one update
pub struct FrameContext<'a> {
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Seconds since engine start
    pub total_time: f32,
    /// Shared resource registry
    pub resources: &'a Arc<ResourceManager>,
    /// The frame's render queue; systems submit renderables here
    pub queue: &'a mut RenderQueue,
    /// Layer name lookup
    pub layers: &'a LayerRegistry,
    /// Per-frame global uniforms, written by the camera/uniform systems
    pub globals: &'a mut FrameGlobals,
}

/// A unit of per-frame logic run by [`World::update`]
pub trait System: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Run one update against the world
    fn update(&mut self, world: &mut World, ctx: &mut FrameContext);
}
