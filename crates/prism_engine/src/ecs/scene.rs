//! Scene trait and scene lifecycle context

use std::sync::Arc;

use crate::assets::{AsyncResourceLoader, ResourceManager};
use crate::ecs::world::World;
use crate::render::LayerRegistry;

/// Services a scene may use during lifecycle callbacks and updates
pub struct SceneContext<'a> {
    /// Entity world shared by all scenes
    pub world: &'a mut World,
    /// Resource registry
    pub resources: &'a Arc<ResourceManager>,
    /// Background loader for streaming assets in
    pub loader: &'a Arc<AsyncResourceLoader>,
    /// Layer name registry
    pub layers: &'a LayerRegistry,
}

/// A unit of game state managed by the [`SceneManager`](crate::ecs::SceneManager) stack
///
/// Scenes stack: pushing a scene pauses the one below it, popping resumes
/// it. Only the top scene receives `update` calls. All callbacks default
/// to no-ops so simple scenes implement only what they need.
pub trait Scene: Send {
    /// Scene name used in logs
    fn name(&self) -> &str;

    /// Called once when the scene is pushed onto the stack
    fn on_enter(&mut self, _ctx: &mut SceneContext) {}

    /// Called once when the scene is popped off the stack
    fn on_exit(&mut self, _ctx: &mut SceneContext) {}

    /// Called when another scene is pushed on top of this one
    fn on_pause(&mut self, _ctx: &mut SceneContext) {}

    /// Called when this scene becomes the top of the stack again
    fn on_resume(&mut self, _ctx: &mut SceneContext) {}

    /// Called every frame while this scene is on top
    fn update(&mut self, _ctx: &mut SceneContext, _delta_time: f32) {}
}
