//! Frame-global uniform collection

use crate::ecs::components::{CameraComponent, TransformComponent};
use crate::ecs::system::{FrameContext, System};
use crate::ecs::world::World;
use crate::foundation::math::Mat4Ext;

/// Copies the active camera's matrices into the frame globals
///
/// The first active camera in query order wins. With no active camera the
/// previous frame's globals stay in place, which keeps the queue usable
/// for tests that set matrices by hand.
#[derive(Debug, Default)]
pub struct UniformSystem;

impl UniformSystem {
    /// Create the system
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl System for UniformSystem {
    fn name(&self) -> &str {
        "uniform_system"
    }

    fn update(&mut self, world: &mut World, ctx: &mut FrameContext) {
        ctx.globals.time = ctx.total_time;
        for entity in world.query::<(CameraComponent, TransformComponent)>() {
            let Ok(camera) = world.get_component::<CameraComponent>(entity) else {
                continue;
            };
            if !camera.active {
                continue;
            }
            ctx.globals.view = camera.view_matrix();
            ctx.globals.projection = camera.projection_matrix();
            if let Ok(transform) = world.get_component::<TransformComponent>(entity) {
                ctx.globals.camera_position = transform.world_matrix().position();
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ResourceManager;
    use crate::foundation::math::{Mat4, Vec3};
    use crate::render::{FrameGlobals, LayerRegistry, RenderQueue};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn inactive_cameras_are_skipped() {
        let mut world = World::new();
        let idle = world.create_entity();
        let mut transform = TransformComponent::from_position(Vec3::new(9.0, 0.0, 0.0));
        transform.apply_world(Mat4::identity());
        world.add_component(idle, transform).unwrap();
        let mut camera = CameraComponent::perspective(60.0, 1.0, 0.1, 100.0);
        camera.active = false;
        world.add_component(idle, camera).unwrap();

        let live = world.create_entity();
        let mut transform = TransformComponent::from_position(Vec3::new(0.0, 2.0, 0.0));
        transform.apply_world(Mat4::identity());
        world.add_component(live, transform).unwrap();
        world
            .add_component(live, CameraComponent::perspective(60.0, 1.0, 0.1, 100.0))
            .unwrap();

        let resources = Arc::new(ResourceManager::new());
        let mut queue = RenderQueue::new();
        let layers = LayerRegistry::new();
        let mut globals = FrameGlobals::default();
        let mut ctx = FrameContext {
            delta_time: 0.016,
            total_time: 4.5,
            resources: &resources,
            queue: &mut queue,
            layers: &layers,
            globals: &mut globals,
        };
        UniformSystem::new().update(&mut world, &mut ctx);

        assert_relative_eq!(globals.camera_position.y, 2.0, epsilon = 1e-6);
        assert_relative_eq!(globals.time, 4.5, epsilon = 1e-6);
    }
}
