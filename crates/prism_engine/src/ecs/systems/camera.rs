//! Camera matrix maintenance

use crate::ecs::components::{CameraComponent, TransformComponent};
use crate::ecs::system::{FrameContext, System};
use crate::ecs::world::World;
use crate::foundation::math::Mat4;

/// Recomputes view and projection matrices for every camera entity
///
/// The view matrix is the inverse of the camera's world transform. A
/// non-invertible transform (zero scale) falls back to identity with a
/// warning instead of poisoning the frame.
#[derive(Debug, Default)]
pub struct CameraSystem {
    warned_singular: bool,
}

impl CameraSystem {
    /// Create the system
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl System for CameraSystem {
    fn name(&self) -> &str {
        "camera_system"
    }

    fn update(&mut self, world: &mut World, _ctx: &mut FrameContext) {
        let entities = world.query::<(CameraComponent, TransformComponent)>();
        for entity in entities {
            let world_matrix = match world.get_component::<TransformComponent>(entity) {
                Ok(transform) => transform.world_matrix(),
                Err(_) => continue,
            };
            let view = world_matrix.try_inverse().unwrap_or_else(|| {
                if !self.warned_singular {
                    log::warn!("Camera on {} has a singular transform, using identity view", entity);
                    self.warned_singular = true;
                }
                Mat4::identity()
            });
            let Ok(camera) = world.get_component_mut::<CameraComponent>(entity) else {
                continue;
            };
            let projection = camera.compute_projection();
            camera.set_matrices(view, projection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ResourceManager;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use crate::render::{FrameGlobals, LayerRegistry, RenderQueue};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn run(world: &mut World) {
        let resources = Arc::new(ResourceManager::new());
        let mut queue = RenderQueue::new();
        let layers = LayerRegistry::new();
        let mut globals = FrameGlobals::default();
        let mut ctx = FrameContext {
            delta_time: 0.016,
            total_time: 0.0,
            resources: &resources,
            queue: &mut queue,
            layers: &layers,
            globals: &mut globals,
        };
        CameraSystem::new().update(world, &mut ctx);
    }

    #[test]
    fn view_is_inverse_of_world_transform() {
        let mut world = World::new();
        let camera = world.create_entity();
        let mut transform = TransformComponent::from_position(Vec3::new(0.0, 0.0, 10.0));
        transform.apply_world(Mat4::identity());
        world.add_component(camera, transform).unwrap();
        world
            .add_component(camera, CameraComponent::perspective(60.0, 16.0 / 9.0, 0.1, 100.0))
            .unwrap();

        run(&mut world);

        let view = world.get_component::<CameraComponent>(camera).unwrap().view_matrix();
        assert_relative_eq!(view.position().z, -10.0, epsilon = 1e-5);
    }

    #[test]
    fn projection_follows_component_parameters() {
        let mut world = World::new();
        let camera = world.create_entity();
        world.add_component(camera, TransformComponent::new()).unwrap();
        world
            .add_component(camera, CameraComponent::perspective(90.0, 1.0, 0.1, 100.0))
            .unwrap();

        run(&mut world);

        let component = world.get_component::<CameraComponent>(camera).unwrap();
        let expected = component.compute_projection();
        assert_relative_eq!(
            component.projection_matrix()[(1, 1)],
            expected[(1, 1)],
            epsilon = 1e-6
        );
    }
}
