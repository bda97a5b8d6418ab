//! Transform hierarchy propagation

use std::collections::{HashMap, HashSet};

use crate::ecs::components::TransformComponent;
use crate::ecs::entity::Entity;
use crate::ecs::system::{FrameContext, System};
use crate::ecs::world::World;
use crate::foundation::math::Mat4;

/// Deeper than any sane scene graph; walking past it means a parent cycle.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// Propagates parent world matrices to children in hierarchy order
///
/// A transform recomputes when its own TRS changed or when any ancestor
/// recomputed this frame. Entities whose parent handle went stale are
/// detached and become roots.
#[derive(Debug, Default)]
pub struct TransformSystem;

impl TransformSystem {
    /// Create the system
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn hierarchy_depth(
        storage: &crate::ecs::storage::SparseSet<TransformComponent>,
        world: &World,
        entity: Entity,
    ) -> usize {
        let mut depth = 0;
        let mut current = entity;
        while depth < MAX_HIERARCHY_DEPTH {
            let Some(parent) = storage.get(current).and_then(TransformComponent::parent) else {
                break;
            };
            if !world.is_valid_entity(parent) || !storage.contains(parent) {
                break;
            }
            depth += 1;
            current = parent;
        }
        depth
    }
}

impl System for TransformSystem {
    fn name(&self) -> &str {
        "transform_system"
    }

    fn update(&mut self, world: &mut World, _ctx: &mut FrameContext) {
        let Some(storage) = world.storage::<TransformComponent>() else {
            return;
        };

        // Parents must be finished before their children, so order by
        // hierarchy depth.
        let mut ordered: Vec<(Entity, usize)> = storage
            .entities()
            .iter()
            .copied()
            .filter(|&e| world.is_valid_entity(e))
            .map(|e| (e, Self::hierarchy_depth(storage, world, e)))
            .collect();
        ordered.sort_by_key(|&(_, depth)| depth);

        let mut worlds: HashMap<Entity, Mat4> = HashMap::with_capacity(ordered.len());
        let mut updated: HashSet<Entity> = HashSet::new();
        for (entity, _) in ordered {
            let parent = world
                .get_component::<TransformComponent>(entity)
                .ok()
                .and_then(TransformComponent::parent);

            let (parent_world, parent_updated) = match parent {
                Some(p) if world.is_valid_entity(p) && worlds.contains_key(&p) => {
                    (worlds[&p], updated.contains(&p))
                }
                Some(p) if !world.is_valid_entity(p) => {
                    log::debug!("Detaching {} from destroyed parent {}", entity, p);
                    if let Ok(transform) = world.get_component_mut::<TransformComponent>(entity) {
                        transform.set_parent(None);
                    }
                    (Mat4::identity(), false)
                }
                _ => (Mat4::identity(), false),
            };

            let Ok(transform) = world.get_component_mut::<TransformComponent>(entity) else {
                continue;
            };
            if transform.is_dirty() || parent_updated {
                transform.apply_world(parent_world);
                updated.insert(entity);
            }
            worlds.insert(entity, transform.world_matrix());
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
        TransformSystem::new().update(world, &mut ctx);
    }

    #[test]
    fn child_inherits_parent_translation() {
        let mut world = World::new();
        let parent = world.create_entity();
        world
            .add_component(parent, TransformComponent::from_position(Vec3::new(0.0, 5.0, 0.0)))
            .unwrap();
        let child = world.create_entity();
        let mut transform = TransformComponent::from_position(Vec3::new(1.0, 0.0, 0.0));
        transform.set_parent(Some(parent));
        world.add_component(child, transform).unwrap();

        run(&mut world);
        let child_world = world
            .get_component::<TransformComponent>(child)
            .unwrap()
            .world_matrix();
        let position = child_world.position();
        assert_relative_eq!(position.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(position.y, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn parent_motion_reflows_clean_children() {
        let mut world = World::new();
        let parent = world.create_entity();
        world.add_component(parent, TransformComponent::new()).unwrap();
        let child = world.create_entity();
        let mut transform = TransformComponent::new();
        transform.set_parent(Some(parent));
        world.add_component(child, transform).unwrap();

        run(&mut world);
        world
            .get_component_mut::<TransformComponent>(parent)
            .unwrap()
            .set_position(Vec3::new(3.0, 0.0, 0.0));
        run(&mut world);

        let child_world = world
            .get_component::<TransformComponent>(child)
            .unwrap()
            .world_matrix();
        assert_relative_eq!(child_world.position().x, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn destroyed_parent_detaches_child() {
        let mut world = World::new();
        let parent = world.create_entity();
        world
            .add_component(parent, TransformComponent::from_position(Vec3::new(0.0, 5.0, 0.0)))
            .unwrap();
        let child = world.create_entity();
        let mut transform = TransformComponent::from_position(Vec3::new(1.0, 0.0, 0.0));
        transform.set_parent(Some(parent));
        world.add_component(child, transform).unwrap();
        run(&mut world);

        world.destroy_entity(parent).unwrap();
        run(&mut world);

        let component = world.get_component::<TransformComponent>(child).unwrap();
        assert!(component.parent().is_none());
        assert_relative_eq!(component.world_matrix().position().y, 0.0, epsilon = 1e-6);
    }
}
