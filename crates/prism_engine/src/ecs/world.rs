//! ECS world
//!
//! Owns the entity allocator, one sparse-set storage per component type,
//! and the registered systems. The world is single-threaded: all component
//! access and queries happen on the main thread.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use thiserror::Error;

use super::entity::{Entity, EntityAllocator};
use super::storage::{AnyStorage, Component, SparseSet};
use super::system::{FrameContext, System};

/// World errors
#[derive(Debug, Error)]
pub enum EcsError {
    /// The entity handle is stale or was never allocated
    #[error("Invalid entity: {0}")]
    InvalidEntity(Entity),
    /// The entity is live but has no component of the requested type
    #[error("Entity {entity} has no {component}")]
    ComponentNotFound {
        /// The queried entity
        entity: Entity,
        /// Component type name
        component: &'static str,
    },
}

/// Container of entities, components and systems
#[derive(Default)]
pub struct World {
    allocator: EntityAllocator,
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
    systems: Vec<Box<dyn System>>,
}

impl World {
    /// Create an empty world
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new live entity
    pub fn create_entity(&mut self) -> Entity {
        self.allocator.allocate()
    }

    /// Destroy an entity and drop all of its components
    ///
    /// # Errors
    /// Returns [`EcsError::InvalidEntity`] for a stale handle.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        if !self.allocator.deallocate(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        for storage in self.storages.values_mut() {
            storage.remove_entity(entity);
        }
        Ok(())
    }

    /// Whether the handle refers to a live entity
    #[must_use]
    pub fn is_valid_entity(&self, entity: Entity) -> bool {
        self.allocator.is_valid(entity)
    }

    /// Number of live entities
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Attach a component to an entity, replacing any existing one
    ///
    /// # Errors
    /// Returns [`EcsError::InvalidEntity`] for a stale handle.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<Option<T>, EcsError> {
        if !self.allocator.is_valid(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        Ok(self.storage_mut::<T>().insert(entity, component))
    }

    /// Borrow a component of an entity
    ///
    /// # Errors
    /// [`EcsError::InvalidEntity`] for a stale handle,
    /// [`EcsError::ComponentNotFound`] when the live entity lacks the type.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        if !self.allocator.is_valid(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        self.storage::<T>()
            .and_then(|s| s.get(entity))
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: type_name::<T>(),
            })
    }

    /// Mutably borrow a component of an entity
    ///
    /// # Errors
    /// Same contract as [`World::get_component`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        if !self.allocator.is_valid(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        match self.storages.get_mut(&TypeId::of::<T>()) {
            Some(storage) => storage
                .as_any_mut()
                .downcast_mut::<SparseSet<T>>()
                .and_then(|s| s.get_mut(entity))
                .ok_or(EcsError::ComponentNotFound {
                    entity,
                    component: type_name::<T>(),
                }),
            None => Err(EcsError::ComponentNotFound {
                entity,
                component: type_name::<T>(),
            }),
        }
    }

    /// Detach and return a component
    ///
    /// # Errors
    /// Returns [`EcsError::InvalidEntity`] for a stale handle.
    pub fn remove_component<T: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<Option<T>, EcsError> {
        if !self.allocator.is_valid(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        Ok(self
            .storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<SparseSet<T>>())
            .and_then(|s| s.remove(entity)))
    }

    /// Whether a live entity carries a component of this type
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.allocator.is_valid(entity)
            && self.storage::<T>().is_some_and(|s| s.contains(entity))
    }

    /// The storage for a component type, if any component was ever added
    #[must_use]
    pub fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<SparseSet<T>>())
    }

    /// The storage for a component type, created on first use
    pub fn storage_mut<T: Component>(&mut self) -> &mut SparseSet<T> {
        let storage = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()));
        storage
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .unwrap_or_else(|| unreachable!("storage registered under its own TypeId"))
    }

    /// Register a system; systems run in registration order
    pub fn register_system<S: System + 'static>(&mut self, system: S) {
        log::debug!("Registered system '{}'", system.name());
        self.systems.push(Box::new(system));
    }

    /// Number of registered systems
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Run every system once, in registration order
    ///
    /// Systems may register further systems during the update; those join
    /// the order after the current tail and first run next update.
    pub fn update(&mut self, ctx: &mut FrameContext) {
        let mut systems = std::mem::take(&mut self.systems);
        for system in &mut systems {
            system.update(self, ctx);
        }
        systems.append(&mut self.systems);
        self.systems = systems;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ResourceManager;
    use crate::render::{FrameGlobals, LayerRegistry, RenderQueue};
    use std::sync::Arc;

    struct Health(u32);
    struct Velocity(f32);

    fn frame<'a>(
        resources: &'a Arc<ResourceManager>,
        queue: &'a mut RenderQueue,
        layers: &'a LayerRegistry,
        globals: &'a mut FrameGlobals,
    ) -> FrameContext<'a> {
        FrameContext {
            delta_time: 1.0 / 60.0,
            total_time: 0.0,
            resources,
            queue,
            layers,
            globals,
        }
    }

    #[test]
    fn components_attach_and_detach() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(100)).unwrap();
        assert_eq!(world.get_component::<Health>(e).unwrap().0, 100);
        world.get_component_mut::<Health>(e).unwrap().0 = 50;
        assert_eq!(world.remove_component::<Health>(e).unwrap().unwrap().0, 50);
        assert!(matches!(
            world.get_component::<Health>(e),
            Err(EcsError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn destroyed_entity_rejects_all_access() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Health(1)).unwrap();
        world.destroy_entity(e).unwrap();

        assert!(!world.is_valid_entity(e));
        assert!(matches!(
            world.get_component::<Health>(e),
            Err(EcsError::InvalidEntity(_))
        ));
        assert!(matches!(
            world.add_component(e, Velocity(1.0)),
            Err(EcsError::InvalidEntity(_))
        ));
        assert!(world.destroy_entity(e).is_err());
    }

    #[test]
    fn slot_reuse_does_not_leak_components() {
        let mut world = World::new();
        let a = world.create_entity();
        world.add_component(a, Health(7)).unwrap();
        world.destroy_entity(a).unwrap();
        let b = world.create_entity();
        assert_eq!(a.index(), b.index());
        assert!(matches!(
            world.get_component::<Health>(b),
            Err(EcsError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn systems_run_in_registration_order() {
        struct Tick {
            label: u32,
            log: Arc<std::sync::Mutex<Vec<u32>>>,
        }
        impl System for Tick {
            fn name(&self) -> &str {
                "tick"
            }
            fn update(&mut self, _world: &mut World, _ctx: &mut FrameContext) {
                self.log.lock().unwrap().push(self.label);
            }
        }

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut world = World::new();
        for label in [1, 2, 3] {
            world.register_system(Tick {
                label,
                log: Arc::clone(&order),
            });
        }

        let resources = Arc::new(ResourceManager::new());
        let mut queue = RenderQueue::new();
        let layers = LayerRegistry::new();
        let mut globals = FrameGlobals::default();
        world.update(&mut frame(&resources, &mut queue, &layers, &mut globals));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }
}
