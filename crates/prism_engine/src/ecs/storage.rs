//! Sparse-set component storage
//!
//! Each component type gets one [`SparseSet`]: a dense vector of components,
//! a parallel vector of owning entities, and a sparse `entity index -> dense
//! index` table. Insert, lookup and remove are O(1) amortized; removal
//! swap-pops the dense vectors.

use std::any::Any;

use super::entity::Entity;

/// Marker for types storable as components
///
/// Blanket-implemented for every `'static + Send + Sync` type; the world
/// registers storages per concrete type on first insert.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Type-erased storage interface the world uses for entity teardown
pub trait AnyStorage: Send + Sync {
    /// Drop the component owned by `entity`, if any
    fn remove_entity(&mut self, entity: Entity);
    /// Downcast support
    fn as_any(&self) -> &dyn Any;
    /// Downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense component storage with a sparse entity index
#[derive(Debug)]
pub struct SparseSet<T> {
    dense: Vec<T>,
    entities: Vec<Entity>,
    sparse: Vec<Option<u32>>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            dense: Vec::new(),
            entities: Vec::new(),
            sparse: Vec::new(),
        }
    }
}

impl<T> SparseSet<T> {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the component for an entity
    ///
    /// Returns the previous component when the entity already had one.
    pub fn insert(&mut self, entity: Entity, component: T) -> Option<T> {
        if let Some(slot) = self.dense_index(entity) {
            let previous = std::mem::replace(&mut self.dense[slot], component);
            self.entities[slot] = entity;
            return Some(previous);
        }
        let slot = entity.index() as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }
        self.sparse[slot] = Some(self.dense.len() as u32);
        self.dense.push(component);
        self.entities.push(entity);
        None
    }

    /// Component of an entity
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|slot| &self.dense[slot])
    }

    /// Mutable component of an entity
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(|slot| &mut self.dense[slot])
    }

    /// Remove and return the component of an entity
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.dense_index(entity)?;
        self.sparse[entity.index() as usize] = None;
        let last = self.dense.len() - 1;
        if slot != last {
            self.dense.swap(slot, last);
            self.entities.swap(slot, last);
            // The swapped-in component keeps its entity; retarget its sparse
            // entry to the vacated dense slot.
            self.sparse[self.entities[slot].index() as usize] = Some(slot as u32);
        }
        self.entities.pop();
        self.dense.pop()
    }

    /// Whether the entity has a component here
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Number of stored components
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the set stores nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Iterate `(entity, component)` pairs in dense order
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// Iterate `(entity, component)` pairs mutably in dense order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    /// Entities in dense order
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The generation check keeps stale handles from reaching a reused slot.
    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let slot = *self.sparse.get(entity.index() as usize)?;
        let slot = slot? as usize;
        (self.entities[slot] == entity).then_some(slot)
    }
}

impl<T: 'static + Send + Sync> AnyStorage for SparseSet<T> {
    fn remove_entity(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
