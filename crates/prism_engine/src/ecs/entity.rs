//! Entity identifiers and allocation
//!
//! An entity is an index into the world's tables paired with a generation
//! counter. Destroying an entity bumps the generation of its slot, so any
//! handle captured before the destroy stops validating instead of aliasing
//! whatever reuses the slot.

/// Handle to an entity in a [`crate::ecs::World`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Slot index inside the world
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the handle was issued at
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

/// Free-list entity allocator
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
}

impl EntityAllocator {
    /// Create an empty allocator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity, reusing a free slot when one exists
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            self.alive[index as usize] = true;
            return Entity {
                index,
                generation: self.generations[index as usize],
            };
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        Entity {
            index,
            generation: 0,
        }
    }

    /// Free an entity's slot and bump its generation
    ///
    /// Returns false when the handle was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_valid(entity) {
            return false;
        }
        let slot = entity.index as usize;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.alive[slot] = false;
        self.free.push(entity.index);
        true
    }

    /// Whether the handle still refers to a live entity
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        let slot = entity.index as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == entity.generation
    }

    /// Number of live entities
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_invalidates_stale_handle() {
        let mut allocator = EntityAllocator::new();
        let a = allocator.allocate();
        assert!(allocator.is_valid(a));
        assert!(allocator.deallocate(a));
        assert!(!allocator.is_valid(a));
        assert!(!allocator.deallocate(a));
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut allocator = EntityAllocator::new();
        let a = allocator.allocate();
        allocator.deallocate(a);
        let b = allocator.allocate();
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(!allocator.is_valid(a));
        assert!(allocator.is_valid(b));
    }

    #[test]
    fn alive_count_tracks_allocations() {
        let mut allocator = EntityAllocator::new();
        let a = allocator.allocate();
        let _b = allocator.allocate();
        assert_eq!(allocator.alive_count(), 2);
        allocator.deallocate(a);
        assert_eq!(allocator.alive_count(), 1);
    }
}
