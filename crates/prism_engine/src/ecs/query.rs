//! Entity queries
//!
//! `World::query::<(A, B)>()` returns every live entity carrying all listed
//! component types, driven by the first storage in the tuple. Tag queries go
//! through [`crate::ecs::components::TagComponent`].

use super::components::TagComponent;
use super::entity::Entity;
use super::storage::Component;
use super::world::World;

/// Component tuples usable with [`World::query`]
pub trait QueryTuple {
    /// Entities carrying every component in the tuple
    fn collect(world: &World) -> Vec<Entity>;
}

macro_rules! impl_query_tuple {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first: Component $(, $rest: Component)*> QueryTuple for ($first, $($rest,)*) {
            fn collect(world: &World) -> Vec<Entity> {
                let Some(driver) = world.storage::<$first>() else {
                    return Vec::new();
                };
                driver
                    .entities()
                    .iter()
                    .copied()
                    .filter(|&entity| {
                        world.is_valid_entity(entity)
                            $(&& world.has_component::<$rest>(entity))*
                    })
                    .collect()
            }
        }
    };
}

impl_query_tuple!(A);
impl_query_tuple!(A, B);
impl_query_tuple!(A, B, C);
impl_query_tuple!(A, B, C, D);

impl World {
    /// Entities carrying every component type in `Q`, in the dense order of
    /// the first storage
    #[must_use]
    pub fn query<Q: QueryTuple>(&self) -> Vec<Entity> {
        Q::collect(self)
    }

    /// Entities whose tag multiset contains `tag`
    #[must_use]
    pub fn query_by_tag(&self, tag: &str) -> Vec<Entity> {
        self.storage::<TagComponent>().map_or_else(Vec::new, |storage| {
            storage
                .iter()
                .filter(|(entity, tags)| self.is_valid_entity(*entity) && tags.has_tag(tag))
                .map(|(entity, _)| entity)
                .collect()
        })
    }
}
