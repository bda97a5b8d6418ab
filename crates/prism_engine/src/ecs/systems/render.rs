//! Render submission systems
//!
//! These systems walk renderable entities each frame, lazily resolve their
//! named resources through the resource manager, and submit draw requests
//! to the render queue. Entities whose resources are not registered yet
//! (still loading, or misnamed) are skipped until they resolve.

use crate::ecs::components::{
    ActiveComponent, MeshRenderComponent, ModelComponent, TransformComponent,
};
use crate::ecs::entity::Entity;
use crate::ecs::system::{FrameContext, System};
use crate::ecs::world::World;
use crate::render::{Renderable, RenderableKind};

fn is_active(world: &World, entity: Entity) -> bool {
    world
        .get_component::<ActiveComponent>(entity)
        .map_or(true, |active| active.0)
}

/// Submits single-mesh entities to the render queue
#[derive(Debug, Default)]
pub struct MeshRenderSystem;

impl MeshRenderSystem {
    /// Create the system
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl System for MeshRenderSystem {
    fn name(&self) -> &str {
        "mesh_render_system"
    }

    fn update(&mut self, world: &mut World, ctx: &mut FrameContext) {
        for entity in world.query::<(MeshRenderComponent, TransformComponent)>() {
            if !is_active(world, entity) {
                continue;
            }
            let world_matrix = match world.get_component::<TransformComponent>(entity) {
                Ok(transform) => transform.world_matrix(),
                Err(_) => continue,
            };

            let Ok(render) = world.get_component_mut::<MeshRenderComponent>(entity) else {
                continue;
            };
            if !render.visible {
                continue;
            }
            if !render.resources_loaded {
                let mesh = ctx.resources.get_mesh(&render.mesh_name);
                let material = ctx.resources.get_material(&render.material_name);
                match (mesh, material) {
                    (Some(mesh), Some(material)) => {
                        render.mesh = Some(mesh);
                        render.material = Some(material);
                        render.resources_loaded = true;
                    }
                    _ => continue,
                }
            }
            let (Some(mesh), Some(material)) = (render.mesh.clone(), render.material.clone())
            else {
                continue;
            };

            let bounds = mesh.read().unwrap().aabb().transformed(&world_matrix);
            ctx.queue.submit(Renderable {
                kind: RenderableKind::Mesh,
                mesh,
                material,
                transform: world_matrix,
                layer: render.layer,
                priority: render.priority,
                bounds,
            });
        }
    }
}

/// Submits each part of multi-part model entities to the render queue
#[derive(Debug, Default)]
pub struct ModelRenderSystem;

impl ModelRenderSystem {
    /// Create the system
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl System for ModelRenderSystem {
    fn name(&self) -> &str {
        "model_render_system"
    }

    fn update(&mut self, world: &mut World, ctx: &mut FrameContext) {
        for entity in world.query::<(ModelComponent, TransformComponent)>() {
            if !is_active(world, entity) {
                continue;
            }
            let world_matrix = match world.get_component::<TransformComponent>(entity) {
                Ok(transform) => transform.world_matrix(),
                Err(_) => continue,
            };

            let Ok(component) = world.get_component_mut::<ModelComponent>(entity) else {
                continue;
            };
            if !component.visible {
                continue;
            }
            if !component.resources_loaded {
                let Some(model) = ctx.resources.get_model(&component.model_name) else {
                    continue;
                };
                let parts: Vec<_> = model
                    .read()
                    .unwrap()
                    .parts
                    .iter()
                    .map(|part| {
                        let mesh = ctx.resources.get_mesh(&part.mesh)?;
                        let material = ctx.resources.get_material(&part.material)?;
                        Some((mesh, material))
                    })
                    .collect::<Option<Vec<_>>>()
                    .unwrap_or_default();
                // Only a fully resolvable model counts as loaded.
                if parts.is_empty() {
                    continue;
                }
                component.model = Some(model);
                component.parts = parts;
                component.resources_loaded = true;
            }

            let layer = component.layer;
            let priority = component.priority;
            let parts = component.parts.clone();
            for (mesh, material) in parts {
                let bounds = mesh.read().unwrap().aabb().transformed(&world_matrix);
                ctx.queue.submit(Renderable {
                    kind: RenderableKind::Mesh,
                    mesh,
                    material,
                    transform: world_matrix,
                    layer,
                    priority,
                    bounds,
                });
            }
        }
    }
}
