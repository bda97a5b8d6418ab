//! Full frame-loop tests through the public API

use std::sync::Arc;

use prism_engine::assets::{AsyncResourceLoader, ResourceManager};
use prism_engine::core::{EngineConfig, ModuleHost};
use prism_engine::ecs::components::{CameraComponent, MeshRenderComponent, TransformComponent};
use prism_engine::ecs::{Scene, SceneContext};
use prism_engine::foundation::math::Vec3;
use prism_engine::render::{shapes, HeadlessDevice, LayerId, LayerMask, Material, Shader};

fn new_host() -> ModuleHost {
    let resources = Arc::new(ResourceManager::with_defaults());
    let loader = Arc::new(AsyncResourceLoader::with_default_workers(Arc::clone(
        &resources,
    )));
    ModuleHost::new(EngineConfig::default(), resources, loader)
}

fn register_basics(host: &ModuleHost) {
    host.resources().register_shader("basic", Shader::new("vs", "fs"));
    host.resources()
        .register_mesh("cube", shapes::create_cube(1.0).unwrap());
    host.resources()
        .register_material("plain", Material::new("basic"));
}

fn spawn_camera(host: &mut ModuleHost) {
    let camera = host.world_mut().create_entity();
    host.world_mut()
        .add_component(camera, TransformComponent::from_position(Vec3::new(0.0, 2.0, 8.0)))
        .unwrap();
    host.world_mut()
        .add_component(camera, CameraComponent::perspective(60.0, 16.0 / 9.0, 0.1, 100.0))
        .unwrap();
}

fn spawn_cube(host: &mut ModuleHost, layer: LayerId) {
    let cube = host.world_mut().create_entity();
    host.world_mut()
        .add_component(cube, TransformComponent::new())
        .unwrap();
    host.world_mut()
        .add_component(cube, MeshRenderComponent::new("cube", "plain").with_layer(layer))
        .unwrap();
}

/// A scene that builds its world content on entry.
struct BootScene;

impl Scene for BootScene {
    fn name(&self) -> &str {
        "boot"
    }

    fn on_enter(&mut self, ctx: &mut SceneContext) {
        ctx.resources.register_shader("basic", Shader::new("vs", "fs"));
        ctx.resources
            .register_mesh("cube", shapes::create_cube(1.0).unwrap());
        ctx.resources
            .register_material("plain", Material::new("basic"));

        let camera = ctx.world.create_entity();
        ctx.world
            .add_component(camera, TransformComponent::from_position(Vec3::new(0.0, 0.0, 5.0)))
            .unwrap();
        ctx.world
            .add_component(camera, CameraComponent::perspective(60.0, 1.0, 0.1, 100.0))
            .unwrap();

        let cube = ctx.world.create_entity();
        ctx.world
            .add_component(cube, TransformComponent::new())
            .unwrap();
        ctx.world
            .add_component(cube, MeshRenderComponent::new("cube", "plain"))
            .unwrap();
    }
}

#[test]
fn boot_scene_renders_after_a_few_frames() {
    let mut host = new_host();
    host.push_scene(Box::new(BootScene));
    assert_eq!(host.current_scene(), Some("boot"));

    let mut device = HeadlessDevice::new();
    let mut last = None;
    for _ in 0..3 {
        last = Some(host.frame(&mut device, 1.0 / 60.0).unwrap());
    }

    let stats = last.unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(device.live_mesh_buffers, 1);

    let entities = host.world().query::<(MeshRenderComponent,)>();
    assert_eq!(entities.len(), 1);
    let render = host
        .world()
        .get_component::<MeshRenderComponent>(entities[0])
        .unwrap();
    assert!(render.resources_loaded);
    assert!(host.resources().get_mesh("cube").is_some());

    host.shutdown(&mut device);
}

#[test]
fn active_layer_mask_filters_draws() {
    let mut host = new_host();
    register_basics(&host);
    spawn_camera(&mut host);

    let world_layer = host.layers().get("World.Midground").unwrap();
    let ui_layer = host.layers().get("UI.Default").unwrap();
    spawn_cube(&mut host, world_layer);
    spawn_cube(&mut host, ui_layer);

    let world_mask = host.layers().group_mask("World");
    let ui_mask = host.layers().group_mask("UI");
    let mut device = HeadlessDevice::new();

    let cases = [
        (LayerMask::ALL, 2),
        (world_mask, 1),
        (ui_mask, 1),
        (LayerMask::NONE, 0),
        (world_mask | ui_mask, 2),
    ];
    for (mask, expected) in cases {
        host.queue_mut().set_active_layers(mask);
        let stats = host.frame(&mut device, 1.0 / 60.0).unwrap();
        assert_eq!(stats.draw_calls, expected, "mask {mask:?}");
        assert_eq!(stats.submitted, 2, "mask {mask:?}");
        assert_eq!(stats.filtered, 2 - expected, "mask {mask:?}");
    }

    host.shutdown(&mut device);
}

#[test]
fn frames_after_shutdown_are_inert() {
    let mut host = new_host();
    register_basics(&host);
    spawn_camera(&mut host);
    spawn_cube(&mut host, LayerId(1));

    let mut device = HeadlessDevice::new();
    host.frame(&mut device, 1.0 / 60.0).unwrap();
    host.shutdown(&mut device);

    let frames_before = device.frames;
    let stats = host.frame(&mut device, 1.0 / 60.0).unwrap();
    assert_eq!(stats.submitted, 0);
    assert_eq!(device.frames, frames_before);
}
