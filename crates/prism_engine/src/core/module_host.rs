//! Module host and frame loop
//!
//! The host owns the world, the scene stack, and the render queue, and
//! drives one frame end to end: module pre-frame hooks, upload drain,
//! scene update, system update, render hooks, queue flush, present.
//! Modules are plugins keyed by a slotmap id and dispatched in
//! (priority, registration) order.

use std::sync::Arc;

use slotmap::SlotMap;

use crate::assets::{AsyncResourceLoader, ResourceManager};
use crate::core::config::EngineConfig;
use crate::ecs::systems::{
    CameraSystem, MeshRenderSystem, ModelRenderSystem, TransformSystem, UniformSystem,
};
use crate::ecs::{FrameContext, Scene, SceneContext, SceneManager, World};
use crate::render::{
    FrameGlobals, LayerRegistry, QueueStats, RenderDevice, RenderError, RenderQueue,
};

slotmap::new_key_type! {
    /// Stable handle for a registered module
    pub struct ModuleId;
}

/// Services available to module hooks
pub struct ModuleContext<'a> {
    /// Entity world
    pub world: &'a mut World,
    /// Resource registry
    pub resources: &'a Arc<ResourceManager>,
    /// Background loader
    pub loader: &'a Arc<AsyncResourceLoader>,
    /// Layer name registry
    pub layers: &'a LayerRegistry,
    /// Render queue for the current frame
    pub queue: &'a mut RenderQueue,
    /// Frame globals for the current frame
    pub globals: &'a mut FrameGlobals,
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Seconds since the host was created
    pub total_time: f32,
}

/// A plugin hooked into the frame loop
///
/// All hooks default to no-ops.
pub trait Module: Send {
    /// Module name used in logs
    fn name(&self) -> &str;

    /// Runs before scenes and systems update
    fn pre_frame(&mut self, _ctx: &mut ModuleContext) {}

    /// Runs after scenes and systems update
    fn post_frame(&mut self, _ctx: &mut ModuleContext) {}

    /// Runs before the render queue flushes; last chance to submit draws
    fn pre_render(&mut self, _ctx: &mut ModuleContext) {}

    /// Runs after present
    fn post_render(&mut self, _ctx: &mut ModuleContext) {}

    /// Runs once during host shutdown or unregistration
    fn on_shutdown(&mut self, _ctx: &mut ModuleContext) {}
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Hook {
    PreFrame,
    PostFrame,
    PreRender,
    PostRender,
    Shutdown,
}

struct ModuleEntry {
    // None only while the module is out being dispatched
    module: Option<Box<dyn Module>>,
    priority: i32,
    seq: u64,
    enabled: bool,
}

/// Owns the frame loop and everything that participates in it
pub struct ModuleHost {
    config: EngineConfig,
    resources: Arc<ResourceManager>,
    loader: Arc<AsyncResourceLoader>,
    world: World,
    scenes: SceneManager,
    layers: LayerRegistry,
    queue: RenderQueue,
    globals: FrameGlobals,
    modules: SlotMap<ModuleId, ModuleEntry>,
    order: Vec<ModuleId>,
    next_seq: u64,
    total_time: f32,
    frame_count: u64,
    shut_down: bool,
}

impl ModuleHost {
    /// Create a host around existing resource and loader services
    ///
    /// Installs the standard transform, camera, uniform, and render
    /// systems unless the renderer config disables them.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        resources: Arc<ResourceManager>,
        loader: Arc<AsyncResourceLoader>,
    ) -> Self {
        let mut world = World::new();
        if config.renderer.install_default_systems {
            world.register_system(TransformSystem::new());
            world.register_system(CameraSystem::new());
            world.register_system(UniformSystem::new());
            world.register_system(MeshRenderSystem::new());
            world.register_system(ModelRenderSystem::new());
        }
        Self {
            config,
            resources,
            loader,
            world,
            scenes: SceneManager::new(),
            layers: LayerRegistry::new(),
            queue: RenderQueue::new(),
            globals: FrameGlobals::default(),
            modules: SlotMap::with_key(),
            order: Vec::new(),
            next_seq: 0,
            total_time: 0.0,
            frame_count: 0,
            shut_down: false,
        }
    }

    /// Entity world
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Entity world, mutable
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Resource registry
    pub fn resources(&self) -> &Arc<ResourceManager> {
        &self.resources
    }

    /// Background loader
    pub fn loader(&self) -> &Arc<AsyncResourceLoader> {
        &self.loader
    }

    /// Layer name registry
    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    /// Render queue
    pub fn queue_mut(&mut self) -> &mut RenderQueue {
        &mut self.queue
    }

    /// Frames completed so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Whether `shutdown` has run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Register a module; lower priority runs earlier, ties run in
    /// registration order
    pub fn register_module(&mut self, module: Box<dyn Module>, priority: i32) -> ModuleId {
        log::info!("Registering module '{}' at priority {}", module.name(), priority);
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = self.modules.insert(ModuleEntry {
            module: Some(module),
            priority,
            seq,
            enabled: true,
        });
        self.rebuild_order();
        id
    }

    /// Remove a module, firing its shutdown hook
    pub fn unregister_module(&mut self, id: ModuleId) -> Option<Box<dyn Module>> {
        if !self.modules.contains_key(id) {
            return None;
        }
        self.dispatch_to(id, Hook::Shutdown);
        let entry = self.modules.remove(id)?;
        self.rebuild_order();
        entry.module.map(|module| {
            log::info!("Unregistered module '{}'", module.name());
            module
        })
    }

    /// Enable or disable a module's hooks without removing it
    pub fn set_module_enabled(&mut self, id: ModuleId, enabled: bool) {
        if let Some(entry) = self.modules.get_mut(id) {
            entry.enabled = enabled;
        }
    }

    /// Number of registered modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Push a scene onto the stack
    pub fn push_scene(&mut self, scene: Box<dyn Scene>) {
        let mut ctx = SceneContext {
            world: &mut self.world,
            resources: &self.resources,
            loader: &self.loader,
            layers: &self.layers,
        };
        self.scenes.push(scene, &mut ctx);
    }

    /// Pop the top scene off the stack
    pub fn pop_scene(&mut self) -> Option<Box<dyn Scene>> {
        let mut ctx = SceneContext {
            world: &mut self.world,
            resources: &self.resources,
            loader: &self.loader,
            layers: &self.layers,
        };
        self.scenes.pop(&mut ctx)
    }

    /// Name of the current top scene
    pub fn current_scene(&self) -> Option<&str> {
        self.scenes.current()
    }

    /// Run one full frame
    ///
    /// Order: pre-frame hooks, upload drain, scene update, system update,
    /// post-frame hooks, pre-render hooks, clear, queue flush, present,
    /// post-render hooks.
    ///
    /// # Errors
    /// Returns [`RenderError`] when a device upload or program link fails
    /// during the queue flush.
    pub fn frame(
        &mut self,
        device: &mut dyn RenderDevice,
        delta_time: f32,
    ) -> Result<QueueStats, RenderError> {
        if self.shut_down {
            log::warn!("frame() called after shutdown; ignoring");
            return Ok(QueueStats::default());
        }
        self.total_time += delta_time;
        let total_time = self.total_time;

        self.dispatch_hook(Hook::PreFrame, delta_time);

        self.loader
            .process_completed_tasks(device, self.config.loader.budget());

        {
            let mut ctx = SceneContext {
                world: &mut self.world,
                resources: &self.resources,
                loader: &self.loader,
                layers: &self.layers,
            };
            self.scenes.update(&mut ctx, delta_time);
        }

        {
            let mut ctx = FrameContext {
                delta_time,
                total_time,
                resources: &self.resources,
                queue: &mut self.queue,
                layers: &self.layers,
                globals: &mut self.globals,
            };
            self.world.update(&mut ctx);
        }

        self.dispatch_hook(Hook::PostFrame, delta_time);
        self.dispatch_hook(Hook::PreRender, delta_time);

        device.begin_frame();
        device.clear(self.config.renderer.clear_color, true, true);
        let stats = self.queue.flush(device, &self.resources, &self.globals)?;
        device.end_frame();
        device.present();

        self.dispatch_hook(Hook::PostRender, delta_time);
        self.frame_count += 1;
        Ok(stats)
    }

    /// Shut down the host: module shutdown hooks, scene teardown, loader
    /// drain. Safe to call more than once.
    pub fn shutdown(&mut self, device: &mut dyn RenderDevice) {
        if self.shut_down {
            return;
        }
        log::info!("Shutting down module host after {} frames", self.frame_count);
        self.dispatch_hook(Hook::Shutdown, 0.0);
        while self.pop_scene().is_some() {}
        self.loader.shutdown(device);
        self.shut_down = true;
    }

    fn rebuild_order(&mut self) {
        self.order = self.modules.keys().collect();
        self.order.sort_by_key(|&id| {
            let entry = &self.modules[id];
            (entry.priority, entry.seq)
        });
    }

    fn dispatch_hook(&mut self, hook: Hook, delta_time: f32) {
        let order = self.order.clone();
        for id in order {
            if hook != Hook::Shutdown && !self.modules.get(id).map_or(false, |e| e.enabled) {
                continue;
            }
            self.dispatch_to_inner(id, hook, delta_time);
        }
    }

    fn dispatch_to(&mut self, id: ModuleId, hook: Hook) {
        self.dispatch_to_inner(id, hook, 0.0);
    }

    fn dispatch_to_inner(&mut self, id: ModuleId, hook: Hook, delta_time: f32) {
        let Some(mut module) = self.modules.get_mut(id).and_then(|e| e.module.take()) else {
            return;
        };
        {
            let mut ctx = ModuleContext {
                world: &mut self.world,
                resources: &self.resources,
                loader: &self.loader,
                layers: &self.layers,
                queue: &mut self.queue,
                globals: &mut self.globals,
                delta_time,
                total_time: self.total_time,
            };
            match hook {
                Hook::PreFrame => module.pre_frame(&mut ctx),
                Hook::PostFrame => module.post_frame(&mut ctx),
                Hook::PreRender => module.pre_render(&mut ctx),
                Hook::PostRender => module.post_render(&mut ctx),
                Hook::Shutdown => module.on_shutdown(&mut ctx),
            }
        }
        if let Some(entry) = self.modules.get_mut(id) {
            entry.module = Some(module);
        }
    }
}
