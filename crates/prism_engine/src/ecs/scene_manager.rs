//! Scene stack

use crate::ecs::scene::{Scene, SceneContext};

/// Stack of scenes with pause/resume semantics
///
/// Push pauses the current top and enters the new scene. Pop exits the top
/// and resumes the one underneath. Update only reaches the top scene.
#[derive(Default)]
pub struct SceneManager {
    stack: Vec<Box<dyn Scene>>,
}

impl SceneManager {
    /// Create an empty stack
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a scene, pausing the current top
    pub fn push(&mut self, mut scene: Box<dyn Scene>, ctx: &mut SceneContext) {
        if let Some(top) = self.stack.last_mut() {
            log::debug!("Pausing scene '{}'", top.name());
            top.on_pause(ctx);
        }
        log::info!("Entering scene '{}'", scene.name());
        scene.on_enter(ctx);
        self.stack.push(scene);
    }

    /// Pop the top scene, resuming the one underneath
    pub fn pop(&mut self, ctx: &mut SceneContext) -> Option<Box<dyn Scene>> {
        let mut scene = self.stack.pop()?;
        log::info!("Exiting scene '{}'", scene.name());
        scene.on_exit(ctx);
        if let Some(top) = self.stack.last_mut() {
            log::debug!("Resuming scene '{}'", top.name());
            top.on_resume(ctx);
        }
        Some(scene)
    }

    /// Update the top scene, if any
    pub fn update(&mut self, ctx: &mut SceneContext, delta_time: f32) {
        if let Some(top) = self.stack.last_mut() {
            top.update(ctx, delta_time);
        }
    }

    /// Name of the current top scene
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(|scene| scene.name())
    }

    /// Number of scenes on the stack
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether the stack holds no scenes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AsyncResourceLoader, ResourceManager};
    use crate::ecs::world::World;
    use crate::render::LayerRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct EventLog(Arc<Mutex<Vec<String>>>);

    impl EventLog {
        fn record(&self, event: &str) {
            self.0.lock().unwrap().push(event.to_string());
        }

        fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct TracingScene {
        label: String,
        log: EventLog,
    }

    impl Scene for TracingScene {
        fn name(&self) -> &str {
            &self.label
        }

        fn on_enter(&mut self, _ctx: &mut SceneContext) {
            self.log.record(&format!("{}:enter", self.label));
        }

        fn on_exit(&mut self, _ctx: &mut SceneContext) {
            self.log.record(&format!("{}:exit", self.label));
        }

        fn on_pause(&mut self, _ctx: &mut SceneContext) {
            self.log.record(&format!("{}:pause", self.label));
        }

        fn on_resume(&mut self, _ctx: &mut SceneContext) {
            self.log.record(&format!("{}:resume", self.label));
        }

        fn update(&mut self, _ctx: &mut SceneContext, _delta_time: f32) {
            self.log.record(&format!("{}:update", self.label));
        }
    }

    fn with_context(f: impl FnOnce(&mut SceneContext)) {
        let resources = Arc::new(ResourceManager::new());
        let loader = Arc::new(AsyncResourceLoader::with_default_workers(Arc::clone(
            &resources,
        )));
        let layers = LayerRegistry::new();
        let mut world = World::new();
        let mut ctx = SceneContext {
            world: &mut world,
            resources: &resources,
            loader: &loader,
            layers: &layers,
        };
        f(&mut ctx);
    }

    #[test]
    fn push_pop_drives_lifecycle_in_order() {
        let log = EventLog::default();
        with_context(|ctx| {
            let mut scenes = SceneManager::new();
            scenes.push(
                Box::new(TracingScene { label: "menu".into(), log: log.clone() }),
                ctx,
            );
            scenes.push(
                Box::new(TracingScene { label: "game".into(), log: log.clone() }),
                ctx,
            );
            assert_eq!(scenes.current(), Some("game"));
            scenes.update(ctx, 0.016);
            scenes.pop(ctx);
            assert_eq!(scenes.current(), Some("menu"));
        });

        assert_eq!(
            log.events(),
            vec![
                "menu:enter",
                "menu:pause",
                "game:enter",
                "game:update",
                "game:exit",
                "menu:resume",
            ]
        );
    }

    #[test]
    fn update_only_reaches_the_top_scene() {
        static BOTTOM_UPDATES: AtomicUsize = AtomicUsize::new(0);

        struct Bottom;
        impl Scene for Bottom {
            fn name(&self) -> &str {
                "bottom"
            }
            fn update(&mut self, _ctx: &mut SceneContext, _delta_time: f32) {
                BOTTOM_UPDATES.fetch_add(1, Ordering::SeqCst);
            }
        }

        let log = EventLog::default();
        with_context(|ctx| {
            let mut scenes = SceneManager::new();
            scenes.push(Box::new(Bottom), ctx);
            scenes.push(
                Box::new(TracingScene { label: "top".into(), log: log.clone() }),
                ctx,
            );
            scenes.update(ctx, 0.016);
        });

        assert_eq!(BOTTOM_UPDATES.load(Ordering::SeqCst), 0);
        assert_eq!(log.events(), vec!["top:enter", "top:update"]);
    }

    #[test]
    fn pop_on_empty_stack_is_a_no_op() {
        with_context(|ctx| {
            let mut scenes = SceneManager::new();
            assert!(scenes.pop(ctx).is_none());
            assert!(scenes.is_empty());
        });
    }
}
