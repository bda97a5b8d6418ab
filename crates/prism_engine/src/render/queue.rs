//! Render queue
//!
//! Systems submit [`Renderable`]s during the frame; the queue sorts them by
//! layer, priority and submission order and replays them against a
//! [`RenderDevice`] in a single flush. GPU uploads happen lazily during the
//! flush, so resources registered on the main thread hit the device the first
//! time something draws with them.

use std::collections::HashSet;

use crate::assets::{MaterialHandle, MeshHandle, ResourceManager};
use crate::foundation::geometry::Aabb;
use crate::foundation::math::Mat4;
use crate::foundation::time::Stopwatch;
use crate::render::device::{DrawMode, RenderDevice};
use crate::render::layers::{LayerId, LayerMask};
use crate::render::material::MaterialParam;
use crate::render::uniforms::{FrameGlobals, UniformValue};
use crate::render::RenderError;

/// What kind of geometry a renderable carries
///
/// All kinds flow through the same mesh path; the kind is a hint for
/// debugging and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderableKind {
    /// Arbitrary 3D mesh
    Mesh,
    /// Screen or world space quad from a sprite atlas
    Sprite,
    /// Glyph quads from a bitmap font
    Text,
}

/// One draw request submitted for the current frame
#[derive(Clone)]
pub struct Renderable {
    /// Geometry kind
    pub kind: RenderableKind,
    /// Mesh to draw
    pub mesh: MeshHandle,
    /// Material to draw it with
    pub material: MaterialHandle,
    /// Model matrix
    pub transform: Mat4,
    /// Layer the draw belongs to
    pub layer: LayerId,
    /// Ordering within the layer, lower draws first
    pub priority: i32,
    /// World space bounds of the transformed geometry
    pub bounds: Aabb,
}

struct QueueEntry {
    renderable: Renderable,
    seq: u32,
}

/// Counters gathered by one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Renderables submitted since the last flush
    pub submitted: usize,
    /// Draw calls issued to the device
    pub draw_calls: usize,
    /// Renderables dropped by the active layer mask
    pub filtered: usize,
    /// Renderables skipped because a resource was missing or failed upload
    pub skipped: usize,
    /// Wall time the flush took, in microseconds
    pub flush_micros: u64,
}

/// Sorted frame queue of draw requests
pub struct RenderQueue {
    entries: Vec<QueueEntry>,
    next_seq: u32,
    active_layers: LayerMask,
    warned_missing: HashSet<String>,
    last_stats: QueueStats,
}

impl RenderQueue {
    /// Create an empty queue that draws every layer
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
            active_layers: LayerMask::ALL,
            warned_missing: HashSet::new(),
            last_stats: QueueStats::default(),
        }
    }

    /// Submit a renderable for the current frame
    ///
    /// Submission order is preserved for renderables with the same layer and
    /// priority.
    pub fn submit(&mut self, renderable: Renderable) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.entries.push(QueueEntry { renderable, seq });
    }

    /// Number of renderables waiting in the queue
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds no renderables
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all pending renderables without drawing them
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }

    /// Restrict which layers the next flush draws
    pub fn set_active_layers(&mut self, mask: LayerMask) {
        self.active_layers = mask;
    }

    /// Layer mask applied by the next flush
    #[must_use]
    pub const fn active_layers(&self) -> LayerMask {
        self.active_layers
    }

    /// Counters from the most recent flush
    #[must_use]
    pub const fn last_stats(&self) -> QueueStats {
        self.last_stats
    }

    /// Sort, filter and draw every pending renderable, then empty the queue
    ///
    /// Renderables sort by `(layer, priority, submission order)`. Entries
    /// whose layer is not in the active mask are counted and dropped.
    /// Renderables whose shader or textures cannot be resolved from
    /// `resources` are skipped with a one-shot warning per resource name.
    ///
    /// # Errors
    /// Returns [`RenderError`] when a device upload or program link fails.
    pub fn flush(
        &mut self,
        device: &mut dyn RenderDevice,
        resources: &ResourceManager,
        globals: &FrameGlobals,
    ) -> Result<QueueStats, RenderError> {
        let mut watch = Stopwatch::new();
        watch.start();

        let mut stats = QueueStats {
            submitted: self.entries.len(),
            ..QueueStats::default()
        };

        self.entries.sort_by(|a, b| {
            (a.renderable.layer, a.renderable.priority, a.seq).cmp(&(
                b.renderable.layer,
                b.renderable.priority,
                b.seq,
            ))
        });

        let entries = std::mem::take(&mut self.entries);
        for entry in &entries {
            if !self.active_layers.contains_layer(entry.renderable.layer) {
                stats.filtered += 1;
                continue;
            }
            if self.draw_entry(device, resources, globals, &entry.renderable)? {
                stats.draw_calls += 1;
            } else {
                stats.skipped += 1;
            }
        }

        self.next_seq = 0;
        stats.flush_micros = watch.elapsed_micros();
        self.last_stats = stats;
        log::trace!(
            "Queue flush: {} submitted, {} drawn, {} filtered, {} skipped in {}us",
            stats.submitted,
            stats.draw_calls,
            stats.filtered,
            stats.skipped,
            stats.flush_micros
        );
        Ok(stats)
    }

    /// Draw one renderable, returning false when it was skipped
    fn draw_entry(
        &mut self,
        device: &mut dyn RenderDevice,
        resources: &ResourceManager,
        globals: &FrameGlobals,
        renderable: &Renderable,
    ) -> Result<bool, RenderError> {
        let shader_name = renderable.material.read().unwrap().shader().to_string();
        let Some(shader_handle) = resources.get_shader(&shader_name) else {
            self.warn_missing("shader", &shader_name);
            return Ok(false);
        };

        {
            let mut mesh = renderable.mesh.write().unwrap();
            if mesh.vertex_count() == 0 {
                return Ok(false);
            }
            mesh.upload(device)?;
        }

        let mut shader = shader_handle.write().unwrap();
        shader.upload(device)?;
        let program = shader.program();
        device.bind_program(program);

        let material = renderable.material.read().unwrap();
        let mut texture_binds: Vec<(String, u32)> = Vec::new();
        for (param, texture_name) in material.texture_refs() {
            let Some(texture_handle) = resources.get_texture(texture_name) else {
                self.warn_missing("texture", texture_name);
                return Ok(false);
            };
            let mut texture = texture_handle.write().unwrap();
            texture.upload(device)?;
            texture_binds.push((param.to_string(), texture.gpu_id()));
        }

        let Some(binder) = shader.binder_mut() else {
            return Ok(false);
        };

        for (name, value) in globals.uniform_table() {
            binder.set(device, name, &value);
        }
        binder.set_mat4(device, "u_model", renderable.transform);

        for (name, param) in material.params() {
            match param {
                MaterialParam::Float(v) => binder.set_float(device, name, *v),
                MaterialParam::Vec2(v) => binder.set_vec2(device, name, *v),
                MaterialParam::Vec3(v) => binder.set_vec3(device, name, *v),
                MaterialParam::Vec4(v) => binder.set_vec4(device, name, *v),
                MaterialParam::Color(v) => binder.set_color(device, name, *v),
                MaterialParam::Mat4(v) => binder.set_mat4(device, name, *v),
                MaterialParam::Texture(_) => {}
            }
        }

        for (param, gpu_id) in &texture_binds {
            let unit = binder.allocate_texture_unit(param);
            device.bind_texture(unit, *gpu_id);
            binder.set(device, param, &UniformValue::Int(unit as i32));
        }
        drop(material);
        renderable.material.write().unwrap().mark_clean();

        let index_count = renderable.mesh.read().unwrap().index_count() as u32;
        device.draw_indexed(DrawMode::Triangles, index_count);
        Ok(true)
    }

    fn warn_missing(&mut self, kind: &str, name: &str) {
        let key = format!("{kind}:{name}");
        if self.warned_missing.insert(key) {
            log::warn!("Render queue skipping draw, {} '{}' is not registered", kind, name);
        }
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ResourceManager;
    use crate::render::device::HeadlessDevice;
    use crate::render::material::Material;
    use crate::render::mesh::{Mesh, Vertex};
    use crate::render::shader::Shader;

    fn triangle_mesh() -> Mesh {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        Mesh::new(vertices, vec![0, 1, 2]).unwrap()
    }

    fn setup() -> (ResourceManager, RenderQueue, HeadlessDevice) {
        let resources = ResourceManager::new();
        resources.register_shader(
            "basic",
            Shader::new("void main() {}", "void main() {}"),
        );
        (resources, RenderQueue::new(), HeadlessDevice::default())
    }

    fn renderable(resources: &ResourceManager, name: &str, layer: LayerId, priority: i32) -> Renderable {
        let mesh = resources.register_mesh(name, triangle_mesh());
        let material =
            resources.register_material(&format!("{name}_mat"), Material::new("basic"));
        Renderable {
            kind: RenderableKind::Mesh,
            mesh,
            material,
            transform: Mat4::identity(),
            layer,
            priority,
            bounds: Aabb::empty(),
        }
    }

    #[test]
    fn flush_draws_and_empties_queue() {
        let (resources, mut queue, mut device) = setup();
        queue.submit(renderable(&resources, "a", LayerId(0), 0));
        queue.submit(renderable(&resources, "b", LayerId(0), 0));

        let stats = queue
            .flush(&mut device, &resources, &FrameGlobals::default())
            .unwrap();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.filtered, 0);
        assert!(queue.is_empty());
        assert_eq!(device.draws.len(), 2);
    }

    #[test]
    fn layer_mask_filters_draws() {
        let (resources, mut queue, mut device) = setup();
        queue.submit(renderable(&resources, "world", LayerId(0), 0));
        queue.submit(renderable(&resources, "ui", LayerId(3), 0));
        queue.set_active_layers(LayerMask::from_layers(&[LayerId(3)]));

        let stats = queue
            .flush(&mut device, &resources, &FrameGlobals::default())
            .unwrap();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.filtered, 1);
    }

    #[test]
    fn missing_shader_skips_without_error() {
        let (resources, mut queue, mut device) = setup();
        let mut bad = renderable(&resources, "c", LayerId(0), 0);
        bad.material.write().unwrap().set_shader("nonexistent");
        queue.submit(bad);

        let stats = queue
            .flush(&mut device, &resources, &FrameGlobals::default())
            .unwrap();
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.skipped, 1);
    }

    fn fan_mesh(triangles: u32) -> Mesh {
        let mut vertices = vec![Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0])];
        for i in 0..=triangles {
            let angle = i as f32;
            vertices.push(Vertex::new(
                [angle.cos(), angle.sin(), 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0],
            ));
        }
        let mut indices = Vec::new();
        for i in 0..triangles {
            indices.extend_from_slice(&[0, i + 1, i + 2]);
        }
        Mesh::new(vertices, indices).unwrap()
    }

    fn sized_renderable(
        resources: &ResourceManager,
        name: &str,
        triangles: u32,
        layer: LayerId,
        priority: i32,
    ) -> Renderable {
        let mesh = resources.register_mesh(name, fan_mesh(triangles));
        let material =
            resources.register_material(&format!("{name}_mat"), Material::new("basic"));
        Renderable {
            kind: RenderableKind::Mesh,
            mesh,
            material,
            transform: Mat4::identity(),
            layer,
            priority,
            bounds: Aabb::empty(),
        }
    }

    #[test]
    fn sort_order_is_layer_then_priority_then_submission() {
        let (resources, mut queue, mut device) = setup();
        // Distinct index counts make the replay order observable.
        queue.submit(sized_renderable(&resources, "late_layer", 3, LayerId(1), -10));
        queue.submit(sized_renderable(&resources, "high_priority", 2, LayerId(0), 5));
        queue.submit(sized_renderable(&resources, "low_priority", 1, LayerId(0), -5));

        queue
            .flush(&mut device, &resources, &FrameGlobals::default())
            .unwrap();
        let replay: Vec<u32> = device.draws.iter().map(|d| d.index_count).collect();
        // Layer 0 before layer 1, ascending priority within a layer.
        assert_eq!(replay, vec![3, 6, 9]);
    }

    #[test]
    fn equal_sort_keys_replay_in_submission_order() {
        let (resources, mut queue, mut device) = setup();
        queue.submit(sized_renderable(&resources, "first", 2, LayerId(0), 0));
        queue.submit(sized_renderable(&resources, "second", 1, LayerId(0), 0));

        queue
            .flush(&mut device, &resources, &FrameGlobals::default())
            .unwrap();
        let replay: Vec<u32> = device.draws.iter().map(|d| d.index_count).collect();
        assert_eq!(replay, vec![6, 3]);
    }

    #[test]
    fn lazy_upload_happens_during_flush() {
        let (resources, mut queue, mut device) = setup();
        let item = renderable(&resources, "lazy", LayerId(0), 0);
        assert!(!item.mesh.read().unwrap().is_uploaded());
        queue.submit(item.clone());
        queue
            .flush(&mut device, &resources, &FrameGlobals::default())
            .unwrap();
        assert!(item.mesh.read().unwrap().is_uploaded());
        let shader = resources.get_shader("basic").unwrap();
        assert!(shader.read().unwrap().is_uploaded());
    }
}
