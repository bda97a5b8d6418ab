//! Uniform binding table
//!
//! Per-program cache of named uniform locations and texture-unit
//! assignments. Locations are queried from the device on first use and
//! memoized; unknown names turn setters into no-ops with a one-shot warning
//! per (program, name) pair so steady-state stays silent.

use super::device::RenderDevice;
use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use std::collections::{HashMap, HashSet};

/// A typed uniform value
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Signed integer (also used for sampler units)
    Int(i32),
    /// Scalar float
    Float(f32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// RGBA color
    Color(Vec4),
    /// 3x3 matrix
    Mat3(Mat3),
    /// 4x4 matrix
    Mat4(Mat4),
}

/// Per-frame global uniforms prepared by the uniform system and pushed
/// before material parameters on every draw
#[derive(Debug, Clone)]
pub struct FrameGlobals {
    /// View matrix of the active camera
    pub view: Mat4,
    /// Projection matrix of the active camera
    pub projection: Mat4,
    /// World-space camera position
    pub camera_position: Vec3,
    /// Seconds since engine start
    pub time: f32,
}

impl Default for FrameGlobals {
    fn default() -> Self {
        Self {
            view: Mat4::identity(),
            projection: Mat4::identity(),
            camera_position: Vec3::zeros(),
            time: 0.0,
        }
    }
}

impl FrameGlobals {
    /// Standard uniform names and values for the current frame
    pub fn uniform_table(&self) -> [(&'static str, UniformValue); 5] {
        [
            ("u_view", UniformValue::Mat4(self.view)),
            ("u_projection", UniformValue::Mat4(self.projection)),
            (
                "u_view_projection",
                UniformValue::Mat4(self.projection * self.view),
            ),
            (
                "u_camera_position",
                UniformValue::Vec3(self.camera_position),
            ),
            ("u_time", UniformValue::Float(self.time)),
        ]
    }
}

/// Cached uniform locations and texture units for one linked program
#[derive(Debug)]
pub struct UniformBinder {
    program: u32,
    locations: HashMap<String, Option<i32>>,
    texture_units: HashMap<String, u32>,
    warned: HashSet<String>,
}

impl UniformBinder {
    /// Create a binder for a linked program
    pub fn new(program: u32) -> Self {
        Self {
            program,
            locations: HashMap::new(),
            texture_units: HashMap::new(),
            warned: HashSet::new(),
        }
    }

    /// The program this binder caches for
    pub fn program(&self) -> u32 {
        self.program
    }

    /// Resolve a uniform location, memoizing the answer. Logs one warning
    /// per unknown name, then stays silent for that name.
    fn location(&mut self, device: &mut dyn RenderDevice, name: &str) -> Option<i32> {
        if let Some(cached) = self.locations.get(name) {
            return *cached;
        }
        let location = device.uniform_location(self.program, name);
        self.locations.insert(name.to_string(), location);
        if location.is_none() && self.warned.insert(name.to_string()) {
            log::warn!(
                "uniform '{}' not found in program {} (suppressing further warnings)",
                name,
                self.program
            );
        }
        location
    }

    /// Whether the program contains the named uniform (no warning on miss)
    pub fn has_uniform(&mut self, device: &mut dyn RenderDevice, name: &str) -> bool {
        if let Some(cached) = self.locations.get(name) {
            return cached.is_some();
        }
        let location = device.uniform_location(self.program, name);
        self.locations.insert(name.to_string(), location);
        location.is_some()
    }

    /// Set a uniform by name; a no-op when the name is unknown
    pub fn set(&mut self, device: &mut dyn RenderDevice, name: &str, value: &UniformValue) {
        if let Some(location) = self.location(device, name) {
            device.set_uniform(self.program, location, value);
        }
    }

    /// Set a scalar float uniform
    pub fn set_float(&mut self, device: &mut dyn RenderDevice, name: &str, value: f32) {
        self.set(device, name, &UniformValue::Float(value));
    }

    /// Set an integer uniform
    pub fn set_int(&mut self, device: &mut dyn RenderDevice, name: &str, value: i32) {
        self.set(device, name, &UniformValue::Int(value));
    }

    /// Set a vec2 uniform
    pub fn set_vec2(&mut self, device: &mut dyn RenderDevice, name: &str, value: Vec2) {
        self.set(device, name, &UniformValue::Vec2(value));
    }

    /// Set a vec3 uniform
    pub fn set_vec3(&mut self, device: &mut dyn RenderDevice, name: &str, value: Vec3) {
        self.set(device, name, &UniformValue::Vec3(value));
    }

    /// Set a vec4 uniform
    pub fn set_vec4(&mut self, device: &mut dyn RenderDevice, name: &str, value: Vec4) {
        self.set(device, name, &UniformValue::Vec4(value));
    }

    /// Set a color uniform
    pub fn set_color(&mut self, device: &mut dyn RenderDevice, name: &str, value: Vec4) {
        self.set(device, name, &UniformValue::Color(value));
    }

    /// Set a mat3 uniform
    pub fn set_mat3(&mut self, device: &mut dyn RenderDevice, name: &str, value: Mat3) {
        self.set(device, name, &UniformValue::Mat3(value));
    }

    /// Set a mat4 uniform
    pub fn set_mat4(&mut self, device: &mut dyn RenderDevice, name: &str, value: Mat4) {
        self.set(device, name, &UniformValue::Mat4(value));
    }

    /// Write `values.len()` consecutive locations starting at the base
    /// location of `name`. The caller owns length correctness; an unknown
    /// base name makes the whole call a no-op.
    pub fn set_array(&mut self, device: &mut dyn RenderDevice, name: &str, values: &[UniformValue]) {
        if let Some(base) = self.location(device, name) {
            for (i, value) in values.iter().enumerate() {
                device.set_uniform(self.program, base + i as i32, value);
            }
        }
    }

    /// Pin a texture uniform to an explicit unit
    pub fn register_texture_uniform(&mut self, name: impl Into<String>, unit: u32) {
        self.texture_units.insert(name.into(), unit);
    }

    /// Unit registered for a texture uniform, if any
    pub fn texture_unit(&self, name: &str) -> Option<u32> {
        self.texture_units.get(name).copied()
    }

    /// Unit for a texture uniform, assigning the next free unit when the
    /// name has none yet
    pub fn allocate_texture_unit(&mut self, name: &str) -> u32 {
        if let Some(unit) = self.texture_units.get(name) {
            return *unit;
        }
        let unit = (0u32..)
            .find(|u| !self.texture_units.values().any(|taken| taken == u))
            .unwrap_or(0);
        self.texture_units.insert(name.to_string(), unit);
        unit
    }

    /// Forget all memoized locations and warnings
    pub fn clear_cache(&mut self) {
        self.locations.clear();
        self.warned.clear();
    }

    /// All uniform names seen so far (known and unknown)
    pub fn uniform_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.locations.keys().cloned().collect();
        names.sort();
        names
    }

    /// Dump the cache contents at debug level
    pub fn log_introspection(&self) {
        log::debug!(
            "program {}: {} cached uniforms, {} texture units",
            self.program,
            self.locations.len(),
            self.texture_units.len()
        );
        for (name, location) in &self.locations {
            match location {
                Some(loc) => log::debug!("  {name} -> location {loc}"),
                None => log::debug!("  {name} -> (absent)"),
            }
        }
        for (name, unit) in &self.texture_units {
            log::debug!("  {name} -> texture unit {unit}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::HeadlessDevice;

    #[test]
    fn locations_cached_after_first_query() {
        let mut device = HeadlessDevice::new();
        let program = device.link_program("v", "f").unwrap();
        let mut binder = UniformBinder::new(program);

        binder.set_float(&mut device, "u_alpha", 0.5);
        binder.set_float(&mut device, "u_alpha", 0.7);
        assert_eq!(device.uniform_writes, 2);
        assert!(binder.has_uniform(&mut device, "u_alpha"));
    }

    #[test]
    fn unknown_uniform_is_silent_noop() {
        let mut device = HeadlessDevice::new();
        device.mark_uniform_missing("u_ghost");
        let program = device.link_program("v", "f").unwrap();
        let mut binder = UniformBinder::new(program);

        binder.set_float(&mut device, "u_ghost", 1.0);
        binder.set_float(&mut device, "u_ghost", 2.0);
        assert_eq!(device.uniform_writes, 0);
        assert!(!binder.has_uniform(&mut device, "u_ghost"));
    }

    #[test]
    fn array_setter_writes_consecutive_locations() {
        let mut device = HeadlessDevice::new();
        let program = device.link_program("v", "f").unwrap();
        let mut binder = UniformBinder::new(program);

        let values = vec![
            UniformValue::Float(1.0),
            UniformValue::Float(2.0),
            UniformValue::Float(3.0),
        ];
        binder.set_array(&mut device, "u_weights", &values);
        assert_eq!(device.uniform_writes, 3);
    }

    #[test]
    fn texture_units_allocate_without_collision() {
        let mut binder = UniformBinder::new(1);
        binder.register_texture_uniform("u_albedo", 0);
        let normal = binder.allocate_texture_unit("u_normal");
        assert_eq!(normal, 1);
        assert_eq!(binder.allocate_texture_unit("u_normal"), 1);
        assert_eq!(binder.texture_unit("u_albedo"), Some(0));
    }

    #[test]
    fn clear_cache_requeries() {
        let mut device = HeadlessDevice::new();
        let program = device.link_program("v", "f").unwrap();
        let mut binder = UniformBinder::new(program);

        binder.set_float(&mut device, "u_alpha", 0.5);
        binder.clear_cache();
        assert!(binder.uniform_names().is_empty());
        binder.set_float(&mut device, "u_alpha", 0.5);
        assert_eq!(device.uniform_writes, 2);
    }
}
