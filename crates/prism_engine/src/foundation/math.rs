//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics built on top of nalgebra,
//! plus the quaternion and matrix helpers the rest of the engine relies on.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

use nalgebra::{Orthographic3, Perspective3, Point3 as NPoint3, Rotation3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = NPoint3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;

    /// Tolerance below which a vector is considered already normalized
    pub const NORMALIZE_EPSILON: f32 = 1e-6;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Extension trait for [`Vec3`] with normalization helpers used in hot loops
pub trait Vec3Ext {
    /// Normalize, skipping the square root when the vector is already
    /// unit-length to within `1e-6`. A near-zero vector is returned unchanged
    /// rather than producing NaNs.
    fn safe_normalize(&self) -> Vec3;
}

impl Vec3Ext for Vec3 {
    fn safe_normalize(&self) -> Vec3 {
        let len_sq = self.norm_squared();
        if (len_sq - 1.0).abs() < constants::NORMALIZE_EPSILON {
            return *self;
        }
        if len_sq < constants::NORMALIZE_EPSILON * constants::NORMALIZE_EPSILON {
            return *self;
        }
        self / len_sq.sqrt()
    }
}

/// Extension trait for [`Quat`] with rotation construction helpers
pub trait QuatExt {
    /// Build from Euler angles in radians (roll about X, pitch about Y, yaw about Z)
    fn from_euler(roll: f32, pitch: f32, yaw: f32) -> Quat;

    /// Build from Euler angles in degrees
    fn from_euler_deg(roll: f32, pitch: f32, yaw: f32) -> Quat;

    /// Extract Euler angles in radians as (roll, pitch, yaw)
    fn to_euler(&self) -> (f32, f32, f32);

    /// Shortest-arc spherical interpolation between two rotations
    fn slerp_shortest(&self, other: &Quat, t: f32) -> Quat;

    /// Rotation that maps local -Z forward onto `direction`, preferring +Y as
    /// up. Falls back to the +Z axis as the up reference when `direction` is
    /// nearly parallel to +Y, and to identity when `direction` is degenerate.
    fn look_rotation(direction: Vec3, up: Vec3) -> Quat;
}

impl QuatExt for Quat {
    fn from_euler(roll: f32, pitch: f32, yaw: f32) -> Quat {
        Quat::from_euler_angles(roll, pitch, yaw)
    }

    fn from_euler_deg(roll: f32, pitch: f32, yaw: f32) -> Quat {
        Quat::from_euler_angles(
            utils::deg_to_rad(roll),
            utils::deg_to_rad(pitch),
            utils::deg_to_rad(yaw),
        )
    }

    fn to_euler(&self) -> (f32, f32, f32) {
        self.euler_angles()
    }

    fn slerp_shortest(&self, other: &Quat, t: f32) -> Quat {
        // Negate the target when the dot product is negative so the
        // interpolation takes the short way around.
        let target = if self.coords.dot(&other.coords) < 0.0 {
            Quat::new_unchecked(-other.into_inner())
        } else {
            *other
        };
        self.try_slerp(&target, t, constants::NORMALIZE_EPSILON)
            .unwrap_or_else(|| self.nlerp(&target, t))
    }

    fn look_rotation(direction: Vec3, up: Vec3) -> Quat {
        let len_sq = direction.norm_squared();
        if len_sq < constants::NORMALIZE_EPSILON {
            return Quat::identity();
        }
        let forward = direction / len_sq.sqrt();

        // Forward nearly parallel to the up reference: swap in a fallback axis.
        let up_ref = if forward.dot(&up).abs() > 0.999 {
            Vec3::z()
        } else {
            up
        };

        // Right-handed basis with -Z mapped to forward.
        let z_axis = -forward;
        let x_axis = up_ref.cross(&z_axis).normalize();
        let y_axis = z_axis.cross(&x_axis);

        let rotation = Mat3::from_columns(&[x_axis, y_axis, z_axis]);
        Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation))
    }
}

/// Extension trait for [`Mat4`] with graphics-oriented constructors
pub trait Mat4Ext {
    /// Compose a translation * rotation * scale matrix
    fn trs(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4;

    /// Decompose back into (position, rotation, scale), assuming uniform
    /// handedness (no negative scale / mirroring)
    fn decompose(&self) -> (Vec3, Quat, Vec3);

    /// Right-handed perspective projection
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed orthographic projection
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Extract the translation column
    fn position(&self) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn trs(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
        Mat4::new_translation(&position)
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&scale)
    }

    fn decompose(&self) -> (Vec3, Quat, Vec3) {
        let position = Vec3::new(self.m14, self.m24, self.m34);

        let scale_x = Vec3::new(self.m11, self.m21, self.m31).magnitude();
        let scale_y = Vec3::new(self.m12, self.m22, self.m32).magnitude();
        let scale_z = Vec3::new(self.m13, self.m23, self.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        // Strip the scale off each column before extracting the rotation.
        let rotation_matrix = Matrix3::new(
            self.m11 / scale_x,
            self.m12 / scale_y,
            self.m13 / scale_z,
            self.m21 / scale_x,
            self.m22 / scale_y,
            self.m23 / scale_z,
            self.m31 / scale_x,
            self.m32 / scale_y,
            self.m33 / scale_z,
        );
        let rotation = Quat::from_matrix(&rotation_matrix);

        (position, rotation, scale)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Perspective3::new(aspect, fov_y, near, far).into_inner()
    }

    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Orthographic3::new(left, right, bottom, top, near, far).into_inner()
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn position(&self) -> Vec3 {
        Vec3::new(self.m14, self.m24, self.m34)
    }
}

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::trs(self.position, self.rotation, self.scale)
    }

    /// Create a transform from a transformation matrix
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (position, rotation, scale) = matrix.decompose();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }

    /// Apply this transform to a vector (ignores translation)
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.to_matrix().transform_vector(&vector)
    }

    /// Combine this transform with another (self then other, child-style)
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * self.scale.component_mul(&other.position),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn trs_decompose_round_trip() {
        let position = Vec3::new(1.5, -2.0, 3.25);
        let rotation = Quat::from_euler(0.3, -0.7, 1.1);
        let scale = Vec3::new(2.0, 0.5, 1.5);

        let matrix = Mat4::trs(position, rotation, scale);
        let (p, q, s) = matrix.decompose();

        assert_relative_eq!(p, position, epsilon = 1e-5);
        assert_relative_eq!(s, scale, epsilon = 1e-5);
        assert!(rotation.angle_to(&q) < 1e-5);
    }

    #[test]
    fn safe_normalize_skips_unit_vectors() {
        let v = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(v.safe_normalize(), v);

        let w = Vec3::new(3.0, 0.0, 4.0);
        assert_relative_eq!(w.safe_normalize().magnitude(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn safe_normalize_leaves_zero_vector_alone() {
        let z = Vec3::zeros();
        assert_eq!(z.safe_normalize(), z);
    }

    #[test]
    fn euler_round_trip() {
        let q = Quat::from_euler(0.2, 0.4, -0.6);
        let (roll, pitch, yaw) = q.to_euler();
        let q2 = Quat::from_euler(roll, pitch, yaw);
        assert!(q.angle_to(&q2) < 1e-5);
    }

    #[test]
    fn look_rotation_maps_forward() {
        let direction = Vec3::new(1.0, 0.0, 1.0);
        let q = Quat::look_rotation(direction, Vec3::y());
        let forward = q * -Vec3::z();
        assert_relative_eq!(forward, direction.normalize(), epsilon = 1e-5);
    }

    #[test]
    fn look_rotation_degenerate_direction_is_identity() {
        let q = Quat::look_rotation(Vec3::zeros(), Vec3::y());
        assert!(q.angle_to(&Quat::identity()) < 1e-6);
    }

    #[test]
    fn look_rotation_up_parallel_uses_fallback() {
        let q = Quat::look_rotation(Vec3::y(), Vec3::y());
        let forward = q * -Vec3::z();
        assert_relative_eq!(forward, Vec3::y(), epsilon = 1e-4);
    }

    #[test]
    fn slerp_shortest_endpoints() {
        let a = Quat::from_euler(0.0, 0.0, 0.0);
        let b = Quat::from_euler(0.0, 0.0, 1.0);
        assert!(a.slerp_shortest(&b, 0.0).angle_to(&a) < 1e-5);
        assert!(a.slerp_shortest(&b, 1.0).angle_to(&b) < 1e-5);

        let half = a.slerp_shortest(&b, 0.5);
        assert_relative_eq!(half.angle_to(&a), half.angle_to(&b), epsilon = 1e-5);
    }

    #[test]
    fn perspective_is_invertible() {
        let proj = Mat4::perspective(utils::deg_to_rad(60.0), 16.0 / 9.0, 0.1, 100.0);
        assert!(proj.try_inverse().is_some());
    }

    #[test]
    fn transform_combine_matches_matrix_product() {
        let parent = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_euler(0.0, 0.5, 0.0),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let child = Transform::from_position(Vec3::new(0.0, 1.0, 0.0));

        let combined = parent.combine(&child).to_matrix();
        let product = parent.to_matrix() * child.to_matrix();
        assert_relative_eq!(combined, product, epsilon = 1e-4);
    }
}
