//! Camera component

use crate::foundation::math::{utils, Mat4, Mat4Ext};

/// Projection parameters of a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective frustum
    Perspective {
        /// Vertical field of view in degrees
        fov_y_deg: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },
    /// Orthographic volume
    Orthographic {
        /// Vertical extent of the view volume
        height: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },
}

/// Camera parameters plus cached view/projection matrices
///
/// The camera system recomputes the caches each frame from the entity's
/// transform; the uniform system copies the active camera into the frame
/// globals.
#[derive(Debug, Clone)]
pub struct CameraComponent {
    /// Projection parameters
    pub projection: Projection,
    /// Width over height of the target surface
    pub aspect: f32,
    /// Whether this camera feeds the frame globals
    pub active: bool,
    view: Mat4,
    proj: Mat4,
}

impl CameraComponent {
    /// Perspective camera, active by default
    #[must_use]
    pub fn perspective(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective { fov_y_deg, near, far },
            aspect,
            active: true,
            view: Mat4::identity(),
            proj: Mat4::identity(),
        }
    }

    /// Orthographic camera, active by default
    #[must_use]
    pub fn orthographic(height: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic { height, near, far },
            aspect,
            active: true,
            view: Mat4::identity(),
            proj: Mat4::identity(),
        }
    }

    /// Cached view matrix from the last camera system pass
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Cached projection matrix from the last camera system pass
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.proj
    }

    /// Projection matrix for the current parameters
    #[must_use]
    pub fn compute_projection(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y_deg, near, far } => {
                Mat4::perspective(utils::deg_to_rad(fov_y_deg), self.aspect, near, far)
            }
            Projection::Orthographic { height, near, far } => {
                let half_h = height * 0.5;
                let half_w = half_h * self.aspect;
                Mat4::orthographic(-half_w, half_w, -half_h, half_h, near, far)
            }
        }
    }

    /// Install freshly computed matrices. Called by the camera system.
    pub fn set_matrices(&mut self, view: Mat4, proj: Mat4) {
        self.view = view;
        self.proj = proj;
    }
}
