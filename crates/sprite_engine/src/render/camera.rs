//! Camera inputs passed through to shaders

use crate::foundation::math::{Mat3, Mat3Ext, Vec2};

/// Per-frame uniform handed to every shader's `start_frame`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniform {
    /// World to clip-space transform
    pub view_projection: Mat3,
    /// Index of the frame being submitted
    pub frame: u64,
}

/// Source of the view-projection transform
pub trait Camera {
    /// Current world to clip-space transform
    fn view_projection(&self) -> Mat3;
}

/// Camera with a caller-provided matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedCamera(pub Mat3);

impl Default for FixedCamera {
    fn default() -> Self {
        Self(Mat3::identity())
    }
}

impl Camera for FixedCamera {
    fn view_projection(&self) -> Mat3 {
        self.0
    }
}

/// Axis-aligned orthographic camera mapping its view rectangle to [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoCamera {
    /// World-space center of the view
    pub center: Vec2,
    /// Visible world width
    pub width: f32,
    /// Visible world height
    pub height: f32,
}

impl OrthoCamera {
    /// Create a camera centered at the origin
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            center: Vec2::zeros(),
            width,
            height,
        }
    }
}

impl Camera for OrthoCamera {
    fn view_projection(&self) -> Mat3 {
        Mat3::scaling_2d(Vec2::new(2.0 / self.width, 2.0 / self.height))
            * Mat3::translation_2d(-self.center)
    }
}
