//! Math utilities and types
//!
//! Provides the 2D affine math used by the scene graph. Matrices are
//! homogeneous 3x3 (column vectors, translation in the third column).

pub use nalgebra::{Matrix3, Vector2, Vector3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3x3 homogeneous matrix type for 2D affine transforms
pub type Mat3 = Matrix3<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Local transform of a scene node: position, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    /// Translation relative to the parent
    pub position: Vec2,

    /// Rotation in radians (counter-clockwise)
    pub rotation: f32,

    /// Scale factors
    pub scale: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

impl Transform2D {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat3 {
        Mat3::translation_2d(self.position)
            * Mat3::rotation_2d(self.rotation)
            * Mat3::scaling_2d(self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point2) -> Point2 {
        self.to_matrix().transform_point(&point)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
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
}

/// Extension trait for Mat3 with 2D affine helpers
pub trait Mat3Ext {
    /// Create a 2D translation matrix
    fn translation_2d(offset: Vec2) -> Mat3;

    /// Create a counter-clockwise rotation matrix (radians)
    fn rotation_2d(angle: f32) -> Mat3;

    /// Create a non-uniform scaling matrix
    fn scaling_2d(scale: Vec2) -> Mat3;

    /// Copy of this matrix with the translation column zeroed.
    ///
    /// Used to carry directions (deltas) rather than points.
    fn without_translation(&self) -> Mat3;

    /// Translation component of an affine matrix
    fn translation_part(&self) -> Vec2;

    /// Inverse of an affine matrix, `None` when it is singular
    fn try_inverse_affine(&self) -> Option<Mat3>;
}

impl Mat3Ext for Mat3 {
    fn translation_2d(offset: Vec2) -> Mat3 {
        Mat3::new_translation(&offset)
    }

    fn rotation_2d(angle: f32) -> Mat3 {
        Mat3::new_rotation(angle)
    }

    fn scaling_2d(scale: Vec2) -> Mat3 {
        Mat3::new_nonuniform_scaling(&scale)
    }

    fn without_translation(&self) -> Mat3 {
        let mut linear = *self;
        linear[(0, 2)] = 0.0;
        linear[(1, 2)] = 0.0;
        linear
    }

    fn translation_part(&self) -> Vec2 {
        Vec2::new(self[(0, 2)], self[(1, 2)])
    }

    fn try_inverse_affine(&self) -> Option<Mat3> {
        // Only the 2x2 linear block can make an affine matrix singular
        let det = self[(0, 0)] * self[(1, 1)] - self[(0, 1)] * self[(1, 0)];
        if det.abs() < f32::EPSILON {
            return None;
        }
        self.try_inverse()
    }
}
