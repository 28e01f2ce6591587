//! World-space axis-aligned bounds (y-up)

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat3, Point2, Vec2};

/// Axis-aligned box in world space.
///
/// `top` is the larger y value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum x
    pub left: f32,
    /// Maximum x
    pub right: f32,
    /// Minimum y
    pub bottom: f32,
    /// Maximum y
    pub top: f32,
}

impl Bounds {
    /// Create bounds from explicit edges
    pub fn new(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }

    /// Enclosing box of a centered `size` rectangle transformed by `matrix`.
    ///
    /// Without a size the box collapses onto the transformed origin.
    pub fn from_matrix(matrix: &Mat3, size: Option<Vec2>) -> Self {
        let half = size.map_or_else(Vec2::zeros, |s| s * 0.5);
        let corners = [
            Point2::new(-half.x, -half.y),
            Point2::new(half.x, -half.y),
            Point2::new(half.x, half.y),
            Point2::new(-half.x, half.y),
        ];

        let mut bounds = Self {
            left: f32::INFINITY,
            right: f32::NEG_INFINITY,
            bottom: f32::INFINITY,
            top: f32::NEG_INFINITY,
        };
        for corner in &corners {
            let p = matrix.transform_point(corner);
            bounds.left = bounds.left.min(p.x);
            bounds.right = bounds.right.max(p.x);
            bounds.bottom = bounds.bottom.min(p.y);
            bounds.top = bounds.top.max(p.y);
        }
        bounds
    }

    /// Center point
    pub fn center(&self) -> Vec2 {
        Vec2::new((self.left + self.right) * 0.5, (self.bottom + self.top) * 0.5)
    }

    /// Horizontal extent
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Vertical extent
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Check if this box contains a point (edges inclusive)
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.bottom
            && point.y <= self.top
    }

    /// Check if this box intersects another box
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left <= other.right
            && self.right >= other.left
            && self.bottom <= other.top
            && self.top >= other.bottom
    }
}

/// Partial world-space placement request for
/// [`crate::scene::SceneGraph::set_bounds`].
///
/// Horizontal targets resolve as `x`, then `left`, then `right`; vertical
/// targets as `y`, then `bottom`, then `top`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundsEdit {
    /// Target left edge
    pub left: Option<f32>,
    /// Target right edge
    pub right: Option<f32>,
    /// Target top edge
    pub top: Option<f32>,
    /// Target bottom edge
    pub bottom: Option<f32>,
    /// Target horizontal center
    pub x: Option<f32>,
    /// Target vertical center
    pub y: Option<f32>,
}

impl BoundsEdit {
    /// World-space delta that moves `current` onto the requested targets
    pub fn delta_from(&self, current: &Bounds) -> Vec2 {
        let center = current.center();
        let dx = self
            .x
            .map(|x| x - center.x)
            .or_else(|| self.left.map(|left| left - current.left))
            .or_else(|| self.right.map(|right| right - current.right))
            .unwrap_or(0.0);
        let dy = self
            .y
            .map(|y| y - center.y)
            .or_else(|| self.bottom.map(|bottom| bottom - current.bottom))
            .or_else(|| self.top.map(|top| top - current.top))
            .unwrap_or(0.0);
        Vec2::new(dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat3Ext;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_bounds() {
        let bounds = Bounds::from_matrix(&Mat3::identity(), Some(Vec2::new(4.0, 2.0)));
        assert_eq!(bounds, Bounds::new(-2.0, 2.0, -1.0, 1.0));
        assert_relative_eq!(bounds.width(), 4.0);
        assert_relative_eq!(bounds.height(), 2.0);
    }

    #[test]
    fn test_unsized_bounds_collapse_to_origin() {
        let m = Mat3::translation_2d(Vec2::new(3.0, -1.0));
        let bounds = Bounds::from_matrix(&m, None);
        assert_eq!(bounds, Bounds::new(3.0, 3.0, -1.0, -1.0));
    }

    #[test]
    fn test_contains_and_intersects() {
        let a = Bounds::new(0.0, 2.0, 0.0, 2.0);
        let b = Bounds::new(1.0, 3.0, 1.0, 3.0);
        let c = Bounds::new(5.0, 6.0, 5.0, 6.0);

        assert!(a.contains(Vec2::new(1.0, 1.0)));
        assert!(!a.contains(Vec2::new(2.5, 1.0)));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_edit_priority() {
        let current = Bounds::new(-1.0, 1.0, -1.0, 1.0);
        let edit = BoundsEdit {
            x: Some(5.0),
            left: Some(100.0),
            top: Some(3.0),
            ..Default::default()
        };

        let delta = edit.delta_from(&current);
        assert_relative_eq!(delta, Vec2::new(5.0, 2.0));
    }
}
