//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. The [`Transform2d`] type provides position,
//! rotation, and scale for every scene node.

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// A 2D transform: position, rotation (radians, counter-clockwise), and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2d {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Transform2d {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::IDENTITY
        }
    }

    /// Return a copy rotated to the given angle.
    pub fn with_rotation(mut self, angle: f32) -> Self {
        self.rotation = angle;
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec2::splat(scale);
        self
    }

    /// Rotation as a quaternion around +Z.
    pub fn quat(&self) -> Quat {
        Quat::from_rotation_z(self.rotation)
    }

    /// Compute the 4x4 model matrix (z = 0).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale.extend(1.0),
            self.quat(),
            self.position.extend(0.0),
        )
    }
}

impl Default for Transform2d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_places_origin_at_position() {
        let t = Transform2d::from_xy(3.0, -2.0).with_rotation(1.2);
        let col3 = t.matrix().col(3);
        assert!((col3.x - 3.0).abs() < 1e-4);
        assert!((col3.y + 2.0).abs() < 1e-4);
    }

    #[test]
    fn json_round_trip_keeps_fields() {
        let t = Transform2d::from_xy(1.5, 2.5).with_rotation(0.25).with_scale(2.0);
        let json = serde_json::to_string(&t).unwrap();
        let back: Transform2d = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
