//! 3D position type
//!
//! Scene convention: y is up, the listener sits at the origin.

use serde::{Deserialize, Serialize};

/// 3D position in space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    /// X coordinate (left/right, positive = right)
    pub x: f32,
    /// Y coordinate (up/down, positive = up)
    pub y: f32,
    /// Z coordinate (front/back, positive = towards the viewer)
    pub z: f32,
}

impl Position3D {
    /// Create new position
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Origin position
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Point on a horizontal circle of `radius` at `height`, `angle` radians
    /// measured from +x towards +z
    pub fn on_circle(angle: f32, radius: f32, height: f32) -> Self {
        Self::new(angle.cos() * radius, height, angle.sin() * radius)
    }

    /// Get magnitude (distance from origin)
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Linear interpolation
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    /// Distance to another point
    pub fn distance_to(&self, other: &Self) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Default for Position3D {
    fn default() -> Self {
        Self::origin()
    }
}

impl std::fmt::Display for Position3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_midpoint() {
        let a = Position3D::origin();
        let b = Position3D::new(10.0, 10.0, 10.0);
        assert_eq!(a.lerp(&b, 0.5), Position3D::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_on_circle() {
        let p = Position3D::on_circle(0.0, 2.0, 13.0);
        assert!((p.x - 2.0).abs() < 0.001);
        assert!((p.y - 13.0).abs() < 0.001);
        assert!(p.z.abs() < 0.001);
    }

    #[test]
    fn test_distance() {
        let a = Position3D::new(3.0, 0.0, 0.0);
        let b = Position3D::new(0.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 0.001);
        assert!((a.magnitude() - 3.0).abs() < 0.001);
    }
}
