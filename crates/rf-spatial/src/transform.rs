//! Source transform handed to the audio sink

use serde::{Deserialize, Serialize};

use crate::Position3D;

/// 4×4 affine transform, column-major, translation in column 3
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceTransform {
    pub columns: [[f32; 4]; 4],
}

impl SourceTransform {
    pub const IDENTITY: Self = Self {
        columns: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Pure translation to `position`
    pub fn from_position(position: Position3D) -> Self {
        let mut transform = Self::IDENTITY;
        transform.columns[3] = [position.x, position.y, position.z, 1.0];
        transform
    }

    /// Translation component
    pub fn translation(&self) -> Position3D {
        let [x, y, z, _] = self.columns[3];
        Position3D::new(x, y, z)
    }
}

impl Default for SourceTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Position3D> for SourceTransform {
    fn from(position: Position3D) -> Self {
        Self::from_position(position)
    }
}
