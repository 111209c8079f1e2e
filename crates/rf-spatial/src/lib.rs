//! Speaker trajectory engine
//!
//! Pure motion math for speakers orbiting a listener at the origin:
//!
//! ## Positions
//! - `Position3D` (y up) and the `SourceTransform` matrix the audio sink consumes
//!
//! ## Trajectories
//! - `Motion`: Move, Orbit, Spiral and Random, one validated parameter struct each
//! - `Segment`: a motion bounded to `[start, start + length)` on the timeline
//! - Random motion is reproducible: every sub-period draws from its own seeded stream

mod error;
mod position;
mod transform;

pub mod trajectory;

pub use error::{SpatialError, SpatialResult};
pub use position::Position3D;
pub use trajectory::{
    Motion, MotionKind, MoveParams, OrbitParams, Progress, RandomParams, Segment, SegmentId,
    SpiralParams, LISTENER_EXCLUSION_RADIUS,
};
pub use transform::SourceTransform;
