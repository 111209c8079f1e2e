//! Time-bounded motion segments

mod motion;
mod random;
mod segment;

pub use motion::{Motion, MotionKind, MoveParams, OrbitParams, Progress, SpiralParams};
pub use random::{RandomParams, LISTENER_EXCLUSION_RADIUS};
pub use segment::{Segment, SegmentId};
