//! rf-engine: Timeline playback and trajectory engine
//!
//! Turns a project's musical timeline into speaker motion and audio events:
//! - `NodeTimeline`: which segment governs an offset, and where it hands off from
//! - `PositionCache`: per-node positions sampled at every timeline unit,
//!   rebuilt on a worker pool with last-edit-wins commits
//! - `PlayheadClock`: tempo-driven, pausable playhead with beat jumps
//! - `AudioScheduler`: clip triggers, seeks, gain and transform pushes to the sink
//! - `PlaybackOrchestrator`: the tick loop and the edit boundary tying it together

mod clock;
mod config;
mod orchestrator;
mod position_cache;
mod scheduler;
mod timeline;

pub use clock::{ClockTick, PlayheadClock};
pub use config::{EngineConfig, RestLayout};
pub use orchestrator::{PlaybackOrchestrator, SceneObserver, TickReport};
pub use position_cache::{step_for, CachedPosition, PositionCache, PositionTrack};
pub use scheduler::{effective_gain, AudioScheduler};
pub use timeline::NodeTimeline;
