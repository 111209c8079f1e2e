//! Audio sink contract
//!
//! The playback engine never decodes audio. It drives an external spatial
//! audio engine through the `AudioSink` trait:
//! - register/unregister streamed assets and the events that play them
//! - create/destroy one 3-D source per speaker
//! - start (optionally seeked), pause, resume and stop event instances
//! - push per-source gain and transform updates
//!
//! ## Architecture
//!
//! ```text
//!   Control thread                         Audio thread
//!   ┌──────────────────┐                  ┌──────────────────┐
//!   │ QueuedSink       │───SinkCommand────▶│ SinkProcessor    │
//!   │ (AudioSink impl) │   (lock-free)    │ .process()       │──▶ real sink
//!   └──────────────────┘                  └──────────────────┘
//! ```
//!
//! `RecordingSink` is an in-memory sink that tracks instance state and keeps
//! a log of every command; tests and headless runs use it directly.

mod error;
mod instance;
mod queue;
mod recording;
mod sink;

pub use error::{EventError, EventResult};
pub use instance::{generate_playing_id, EventInstanceState, PlayingId, INVALID_PLAYING_ID};
pub use queue::{queued, QueuedSink, SinkProcessor, COMMAND_QUEUE_CAPACITY};
pub use recording::{InstanceRecord, RecordingSink};
pub use sink::{AssetId, AudioSink, EventDef, EventId, SinkCommand, SourceId, SpatialMixerDef};
