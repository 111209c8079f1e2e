//! Error types for the choreography engine

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum RfError {
    #[error("Invalid tempo: {0} bpm")]
    InvalidTempo(u32),

    #[error("Invalid time signature: {0}")]
    InvalidTimeSignature(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Segment not found: {0}")]
    SegmentNotFound(String),

    #[error("Clip not found: {0}")]
    ClipNotFound(String),

    /// Mutation attempted while the playhead is running
    #[error("Playback must be paused to {0}")]
    PlaybackActive(&'static str),

    /// Lookup past the committed end of a node's position track
    #[error("Position cache miss for node {node} at offset {offset} ({len} steps committed)")]
    CacheMiss { node: String, offset: f64, len: usize },

    #[error("Audio sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("State error: {0}")]
    State(String),
}

/// Result type alias
pub type RfResult<T> = Result<T, RfError>;
