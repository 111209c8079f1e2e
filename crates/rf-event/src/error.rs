//! Sink error types

use std::path::PathBuf;

use rf_core::RfError;
use thiserror::Error;

use crate::{EventId, SourceId};

#[derive(Error, Debug)]
pub enum EventError {
    /// File missing or undecodable
    #[error("Asset '{}' unavailable: {reason}", path.display())]
    AssetUnavailable { path: PathBuf, reason: String },

    #[error("Unknown event: {0}")]
    UnknownEvent(EventId),

    #[error("Unknown source: {0}")]
    UnknownSource(SourceId),

    #[error("Sink command queue full")]
    QueueFull,
}

impl EventError {
    /// Asset failures skip the clip; everything else is a wiring bug
    pub fn is_asset_error(&self) -> bool {
        matches!(self, EventError::AssetUnavailable { .. })
    }
}

pub type EventResult<T> = Result<T, EventError>;

impl From<EventError> for RfError {
    fn from(e: EventError) -> Self {
        RfError::Sink(e.to_string())
    }
}
