//! The `AudioSink` trait and its command vocabulary

use std::path::{Path, PathBuf};

use rf_spatial::SourceTransform;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EventResult, PlayingId};

/// Streamed audio asset (one per imported clip)
pub type AssetId = Uuid;

/// Playable event bound to one asset
pub type EventId = Uuid;

/// 3-D emitter (one per speaker)
pub type SourceId = Uuid;

// ═══════════════════════════════════════════════════════════════════════════════
// DEFINITIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Spatial mixer settings for an event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialMixerDef {
    /// Geometric spreading rolloff (1.0 = inverse distance)
    pub rolloff_factor: f32,
    /// Distance beyond which the source is culled
    pub cull_distance: Option<f32>,
}

impl Default for SpatialMixerDef {
    fn default() -> Self {
        Self {
            rolloff_factor: 1.0,
            cull_distance: None,
        }
    }
}

/// One-shot playback of `asset` through a spatial mixer
#[derive(Debug, Clone, PartialEq)]
pub struct EventDef {
    pub asset: AssetId,
    pub mixer: SpatialMixerDef,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Every operation a sink accepts, as data
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCommand {
    RegisterAsset { asset: AssetId, path: PathBuf },
    UnregisterAsset { asset: AssetId },
    RegisterEvent { event: EventId, def: EventDef },
    UnregisterEvent { event: EventId },
    CreateSource { source: SourceId },
    DestroySource { source: SourceId },
    Start {
        playing_id: PlayingId,
        event: EventId,
        source: SourceId,
        seek_secs: Option<f64>,
    },
    Pause { playing_id: PlayingId },
    Resume { playing_id: PlayingId },
    Stop { playing_id: PlayingId },
    PauseAll,
    ResumeAll,
    StopAll,
    SetGain { source: SourceId, gain: f32 },
    SetTransform { source: SourceId, transform: SourceTransform },
}

// ═══════════════════════════════════════════════════════════════════════════════
// SINK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// External spatial audio engine
pub trait AudioSink: Send {
    fn register_asset(&mut self, asset: AssetId, path: &Path) -> EventResult<()>;
    fn unregister_asset(&mut self, asset: AssetId);

    fn register_event(&mut self, event: EventId, def: EventDef) -> EventResult<()>;
    fn unregister_event(&mut self, event: EventId);

    fn create_source(&mut self, source: SourceId) -> EventResult<()>;
    fn destroy_source(&mut self, source: SourceId);

    /// Start `event` on `source`, optionally seeked into the file
    fn start(
        &mut self,
        playing_id: PlayingId,
        event: EventId,
        source: SourceId,
        seek_secs: Option<f64>,
    ) -> EventResult<()>;
    fn pause(&mut self, playing_id: PlayingId);
    fn resume(&mut self, playing_id: PlayingId);
    fn stop(&mut self, playing_id: PlayingId);

    fn pause_all(&mut self);
    fn resume_all(&mut self);
    fn stop_all(&mut self);

    fn set_source_gain(&mut self, source: SourceId, gain: f32);
    fn set_source_transform(&mut self, source: SourceId, transform: SourceTransform);

    /// Apply a command value; used when draining a queue
    fn apply(&mut self, command: SinkCommand) -> EventResult<()> {
        match command {
            SinkCommand::RegisterAsset { asset, path } => self.register_asset(asset, &path),
            SinkCommand::UnregisterAsset { asset } => {
                self.unregister_asset(asset);
                Ok(())
            }
            SinkCommand::RegisterEvent { event, def } => self.register_event(event, def),
            SinkCommand::UnregisterEvent { event } => {
                self.unregister_event(event);
                Ok(())
            }
            SinkCommand::CreateSource { source } => self.create_source(source),
            SinkCommand::DestroySource { source } => {
                self.destroy_source(source);
                Ok(())
            }
            SinkCommand::Start {
                playing_id,
                event,
                source,
                seek_secs,
            } => self.start(playing_id, event, source, seek_secs),
            SinkCommand::Pause { playing_id } => {
                self.pause(playing_id);
                Ok(())
            }
            SinkCommand::Resume { playing_id } => {
                self.resume(playing_id);
                Ok(())
            }
            SinkCommand::Stop { playing_id } => {
                self.stop(playing_id);
                Ok(())
            }
            SinkCommand::PauseAll => {
                self.pause_all();
                Ok(())
            }
            SinkCommand::ResumeAll => {
                self.resume_all();
                Ok(())
            }
            SinkCommand::StopAll => {
                self.stop_all();
                Ok(())
            }
            SinkCommand::SetGain { source, gain } => {
                self.set_source_gain(source, gain);
                Ok(())
            }
            SinkCommand::SetTransform { source, transform } => {
                self.set_source_transform(source, transform);
                Ok(())
            }
        }
    }
}
