//! In-memory sink
//!
//! Tracks assets, events, sources and instances exactly like a real engine
//! would, without producing sound. Every accepted command is appended to a log.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rf_spatial::SourceTransform;

use crate::{
    AssetId, AudioSink, EventDef, EventError, EventId, EventInstanceState, EventResult, PlayingId,
    SinkCommand, SourceId,
};

/// Live instance as seen by the sink
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub event: EventId,
    pub source: SourceId,
    pub seek_secs: Option<f64>,
    pub state: EventInstanceState,
}

#[derive(Debug, Clone, Default)]
struct SourceRecord {
    gain: f32,
    transform: SourceTransform,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    assets: HashMap<AssetId, PathBuf>,
    events: HashMap<EventId, EventDef>,
    sources: HashMap<SourceId, SourceRecord>,
    instances: HashMap<PlayingId, InstanceRecord>,
    log: Vec<SinkCommand>,
    /// Assets whose registration fails
    broken_assets: HashSet<AssetId>,
    /// Reject assets whose file does not exist
    require_files: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that checks asset files on registration
    pub fn with_file_checks() -> Self {
        Self {
            require_files: true,
            ..Self::default()
        }
    }

    /// Make registration of `asset` fail as if the file were unreadable
    pub fn break_asset(&mut self, asset: AssetId) {
        self.broken_assets.insert(asset);
    }

    // ─── Inspection ──────────────────────────────────────────────────────

    pub fn commands(&self) -> &[SinkCommand] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// `(event, seek)` for every start in the log, in order
    pub fn starts(&self) -> Vec<(EventId, Option<f64>)> {
        self.log
            .iter()
            .filter_map(|c| match c {
                SinkCommand::Start { event, seek_secs, .. } => Some((*event, *seek_secs)),
                _ => None,
            })
            .collect()
    }

    pub fn start_count(&self, event: EventId) -> usize {
        self.starts().iter().filter(|(e, _)| *e == event).count()
    }

    pub fn count(&self, pred: impl Fn(&SinkCommand) -> bool) -> usize {
        self.log.iter().filter(|c| pred(c)).count()
    }

    pub fn instance(&self, playing_id: PlayingId) -> Option<&InstanceRecord> {
        self.instances.get(&playing_id)
    }

    /// Instances that are playing or paused
    pub fn active_instances(&self) -> impl Iterator<Item = (&PlayingId, &InstanceRecord)> {
        self.instances.iter().filter(|(_, i)| i.state.is_active())
    }

    pub fn has_asset(&self, asset: AssetId) -> bool {
        self.assets.contains_key(&asset)
    }

    pub fn has_event(&self, event: EventId) -> bool {
        self.events.contains_key(&event)
    }

    pub fn has_source(&self, source: SourceId) -> bool {
        self.sources.contains_key(&source)
    }

    pub fn source_gain(&self, source: SourceId) -> Option<f32> {
        self.sources.get(&source).map(|s| s.gain)
    }

    pub fn source_transform(&self, source: SourceId) -> Option<SourceTransform> {
        self.sources.get(&source).map(|s| s.transform)
    }

    fn set_state(&mut self, playing_id: PlayingId, from: EventInstanceState, to: EventInstanceState) {
        if let Some(instance) = self.instances.get_mut(&playing_id) {
            if instance.state == from {
                instance.state = to;
            }
        }
    }

    fn set_all(&mut self, from: &[EventInstanceState], to: EventInstanceState) {
        for instance in self.instances.values_mut() {
            if from.contains(&instance.state) {
                instance.state = to;
            }
        }
    }
}

impl AudioSink for RecordingSink {
    fn register_asset(&mut self, asset: AssetId, path: &Path) -> EventResult<()> {
        if self.broken_assets.contains(&asset) {
            return Err(EventError::AssetUnavailable {
                path: path.to_path_buf(),
                reason: "decode failed".into(),
            });
        }
        if self.require_files && !path.is_file() {
            return Err(EventError::AssetUnavailable {
                path: path.to_path_buf(),
                reason: "file not found".into(),
            });
        }
        self.assets.insert(asset, path.to_path_buf());
        self.log.push(SinkCommand::RegisterAsset {
            asset,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn unregister_asset(&mut self, asset: AssetId) {
        self.assets.remove(&asset);
        self.log.push(SinkCommand::UnregisterAsset { asset });
    }

    fn register_event(&mut self, event: EventId, def: EventDef) -> EventResult<()> {
        if !self.assets.contains_key(&def.asset) {
            return Err(EventError::AssetUnavailable {
                path: PathBuf::from(def.asset.to_string()),
                reason: "asset not registered".into(),
            });
        }
        self.events.insert(event, def.clone());
        self.log.push(SinkCommand::RegisterEvent { event, def });
        Ok(())
    }

    fn unregister_event(&mut self, event: EventId) {
        self.events.remove(&event);
        self.log.push(SinkCommand::UnregisterEvent { event });
    }

    fn create_source(&mut self, source: SourceId) -> EventResult<()> {
        self.sources.entry(source).or_insert_with(|| SourceRecord {
            gain: 1.0,
            transform: SourceTransform::IDENTITY,
        });
        self.log.push(SinkCommand::CreateSource { source });
        Ok(())
    }

    fn destroy_source(&mut self, source: SourceId) {
        self.sources.remove(&source);
        for instance in self.instances.values_mut() {
            if instance.source == source {
                instance.state = EventInstanceState::Stopped;
            }
        }
        self.log.push(SinkCommand::DestroySource { source });
    }

    fn start(
        &mut self,
        playing_id: PlayingId,
        event: EventId,
        source: SourceId,
        seek_secs: Option<f64>,
    ) -> EventResult<()> {
        if !self.events.contains_key(&event) {
            return Err(EventError::UnknownEvent(event));
        }
        if !self.sources.contains_key(&source) {
            return Err(EventError::UnknownSource(source));
        }
        self.instances.insert(
            playing_id,
            InstanceRecord {
                event,
                source,
                seek_secs,
                state: EventInstanceState::Playing,
            },
        );
        self.log.push(SinkCommand::Start {
            playing_id,
            event,
            source,
            seek_secs,
        });
        Ok(())
    }

    fn pause(&mut self, playing_id: PlayingId) {
        self.set_state(playing_id, EventInstanceState::Playing, EventInstanceState::Paused);
        self.log.push(SinkCommand::Pause { playing_id });
    }

    fn resume(&mut self, playing_id: PlayingId) {
        self.set_state(playing_id, EventInstanceState::Paused, EventInstanceState::Playing);
        self.log.push(SinkCommand::Resume { playing_id });
    }

    fn stop(&mut self, playing_id: PlayingId) {
        if let Some(instance) = self.instances.get_mut(&playing_id) {
            instance.state = EventInstanceState::Stopped;
        }
        self.log.push(SinkCommand::Stop { playing_id });
    }

    fn pause_all(&mut self) {
        self.set_all(&[EventInstanceState::Playing], EventInstanceState::Paused);
        self.log.push(SinkCommand::PauseAll);
    }

    fn resume_all(&mut self) {
        self.set_all(&[EventInstanceState::Paused], EventInstanceState::Playing);
        self.log.push(SinkCommand::ResumeAll);
    }

    fn stop_all(&mut self) {
        self.set_all(
            &[EventInstanceState::Playing, EventInstanceState::Paused],
            EventInstanceState::Stopped,
        );
        self.log.push(SinkCommand::StopAll);
    }

    fn set_source_gain(&mut self, source: SourceId, gain: f32) {
        if let Some(s) = self.sources.get_mut(&source) {
            s.gain = gain;
        }
        self.log.push(SinkCommand::SetGain { source, gain });
    }

    fn set_source_transform(&mut self, source: SourceId, transform: SourceTransform) {
        if let Some(s) = self.sources.get_mut(&source) {
            s.transform = transform;
        }
        self.log.push(SinkCommand::SetTransform { source, transform });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{generate_playing_id, SpatialMixerDef};
    use uuid::Uuid;

    fn wired() -> (RecordingSink, EventId, SourceId) {
        let mut sink = RecordingSink::new();
        let asset = Uuid::new_v4();
        let event = Uuid::new_v4();
        let source = Uuid::new_v4();
        sink.register_asset(asset, Path::new("bass.mp3")).unwrap();
        sink.register_event(event, EventDef { asset, mixer: SpatialMixerDef::default() }).unwrap();
        sink.create_source(source).unwrap();
        (sink, event, source)
    }

    #[test]
    fn test_pause_resume_cycle() {
        let (mut sink, event, source) = wired();
        let id = generate_playing_id();
        sink.start(id, event, source, Some(1.5)).unwrap();
        sink.pause_all();
        assert_eq!(sink.instance(id).unwrap().state, EventInstanceState::Paused);
        sink.resume_all();
        assert_eq!(sink.instance(id).unwrap().state, EventInstanceState::Playing);
        sink.stop_all();
        assert_eq!(sink.active_instances().count(), 0);
        assert_eq!(sink.starts(), vec![(event, Some(1.5))]);
    }

    #[test]
    fn test_start_requires_registration() {
        let (mut sink, _, source) = wired();
        let unknown = Uuid::new_v4();
        assert!(matches!(
            sink.start(generate_playing_id(), unknown, source, None),
            Err(EventError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_broken_asset_rejected() {
        let mut sink = RecordingSink::new();
        let asset = Uuid::new_v4();
        sink.break_asset(asset);
        let err = sink.register_asset(asset, Path::new("x.mp3")).unwrap_err();
        assert!(err.is_asset_error());
        assert!(!sink.has_asset(asset));
    }

    #[test]
    fn test_file_checks() {
        let mut sink = RecordingSink::with_file_checks();
        let result = sink.register_asset(Uuid::new_v4(), Path::new("/definitely/missing.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_destroy_source_stops_its_instances() {
        let (mut sink, event, source) = wired();
        let id = generate_playing_id();
        sink.start(id, event, source, None).unwrap();
        sink.destroy_source(source);
        assert!(sink.instance(id).unwrap().state.is_finished());
        assert!(!sink.has_source(source));
    }
}
