//! Audio scheduling
//!
//! Bridges the project's clips to the audio sink:
//! - one sink source per node, one asset + event per clip
//! - clips start when the playhead crosses their start, never before
//! - play-with-seek starts clips already under the playhead part-way in
//! - per-node gain and transform pushed every tick
//!
//! Trigger state ("already played") lives here and is reset by seeks and
//! stops; it is never shared between sessions.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rf_core::{Bpm, RfResult};
use rf_event::{
    generate_playing_id, AssetId, AudioSink, EventDef, EventId, PlayingId, SourceId,
    SpatialMixerDef,
};
use rf_spatial::SourceTransform;
use rf_state::{AudioClip, ClipId, Node, NodeId};
use uuid::Uuid;

/// Gain a node should play at right now
pub fn effective_gain(node: &Node, solo_active: bool) -> f32 {
    if !node.playing || (solo_active && !node.solo) {
        0.0
    } else {
        node.volume()
    }
}

#[derive(Debug, Clone)]
struct ClipVoice {
    asset: AssetId,
    event: EventId,
    start: f64,
    width: f64,
    duration_secs: f64,
    triggered: bool,
    instance: Option<PlayingId>,
}

impl ClipVoice {
    fn contains(&self, offset: f64) -> bool {
        offset >= self.start && offset < self.start + self.width
    }

    fn seek_secs(&self, offset: f64) -> f64 {
        (offset - self.start) / self.width * self.duration_secs
    }
}

#[derive(Debug)]
struct NodeVoice {
    source: SourceId,
    clips: HashMap<ClipId, ClipVoice>,
    /// Clips whose asset failed to load; skipped until the node is released
    skipped: HashSet<ClipId>,
    /// Offset of the last tick this node took part in
    last_offset: f64,
}

/// Clip trigger state and sink bookkeeping for a playback session
#[derive(Debug)]
pub struct AudioScheduler {
    assets_dir: PathBuf,
    tolerance: f64,
    mixer: SpatialMixerDef,
    voices: HashMap<NodeId, NodeVoice>,
}

impl AudioScheduler {
    pub fn new(assets_dir: impl Into<PathBuf>, tolerance: f64) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            tolerance,
            mixer: SpatialMixerDef::default(),
            voices: HashMap::new(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    // ═══════════════════════════════════════════════════════════════════════
    // REGISTRATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Bring the sink in line with `node`: source, clip assets, clip spans.
    pub fn sync_node<S: AudioSink + ?Sized>(&mut self, node: &Node, bpm: Bpm, sink: &mut S) -> RfResult<()> {
        if !self.voices.contains_key(&node.id) {
            let source = Uuid::new_v4();
            sink.create_source(source)?;
            log::debug!("Created source {source} for node '{}'", node.name);
            self.voices.insert(
                node.id,
                NodeVoice {
                    source,
                    clips: HashMap::new(),
                    skipped: HashSet::new(),
                    last_offset: 0.0,
                },
            );
        }
        let assets_dir = self.assets_dir.clone();
        let mixer = self.mixer;
        let Some(voice) = self.voices.get_mut(&node.id) else {
            return Ok(());
        };

        let live: HashSet<ClipId> = node.clips().iter().map(|c| c.id).collect();
        let gone: Vec<ClipId> = voice.clips.keys().filter(|id| !live.contains(id)).copied().collect();
        for id in gone {
            if let Some(clip) = voice.clips.remove(&id) {
                release_clip(&clip, sink);
            }
        }
        voice.skipped.retain(|id| live.contains(id));

        for clip in node.clips() {
            if let Some(existing) = voice.clips.get_mut(&clip.id) {
                let width = clip.width(bpm);
                if existing.start != clip.start || existing.width != width {
                    // The running instance belongs to the old span
                    if let Some(playing_id) = existing.instance.take() {
                        sink.stop(playing_id);
                        log::debug!("Stopped event {} after its clip moved", existing.event);
                    }
                    existing.triggered = false;
                }
                existing.start = clip.start;
                existing.width = width;
                continue;
            }
            if voice.skipped.contains(&clip.id) {
                continue;
            }
            match register_clip(clip, bpm, &assets_dir, mixer, sink) {
                Some(registered) => {
                    voice.clips.insert(clip.id, registered);
                }
                None => {
                    voice.skipped.insert(clip.id);
                }
            }
        }
        Ok(())
    }

    /// Release a node's source and every clip registration
    pub fn remove_node<S: AudioSink + ?Sized>(&mut self, node: NodeId, sink: &mut S) {
        let Some(voice) = self.voices.remove(&node) else {
            return;
        };
        for clip in voice.clips.values() {
            release_clip(clip, sink);
        }
        sink.destroy_source(voice.source);
        log::debug!("Released source {} for node {node}", voice.source);
    }

    /// Release everything (project switch)
    pub fn clear<S: AudioSink + ?Sized>(&mut self, sink: &mut S) {
        sink.stop_all();
        let nodes: Vec<NodeId> = self.voices.keys().copied().collect();
        for node in nodes {
            self.remove_node(node, sink);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TRANSPORT
    // ═══════════════════════════════════════════════════════════════════════

    /// Play with seek: stop whatever was running, then start every clip under
    /// the playhead part-way in. Returns the number of clips started.
    pub fn start_at<S: AudioSink + ?Sized>(&mut self, offset: f64, sink: &mut S) -> usize {
        self.stop(sink);
        let mut started = 0;
        for voice in self.voices.values_mut() {
            voice.last_offset = offset;
            for clip in voice.clips.values_mut() {
                if !clip.contains(offset) {
                    continue;
                }
                let playing_id = generate_playing_id();
                match sink.start(playing_id, clip.event, voice.source, Some(clip.seek_secs(offset))) {
                    Ok(()) => {
                        clip.instance = Some(playing_id);
                        started += 1;
                    }
                    Err(e) => log::warn!("Failed to start event {}: {e}", clip.event),
                }
                clip.triggered = true;
            }
        }
        started
    }

    /// Play without seek
    pub fn resume<S: AudioSink + ?Sized>(&mut self, offset: f64, sink: &mut S) {
        for voice in self.voices.values_mut() {
            voice.last_offset = offset;
        }
        sink.resume_all();
    }

    /// Pause, keeping instances resumable
    pub fn pause<S: AudioSink + ?Sized>(&mut self, sink: &mut S) {
        sink.pause_all();
    }

    /// Stop every instance and forget what was played
    pub fn stop<S: AudioSink + ?Sized>(&mut self, sink: &mut S) {
        sink.stop_all();
        for voice in self.voices.values_mut() {
            for clip in voice.clips.values_mut() {
                clip.triggered = false;
                clip.instance = None;
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TICK
    // ═══════════════════════════════════════════════════════════════════════

    /// Start clips whose start the playhead has reached since the node's last
    /// tick. Nodes for which `suspended` is true are skipped and catch up once
    /// resumed. Returns the number of clips started.
    pub fn trigger<S, F>(&mut self, offset: f64, sink: &mut S, suspended: F) -> usize
    where
        S: AudioSink + ?Sized,
        F: Fn(NodeId) -> bool,
    {
        let tolerance = self.tolerance;
        let mut started = 0;
        for (node, voice) in self.voices.iter_mut() {
            if suspended(*node) {
                continue;
            }
            let window = tolerance.max(offset - voice.last_offset);
            for clip in voice.clips.values_mut() {
                if clip.triggered || offset < clip.start || offset - clip.start > window {
                    continue;
                }
                let playing_id = generate_playing_id();
                match sink.start(playing_id, clip.event, voice.source, None) {
                    Ok(()) => {
                        log::debug!("Triggered event {} at offset {offset:.2}", clip.event);
                        clip.instance = Some(playing_id);
                        started += 1;
                    }
                    Err(e) => log::warn!("Failed to start event {}: {e}", clip.event),
                }
                clip.triggered = true;
            }
            voice.last_offset = offset;
        }
        started
    }

    /// Push a node's transform and gain
    pub fn push_mix<S: AudioSink + ?Sized>(
        &self,
        node: NodeId,
        transform: SourceTransform,
        gain: f32,
        sink: &mut S,
    ) {
        if let Some(voice) = self.voices.get(&node) {
            sink.set_source_transform(voice.source, transform);
            sink.set_source_gain(voice.source, gain);
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn source_of(&self, node: NodeId) -> Option<SourceId> {
        self.voices.get(&node).map(|v| v.source)
    }

    pub fn event_of(&self, clip: ClipId) -> Option<EventId> {
        self.voices
            .values()
            .find_map(|v| v.clips.get(&clip).map(|c| c.event))
    }

    pub fn is_triggered(&self, clip: ClipId) -> bool {
        self.voices
            .values()
            .any(|v| v.clips.get(&clip).is_some_and(|c| c.triggered))
    }

    pub fn is_skipped(&self, clip: ClipId) -> bool {
        self.voices.values().any(|v| v.skipped.contains(&clip))
    }
}

fn register_clip<S: AudioSink + ?Sized>(
    clip: &AudioClip,
    bpm: Bpm,
    assets_dir: &Path,
    mixer: SpatialMixerDef,
    sink: &mut S,
) -> Option<ClipVoice> {
    let asset = Uuid::new_v4();
    let path = clip.asset_path(assets_dir);
    if let Err(e) = sink.register_asset(asset, &path) {
        log::warn!("Skipping clip '{}': {e}", clip.file_name);
        return None;
    }
    let event = Uuid::new_v4();
    if let Err(e) = sink.register_event(event, EventDef { asset, mixer }) {
        log::warn!("Skipping clip '{}': {e}", clip.file_name);
        sink.unregister_asset(asset);
        return None;
    }
    Some(ClipVoice {
        asset,
        event,
        start: clip.start,
        width: clip.width(bpm),
        duration_secs: clip.duration_secs(),
        triggered: false,
        instance: None,
    })
}

fn release_clip<S: AudioSink + ?Sized>(clip: &ClipVoice, sink: &mut S) {
    if let Some(playing_id) = clip.instance {
        sink.stop(playing_id);
    }
    sink.unregister_event(clip.event);
    sink.unregister_asset(clip.asset);
}
