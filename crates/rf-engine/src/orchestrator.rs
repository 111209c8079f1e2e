//! Playback orchestration
//!
//! `PlaybackOrchestrator` is the single mutation boundary for a loaded project.
//! It owns the clock, the position cache, the audio scheduler and the sink,
//! and keeps them consistent:
//! - edits go through `apply`, which maps each `Invalidation` onto cache
//!   rebuilds and sink registrations
//! - `tick` commits finished cache builds, advances the clock, fires clip
//!   triggers and pushes every node's transform and gain
//! - seeking is only possible while paused; the next play then seeks the
//!   sink instead of resuming it

use std::path::PathBuf;
use std::time::Instant;

use rf_core::{Bpm, RfError, RfResult, TimeSignature};
use rf_event::AudioSink;
use rf_spatial::{Motion, Position3D, Segment, SegmentId};
use rf_state::{AudioClip, ClipId, Edit, Invalidation, Node, NodeId, Project};

use crate::position_cache::step_for;
use crate::scheduler::effective_gain;
use crate::{AudioScheduler, ClockTick, EngineConfig, NodeTimeline, PlayheadClock, PositionCache};

/// Passive consumer of computed positions (a renderer)
pub trait SceneObserver {
    fn node_moved(&mut self, node: NodeId, offset: f64, position: Position3D);

    fn playhead_moved(&mut self, _offset: f64) {}
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    pub offset: f64,
    /// Clips started by crossing
    pub started: usize,
    /// Cache builds committed
    pub committed: usize,
    /// Nodes whose cache missed and was extended synchronously
    pub recovered: usize,
    pub auto_paused: bool,
}

pub struct PlaybackOrchestrator<S: AudioSink> {
    project: Project,
    config: EngineConfig,
    clock: PlayheadClock,
    cache: PositionCache,
    scheduler: AudioScheduler,
    sink: S,
    observers: Vec<Box<dyn SceneObserver>>,
    /// Next play must seek instead of resuming paused instances
    seek_pending: bool,
}

impl<S: AudioSink> PlaybackOrchestrator<S> {
    /// Load `project`: register every node with the sink and build every cache
    pub fn new(project: Project, sink: S, config: EngineConfig, assets_dir: impl Into<PathBuf>) -> RfResult<Self> {
        config.validate()?;
        project.validate()?;
        let cache = PositionCache::new(config.cache_workers)?;
        let clock = PlayheadClock::new(project.bpm(), project.time_signature(), project.timeline_end());
        let scheduler = AudioScheduler::new(assets_dir, config.trigger_tolerance);

        let mut orchestrator = Self {
            project,
            config,
            clock,
            cache,
            scheduler,
            sink,
            observers: Vec::new(),
            seek_pending: true,
        };
        orchestrator.load()?;
        Ok(orchestrator)
    }

    fn load(&mut self) -> RfResult<()> {
        let bpm = self.project.bpm();
        for node in self.project.nodes() {
            self.scheduler.sync_node(node, bpm, &mut self.sink)?;
        }
        let timelines = self
            .project
            .nodes()
            .iter()
            .map(|n| NodeTimeline::from_node(n, &self.config.rest))
            .collect();
        self.cache.rebuild_all_blocking(timelines, self.last_step());
        log::info!(
            "Loaded project '{}': {} nodes, timeline end {:.0}",
            self.project.name,
            self.project.nodes().len(),
            self.project.timeline_end()
        );
        Ok(())
    }

    fn last_step(&self) -> usize {
        (self.project.timeline_end() + self.config.cache_headroom).ceil() as usize
    }

    fn timeline(&self, node: NodeId) -> RfResult<NodeTimeline> {
        Ok(NodeTimeline::from_node(self.project.node(node)?, &self.config.rest))
    }

    pub fn add_observer(&mut self, observer: Box<dyn SceneObserver>) {
        self.observers.push(observer);
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &PlayheadClock {
        &self.clock
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &AudioScheduler {
        &self.scheduler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[inline]
    pub fn offset(&self) -> f64 {
        self.clock.offset()
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TRANSPORT
    // ═══════════════════════════════════════════════════════════════════════

    /// Play or pause. Returns true when now playing.
    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(now);
        }
        self.is_playing()
    }

    pub fn play(&mut self, now: Instant) {
        if self.is_playing() {
            return;
        }
        let offset = self.clock.offset();
        if self.seek_pending {
            let started = self.scheduler.start_at(offset, &mut self.sink);
            log::info!("Playback started at {offset:.1} ({started} clips seeked)");
            self.seek_pending = false;
        } else {
            self.scheduler.resume(offset, &mut self.sink);
            log::info!("Playback resumed at {offset:.1}");
        }
        self.clock.play(now);
    }

    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.clock.pause();
        self.scheduler.pause(&mut self.sink);
        log::info!("Playback paused at {:.1}", self.clock.offset());
    }

    /// Pause when playing or already at zero, otherwise return to zero
    pub fn stop_or_revert(&mut self, now: Instant) -> RfResult<()> {
        if self.is_playing() || self.clock.is_at_zero() {
            self.pause();
            Ok(())
        } else {
            self.revert(now)
        }
    }

    /// Return to zero. While playing, playback restarts from zero.
    pub fn revert(&mut self, now: Instant) -> RfResult<()> {
        self.clock.revert(now);
        if self.is_playing() {
            self.scheduler.start_at(0.0, &mut self.sink);
        } else {
            self.seek_pending = true;
        }
        self.refresh()
    }

    pub fn jump_forward(&mut self) -> RfResult<f64> {
        let offset = self.clock.jump_forward()?;
        self.after_seek()?;
        Ok(offset)
    }

    pub fn jump_backward(&mut self) -> RfResult<f64> {
        let offset = self.clock.jump_backward()?;
        self.after_seek()?;
        Ok(offset)
    }

    pub fn jump_to(&mut self, beat: u32) -> RfResult<f64> {
        let offset = self.clock.jump_to(beat)?;
        self.after_seek()?;
        Ok(offset)
    }

    /// Scrub while paused: move the playhead and show positions there
    pub fn scrub(&mut self, offset: f64) -> RfResult<f64> {
        let offset = self.clock.seek(offset)?;
        self.after_seek()?;
        Ok(offset)
    }

    fn after_seek(&mut self) -> RfResult<()> {
        self.seek_pending = true;
        self.refresh()
    }

    /// Push positions for the current offset without advancing
    pub fn refresh(&mut self) -> RfResult<()> {
        self.cache.poll_completions();
        self.push_positions(self.clock.offset())?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TICK
    // ═══════════════════════════════════════════════════════════════════════

    pub fn tick(&mut self, now: Instant) -> RfResult<TickReport> {
        let committed = self.cache.poll_completions().len();
        let was_playing = self.is_playing();
        let ClockTick { offset, auto_paused } = self.clock.tick(now);

        let started = if was_playing {
            let cache = &self.cache;
            self.scheduler
                .trigger(offset, &mut self.sink, |node| cache.is_pending(node))
        } else {
            0
        };
        let recovered = self.push_positions(offset)?;

        if auto_paused {
            self.scheduler.pause(&mut self.sink);
            log::info!("Reached timeline end at {offset:.1}, pausing");
        }

        Ok(TickReport {
            offset,
            started,
            committed,
            recovered,
            auto_paused,
        })
    }

    /// Push every node's cached transform and gain at `offset`. Returns the
    /// number of cache misses recovered synchronously.
    fn push_positions(&mut self, offset: f64) -> RfResult<usize> {
        let last_step = self.last_step().max(step_for(offset));
        let Self {
            project,
            config,
            cache,
            scheduler,
            sink,
            observers,
            ..
        } = self;

        let solo = project.solo_active();
        let mut recovered = 0;
        for node in project.nodes() {
            let entry = match cache.lookup(node.id, offset) {
                Ok(entry) => entry,
                Err(RfError::CacheMiss { len, .. }) => {
                    log::debug!("Cache miss for '{}' at {offset:.1} ({len} steps)", node.name);
                    cache.extend_blocking(&NodeTimeline::from_node(node, &config.rest), last_step);
                    recovered += 1;
                    cache.lookup(node.id, offset)?
                }
                Err(e) => return Err(e),
            };
            scheduler.push_mix(node.id, entry.transform, effective_gain(node, solo), sink);
            for observer in observers.iter_mut() {
                observer.node_moved(node.id, offset, entry.position);
            }
        }
        for observer in observers.iter_mut() {
            observer.playhead_moved(offset);
        }
        Ok(recovered)
    }

    /// Position of `node` at the current offset, from the committed cache
    pub fn position_of(&self, node: NodeId) -> RfResult<Position3D> {
        self.cache
            .lookup(node, self.clock.offset())
            .map(|entry| entry.position)
    }

    /// Block until every requested cache build has committed
    pub fn wait_for_caches(&mut self) {
        self.cache.wait_idle();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // EDITS
    // ═══════════════════════════════════════════════════════════════════════

    /// Apply an edit and bring derived state up to date. A rejected edit
    /// leaves everything unchanged.
    pub fn apply(&mut self, edit: Edit) -> RfResult<Invalidation> {
        if edit.requires_pause() && self.is_playing() {
            return Err(RfError::PlaybackActive(edit.name()));
        }

        let old_end = self.project.timeline_end();
        let invalidation = self.project.apply(edit)?;
        let bpm = self.project.bpm();

        match &invalidation {
            Invalidation::Mix => {}
            Invalidation::Trajectory { node, from } => {
                let timeline = self.timeline(*node)?;
                self.cache.request_from(timeline, step_for(*from), self.last_step());
            }
            Invalidation::Clips { nodes } => {
                for id in nodes {
                    let node = self.project.node(*id)?;
                    self.scheduler.sync_node(node, bpm, &mut self.sink)?;
                }
            }
            Invalidation::NodeAdded(id) => {
                let node = self.project.node(*id)?;
                self.scheduler.sync_node(node, bpm, &mut self.sink)?;
                let timeline = self.timeline(*id)?;
                self.cache.request_full(timeline, self.last_step());
            }
            Invalidation::NodeRemoved(id) => {
                self.scheduler.remove_node(*id, &mut self.sink);
                self.cache.remove(*id);
            }
            Invalidation::Timeline => {
                self.clock.set_bpm(bpm)?;
                self.clock.set_time_signature(self.project.time_signature())?;
                for node in self.project.nodes() {
                    self.scheduler.sync_node(node, bpm, &mut self.sink)?;
                }
                self.seek_pending = true;
            }
        }

        let new_end = self.project.timeline_end();
        if new_end != old_end {
            self.clock.set_end(new_end);
            if new_end > old_end {
                self.grow_caches();
            }
        }
        Ok(invalidation)
    }

    /// Extend every node's cache to the new timeline length
    fn grow_caches(&self) {
        let last_step = self.last_step();
        for node in self.project.nodes() {
            let len = self.cache.track(node.id).map_or(0, |t| t.len());
            if len <= last_step {
                let timeline = NodeTimeline::from_node(node, &self.config.rest);
                self.cache.request_from(timeline, len, last_step);
            }
        }
    }

    // ─── Edit shorthands ─────────────────────────────────────────────────

    pub fn set_tempo(&mut self, bpm: u32) -> RfResult<()> {
        self.apply(Edit::SetTempo(Bpm::new(bpm)?)).map(drop)
    }

    pub fn set_time_signature(&mut self, ts: TimeSignature) -> RfResult<()> {
        self.apply(Edit::SetTimeSignature(ts)).map(drop)
    }

    pub fn add_node(&mut self, name: Option<String>) -> RfResult<NodeId> {
        match self.apply(Edit::AddNode { name })? {
            Invalidation::NodeAdded(id) => Ok(id),
            other => Err(RfError::State(format!("unexpected invalidation {other:?}"))),
        }
    }

    pub fn remove_node(&mut self, node: NodeId) -> RfResult<()> {
        self.apply(Edit::RemoveNode(node)).map(drop)
    }

    pub fn add_segment(&mut self, node: NodeId, segment: Segment) -> RfResult<SegmentId> {
        let id = segment.id;
        self.apply(Edit::AddSegment { node, segment })?;
        Ok(id)
    }

    pub fn edit_segment(
        &mut self,
        node: NodeId,
        segment: SegmentId,
        start: f64,
        length: f64,
        motion: Motion,
    ) -> RfResult<()> {
        self.apply(Edit::EditSegment {
            node,
            segment,
            start,
            length,
            motion,
        })
        .map(drop)
    }

    pub fn delete_segment(&mut self, node: NodeId, segment: SegmentId) -> RfResult<()> {
        self.apply(Edit::DeleteSegment { node, segment }).map(drop)
    }

    pub fn add_clip(&mut self, node: NodeId, clip: AudioClip) -> RfResult<ClipId> {
        let id = clip.id;
        self.apply(Edit::AddClip { node, clip })?;
        Ok(id)
    }

    pub fn move_clip(&mut self, clip: ClipId, to: NodeId, start: f64) -> RfResult<()> {
        self.apply(Edit::MoveClip { clip, to, start }).map(drop)
    }

    pub fn delete_clip(&mut self, node: NodeId, clip: ClipId) -> RfResult<()> {
        self.apply(Edit::DeleteClip { node, clip }).map(drop)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PROJECT SWITCH
    // ═══════════════════════════════════════════════════════════════════════

    /// Replace the loaded project: pause, stop all sound, drop every cache and
    /// registration, then load the new one from zero.
    pub fn switch_project(&mut self, project: Project, now: Instant) -> RfResult<Project> {
        project.validate()?;
        self.pause();
        self.clock.revert(now);
        self.scheduler.clear(&mut self.sink);
        self.cache.clear();

        let previous = std::mem::replace(&mut self.project, project);
        self.clock = PlayheadClock::new(
            self.project.bpm(),
            self.project.time_signature(),
            self.project.timeline_end(),
        );
        self.seek_pending = true;
        self.load()?;
        Ok(previous)
    }

    /// Current nodes, in layout order
    pub fn nodes(&self) -> &[Node] {
        self.project.nodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_event::{RecordingSink, SinkCommand};
    use rf_spatial::{MoveParams, OrbitParams};
    use std::time::Duration;

    fn orchestrator() -> (PlaybackOrchestrator<RecordingSink>, NodeId) {
        let mut project = Project::new("Song");
        let id = project.insert_node(Node::new("Speaker", 0));
        let config = EngineConfig {
            cache_workers: 2,
            ..EngineConfig::default()
        };
        let orch = PlaybackOrchestrator::new(project, RecordingSink::new(), config, "assets").unwrap();
        (orch, id)
    }

    #[test]
    fn test_tempo_change_rejected_while_playing() {
        let (mut orch, _) = orchestrator();
        orch.play(Instant::now());
        assert!(matches!(orch.set_tempo(120), Err(RfError::PlaybackActive(_))));
        assert_eq!(orch.project().bpm().get(), 80);

        orch.pause();
        orch.set_tempo(120).unwrap();
        assert_eq!(orch.clock().bpm().get(), 120);
    }

    #[test]
    fn test_invalid_tempo_rejected() {
        let (mut orch, _) = orchestrator();
        assert!(orch.set_tempo(201).is_err());
        assert!(orch.set_tempo(4).is_err());
        assert_eq!(orch.project().bpm().get(), 80);
    }

    #[test]
    fn test_segment_edit_updates_cache() {
        let (mut orch, node) = orchestrator();
        let dest = Position3D::new(10.0, 10.0, 10.0);
        let segment = Segment::new(0.0, 240.0, Motion::Move(MoveParams::new(dest, false).unwrap())).unwrap();
        orch.add_segment(node, segment).unwrap();
        orch.wait_for_caches();

        orch.scrub(100.0).unwrap();
        assert_eq!(orch.position_of(node).unwrap(), dest);
    }

    #[test]
    fn test_stop_or_revert() {
        let (mut orch, _) = orchestrator();
        let t0 = Instant::now();
        orch.play(t0);
        orch.tick(t0 + Duration::from_secs(1)).unwrap();
        orch.stop_or_revert(t0 + Duration::from_secs(1)).unwrap();
        assert!(!orch.is_playing());
        assert!(orch.offset() > 0.0);

        orch.stop_or_revert(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(orch.offset(), 0.0);
    }

    #[test]
    fn test_add_and_remove_node() {
        let (mut orch, _) = orchestrator();
        let id = orch.add_node(None).unwrap();
        assert_eq!(orch.project().node(id).unwrap().name, "Speaker 1");
        let source = orch.scheduler().source_of(id).unwrap();

        orch.remove_node(id).unwrap();
        assert!(!orch.sink().has_source(source));
        assert!(!orch.cache().contains(id));
        orch.wait_for_caches();
        orch.refresh().unwrap();
    }

    #[test]
    fn test_tick_pushes_transform_and_gain() {
        let (mut orch, node) = orchestrator();
        let orbit = Segment::new(0.0, 960.0, Motion::Orbit(OrbitParams::new(30.0, 30.0, 1.0, 0.0).unwrap())).unwrap();
        orch.add_segment(node, orbit).unwrap();
        orch.wait_for_caches();
        orch.sink_mut().clear_log();

        orch.tick(Instant::now()).unwrap();
        let source = orch.scheduler().source_of(node).unwrap();
        let transform = orch.sink().source_transform(source).unwrap();
        assert_eq!(transform.translation(), orch.position_of(node).unwrap());
        assert_eq!(orch.sink().source_gain(source), Some(1.0));
        assert_eq!(orch.sink().count(|c| matches!(c, SinkCommand::SetGain { .. })), 1);
    }
}
