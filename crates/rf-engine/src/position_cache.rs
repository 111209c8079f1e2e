//! Precomputed speaker positions
//!
//! Each node owns a dense track of positions sampled at whole timeline units.
//! Random motion depends on the previous position, so a track is always built
//! sequentially; different nodes build in parallel on a worker pool.
//!
//! ## Commit protocol
//!
//! ```text
//!   request ──▶ generation g ──▶ worker builds track ──▶ channel ──▶ poll_completions
//!                                                                        │
//!                                     g still latest for the node? ──────┤
//!                                          yes: swap Arc    no: discard ◀┘
//! ```
//!
//! Readers only ever see committed tracks. A lookup past the committed end is
//! a `CacheMiss`, never a clamp.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use rayon::prelude::*;
use rf_core::{RfError, RfResult};
use rf_spatial::{Position3D, SourceTransform};
use rf_state::NodeId;

use crate::NodeTimeline;

// ═══════════════════════════════════════════════════════════════════════════════
// TRACK
// ═══════════════════════════════════════════════════════════════════════════════

/// One cached step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedPosition {
    pub position: Position3D,
    pub transform: SourceTransform,
}

impl From<Position3D> for CachedPosition {
    fn from(position: Position3D) -> Self {
        Self {
            position,
            transform: SourceTransform::from_position(position),
        }
    }
}

/// Immutable position array for one node; index = whole-unit step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionTrack {
    steps: Vec<CachedPosition>,
}

/// Step index holding `offset`
#[inline]
pub fn step_for(offset: f64) -> usize {
    offset.max(0.0).floor() as usize
}

impl PositionTrack {
    /// Compute steps `0..=last_step` from the rest state
    pub fn build(timeline: &NodeTimeline, last_step: usize) -> Self {
        let mut steps = Vec::with_capacity(last_step + 1);
        Self::fill(timeline, &mut steps, timeline.rest_position(), 0, last_step);
        Self { steps }
    }

    /// Keep `prefix[..from]`, recompute `from..=last_step`. Falls back to a
    /// full build when the prefix does not reach `from`.
    pub fn rebuild_from(prefix: &PositionTrack, timeline: &NodeTimeline, from: usize, last_step: usize) -> Self {
        if from == 0 || prefix.steps.len() < from {
            return Self::build(timeline, last_step);
        }
        let last_step = last_step.max(from - 1);
        let mut steps = Vec::with_capacity(last_step + 1);
        steps.extend_from_slice(&prefix.steps[..from]);
        let carried = prefix.steps[from - 1].position;
        Self::fill(timeline, &mut steps, carried, from, last_step);
        Self { steps }
    }

    fn fill(
        timeline: &NodeTimeline,
        steps: &mut Vec<CachedPosition>,
        mut last: Position3D,
        from: usize,
        last_step: usize,
    ) {
        for step in from..=last_step {
            last = timeline.resolve(step as f64, last);
            steps.push(last.into());
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, step: usize) -> Option<&CachedPosition> {
        self.steps.get(step)
    }

    /// Entry for `offset`, if committed
    pub fn at(&self, offset: f64) -> Option<&CachedPosition> {
        self.get(step_for(offset))
    }

    pub fn steps(&self) -> &[CachedPosition] {
        &self.steps
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

struct Slot {
    committed: Arc<PositionTrack>,
    /// Latest generation requested for the node
    requested: u64,
    /// Generation of `committed`
    committed_gen: u64,
    /// Earliest step invalidated by a request not yet committed
    dirty_from: Option<usize>,
}

impl Slot {
    fn is_pending(&self) -> bool {
        self.requested != self.committed_gen
    }
}

struct Completion {
    node: NodeId,
    generation: u64,
    track: PositionTrack,
}

/// Committed position tracks for every node plus the worker pool rebuilding them
pub struct PositionCache {
    slots: RwLock<HashMap<NodeId, Slot>>,
    /// Monotonic across all nodes, so a re-added node never matches stale work
    next_generation: AtomicU64,
    pool: rayon::ThreadPool,
    done_tx: Sender<Completion>,
    done_rx: Receiver<Completion>,
}

impl PositionCache {
    pub fn new(workers: usize) -> RfResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("rf-position-cache-{i}"))
            .build()
            .map_err(|e| RfError::State(format!("cache worker pool: {e}")))?;
        let (done_tx, done_rx) = unbounded();
        Ok(Self {
            slots: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            pool,
            done_tx,
            done_rx,
        })
    }

    fn bump_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    // ─── Requests ────────────────────────────────────────────────────────

    /// Queue a full rebuild of `timeline` up to `last_step`
    pub fn request_full(&self, timeline: NodeTimeline, last_step: usize) -> u64 {
        self.request(timeline, 0, last_step)
    }

    /// Queue a rebuild of `from..=last_step`, reusing the committed prefix
    pub fn request_from(&self, timeline: NodeTimeline, from: usize, last_step: usize) -> u64 {
        self.request(timeline, from, last_step)
    }

    fn request(&self, timeline: NodeTimeline, from: usize, last_step: usize) -> u64 {
        let generation = self.bump_generation();
        let node = timeline.node();

        let (prefix, from) = {
            let mut slots = self.slots.write();
            let slot = slots.entry(node).or_insert_with(|| Slot {
                committed: Arc::new(PositionTrack::default()),
                requested: 0,
                committed_gen: 0,
                dirty_from: None,
            });
            // Earlier uncommitted requests may have invalidated steps before `from`
            let from = slot.dirty_from.map_or(from, |d| d.min(from));
            slot.dirty_from = Some(from);
            slot.requested = generation;
            (Arc::clone(&slot.committed), from)
        };

        log::debug!("Cache rebuild requested: node {node} gen {generation} steps {from}..={last_step}");

        let tx = self.done_tx.clone();
        self.pool.spawn(move || {
            let track = PositionTrack::rebuild_from(&prefix, &timeline, from, last_step);
            let _ = tx.send(Completion {
                node,
                generation,
                track,
            });
        });
        generation
    }

    /// Build and commit `timelines` on the pool, waiting for all of them
    pub fn rebuild_all_blocking(&self, timelines: Vec<NodeTimeline>, last_step: usize) {
        let built: Vec<(NodeId, PositionTrack)> = self.pool.install(|| {
            timelines
                .par_iter()
                .map(|tl| (tl.node(), PositionTrack::build(tl, last_step)))
                .collect()
        });
        for (node, track) in built {
            let generation = self.bump_generation();
            self.commit_forced(node, generation, track);
        }
    }

    /// Synchronously extend a node's committed track to cover `last_step`.
    /// Used to recover from a cache miss. A rebuild still in flight for the
    /// node is committed first, so the extension continues the newest data.
    pub fn extend_blocking(&self, timeline: &NodeTimeline, last_step: usize) {
        let node = timeline.node();
        self.wait_for(node);
        let Some(committed) = self.track(node) else {
            let generation = self.bump_generation();
            self.commit_forced(node, generation, PositionTrack::build(timeline, last_step));
            return;
        };
        if committed.len() > last_step {
            return;
        }
        let track = PositionTrack::rebuild_from(&committed, timeline, committed.len(), last_step);
        if let Some(slot) = self.slots.write().get_mut(&node) {
            slot.committed = Arc::new(track);
            log::debug!("Cache miss recovered: node {node} now {} steps", slot.committed.len());
        }
    }

    fn commit_forced(&self, node: NodeId, generation: u64, track: PositionTrack) {
        let mut slots = self.slots.write();
        slots.insert(
            node,
            Slot {
                committed: Arc::new(track),
                requested: generation,
                committed_gen: generation,
                dirty_from: None,
            },
        );
    }

    // ─── Completion ──────────────────────────────────────────────────────

    fn commit(&self, done: Completion) -> bool {
        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(&done.node) else {
            log::debug!("Discarding cache build for removed node {}", done.node);
            return false;
        };
        if done.generation != slot.requested {
            log::debug!(
                "Discarding stale cache build for node {} (gen {} < {})",
                done.node,
                done.generation,
                slot.requested
            );
            return false;
        }
        slot.committed = Arc::new(done.track);
        slot.committed_gen = done.generation;
        slot.dirty_from = None;
        log::debug!("Committed cache gen {} for node {}", done.generation, done.node);
        true
    }

    /// Commit every finished build without blocking. Returns the nodes that changed.
    pub fn poll_completions(&self) -> Vec<NodeId> {
        let mut committed = Vec::new();
        while let Ok(done) = self.done_rx.try_recv() {
            let node = done.node;
            if self.commit(done) {
                committed.push(node);
            }
        }
        committed
    }

    /// Block until `node` has no outstanding request
    pub fn wait_for(&self, node: NodeId) {
        while self.is_pending(node) {
            match self.done_rx.recv() {
                Ok(done) => {
                    self.commit(done);
                }
                Err(_) => break,
            }
        }
    }

    /// Block until no node has an outstanding request
    pub fn wait_idle(&self) {
        while self.any_pending() {
            match self.done_rx.recv() {
                Ok(done) => {
                    self.commit(done);
                }
                Err(_) => break,
            }
        }
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub fn track(&self, node: NodeId) -> Option<Arc<PositionTrack>> {
        self.slots.read().get(&node).map(|s| Arc::clone(&s.committed))
    }

    /// Committed entry at `offset`
    pub fn lookup(&self, node: NodeId, offset: f64) -> RfResult<CachedPosition> {
        let slots = self.slots.read();
        let slot = slots
            .get(&node)
            .ok_or_else(|| RfError::NodeNotFound(node.to_string()))?;
        slot.committed
            .at(offset)
            .copied()
            .ok_or_else(|| RfError::CacheMiss {
                node: node.to_string(),
                offset,
                len: slot.committed.len(),
            })
    }

    pub fn is_pending(&self, node: NodeId) -> bool {
        self.slots.read().get(&node).is_some_and(Slot::is_pending)
    }

    pub fn any_pending(&self) -> bool {
        self.slots.read().values().any(Slot::is_pending)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.slots.read().contains_key(&node)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Drop a node's track; in-flight builds for it are discarded on arrival
    pub fn remove(&self, node: NodeId) {
        self.slots.write().remove(&node);
    }

    /// Drop every track (project switch)
    pub fn clear(&self) {
        self.slots.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RestLayout;
    use rf_spatial::{Motion, MoveParams, OrbitParams, RandomParams, Segment};
    use rf_state::Node;

    fn random_node() -> Node {
        let mut node = Node::new("Piano", 2);
        node.insert_segment(
            Segment::new(0.0, 960.0, Motion::Orbit(OrbitParams::default())).unwrap(),
        );
        node.insert_segment(
            Segment::new(
                1200.0,
                2160.0,
                Motion::Random(RandomParams::new(24.0, 10, 7).unwrap()),
            )
            .unwrap(),
        );
        node
    }

    fn timeline(node: &Node) -> NodeTimeline {
        NodeTimeline::from_node(node, &RestLayout::default())
    }

    #[test]
    fn test_partial_matches_full() {
        let node = random_node();
        let tl = timeline(&node);
        let full = PositionTrack::build(&tl, 4000);
        let prefix = PositionTrack::build(&tl, 1500);
        let partial = PositionTrack::rebuild_from(&prefix, &tl, 1300, 4000);
        assert_eq!(full, partial);
    }

    #[test]
    fn test_short_prefix_falls_back_to_full() {
        let tl = timeline(&random_node());
        let prefix = PositionTrack::build(&tl, 10);
        let rebuilt = PositionTrack::rebuild_from(&prefix, &tl, 500, 600);
        assert_eq!(rebuilt, PositionTrack::build(&tl, 600));
    }

    #[test]
    fn test_lookup_miss_is_error() {
        let cache = PositionCache::new(1).unwrap();
        let node = random_node();
        cache.rebuild_all_blocking(vec![timeline(&node)], 100);

        assert!(cache.lookup(node.id, 100.5).is_ok());
        match cache.lookup(node.id, 101.0) {
            Err(RfError::CacheMiss { len, .. }) => assert_eq!(len, 101),
            other => panic!("expected cache miss, got {other:?}"),
        }
        assert!(matches!(cache.lookup(NodeId::new(), 0.0), Err(RfError::NodeNotFound(_))));
    }

    #[test]
    fn test_extend_blocking_recovers() {
        let cache = PositionCache::new(1).unwrap();
        let node = random_node();
        let tl = timeline(&node);
        cache.rebuild_all_blocking(vec![tl.clone()], 100);
        cache.extend_blocking(&tl, 2000);

        let track = cache.track(node.id).unwrap();
        assert_eq!(track.len(), 2001);
        assert_eq!(*track, PositionTrack::build(&tl, 2000));
    }

    #[test]
    fn test_extend_joins_pending_rebuild() {
        let cache = PositionCache::new(1).unwrap();
        let mut node = Node::new("Bass", 0);
        cache.rebuild_all_blocking(vec![timeline(&node)], 100);

        let dest = Position3D::new(9.0, 5.0, 5.0);
        node.insert_segment(
            Segment::new(0.0, 240.0, Motion::Move(MoveParams::new(dest, false).unwrap())).unwrap(),
        );
        let edited = timeline(&node);
        cache.request_from(edited.clone(), 0, 100);
        cache.extend_blocking(&edited, 300);

        assert!(!cache.is_pending(node.id));
        let track = cache.track(node.id).unwrap();
        assert_eq!(*track, PositionTrack::build(&edited, 300));
        assert!(cache.poll_completions().is_empty());
        assert_eq!(cache.track(node.id).unwrap().len(), 301);
    }

    #[test]
    fn test_async_request_commits() {
        let cache = PositionCache::new(2).unwrap();
        let node = random_node();
        cache.request_full(timeline(&node), 500);
        cache.wait_idle();

        assert!(!cache.is_pending(node.id));
        assert_eq!(cache.track(node.id).unwrap().len(), 501);
    }

    #[test]
    fn test_last_request_wins() {
        let cache = PositionCache::new(4).unwrap();
        let mut node = Node::new("Bass", 0);
        let mut last_x = 0.0;
        for i in 0..8 {
            last_x = i as f32;
            let mut edited = node.clone();
            edited.insert_segment(
                Segment::new(
                    0.0,
                    240.0,
                    Motion::Move(MoveParams::new(Position3D::new(last_x, 5.0, 5.0), false).unwrap()),
                )
                .unwrap(),
            );
            cache.request_full(timeline(&edited), 300);
            node = edited;
        }
        cache.wait_idle();

        let entry = cache.lookup(node.id, 10.0).unwrap();
        assert_eq!(entry.position.x, last_x);
        assert_eq!(entry.transform.translation(), entry.position);
    }

    #[test]
    fn test_partial_request_covers_earlier_pending_edit() {
        let cache = PositionCache::new(1).unwrap();
        let mut node = Node::new("Bass", 0);
        cache.rebuild_all_blocking(vec![timeline(&node)], 1000);

        let dest = |x: f32| Motion::Move(MoveParams::new(Position3D::new(x, 5.0, 5.0), false).unwrap());
        node.insert_segment(Segment::new(100.0, 240.0, dest(3.0)).unwrap());
        cache.request_from(timeline(&node), 100, 1000);
        node.insert_segment(Segment::new(600.0, 240.0, dest(4.0)).unwrap());
        cache.request_from(timeline(&node), 600, 1000);
        cache.wait_idle();

        let track = cache.track(node.id).unwrap();
        assert_eq!(*track, PositionTrack::build(&timeline(&node), 1000));
    }

    #[test]
    fn test_removed_node_discards_build() {
        let cache = PositionCache::new(1).unwrap();
        let node = random_node();
        cache.request_full(timeline(&node), 200);
        cache.remove(node.id);
        cache.wait_idle();
        assert!(cache.poll_completions().is_empty());
        assert!(!cache.contains(node.id));
    }
}
