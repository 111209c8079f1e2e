//! Speaker nodes

use std::fmt;

use rf_core::{Bpm, RfError, RfResult};
use rf_spatial::{Segment, SegmentId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AudioClip, ClipId};

/// Speaker colors, picked by layout index
pub const NODE_PALETTE: [u32; 12] = [
    0x00A1D8, 0x0161FE, 0x4C22B2, 0x982ABD, 0xB92D5D, 0xFF4014, 0xFF6A00, 0xFFAB00, 0xFEC705,
    0xFFFB42, 0xDAEC37, 0x77BB41,
];

/// Base name given to speakers created without one
pub const DEFAULT_NODE_NAME: &str = "Speaker";

/// Unique node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A speaker: a sound source with clips and a choreography
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Slot in the default rest layout
    pub layout_index: u32,
    volume: f32,
    /// Muted when false
    pub playing: bool,
    pub solo: bool,
    /// 0xRRGGBB
    pub color: u32,
    clips: Vec<AudioClip>,
    /// Sorted by descending start
    segments: Vec<Segment>,
}

impl Node {
    pub fn new(name: impl Into<String>, layout_index: u32) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            layout_index,
            volume: 1.0,
            playing: true,
            solo: false,
            color: NODE_PALETTE[layout_index as usize % NODE_PALETTE.len()],
            clips: Vec::new(),
            segments: Vec::new(),
        }
    }

    // ─── Mix ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) -> RfResult<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(RfError::InvalidParam(format!("volume must be in [0, 1], got {volume}")));
        }
        self.volume = volume;
        Ok(())
    }

    // ─── Segments ────────────────────────────────────────────────────────

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Insert keeping descending start order. A segment lands ahead of any
    /// existing segment with the same start, so the newest one wins overlaps.
    pub fn insert_segment(&mut self, segment: Segment) {
        let index = self
            .segments
            .iter()
            .position(|s| s.start() <= segment.start())
            .unwrap_or(self.segments.len());
        self.segments.insert(index, segment);
    }

    pub fn remove_segment(&mut self, id: SegmentId) -> Option<Segment> {
        let index = self.segments.iter().position(|s| s.id == id)?;
        Some(self.segments.remove(index))
    }

    pub fn is_segment_obstructed(&self, id: SegmentId) -> bool {
        self.segment(id)
            .is_some_and(|seg| self.segments.iter().any(|other| seg.is_obstructed_by(other)))
    }

    // ─── Clips ───────────────────────────────────────────────────────────

    pub fn clips(&self) -> &[AudioClip] {
        &self.clips
    }

    pub fn clip(&self, id: ClipId) -> Option<&AudioClip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn add_clip(&mut self, clip: AudioClip) {
        self.clips.push(clip);
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<AudioClip> {
        let index = self.clips.iter().position(|c| c.id == id)?;
        Some(self.clips.remove(index))
    }

    pub fn is_clip_obstructed(&self, id: ClipId, bpm: Bpm) -> bool {
        self.clip(id)
            .is_some_and(|clip| self.clips.iter().any(|other| clip.is_obstructed_by(other, bpm)))
    }

    /// Latest clip end at `bpm`
    pub fn max_clip_end(&self, bpm: Bpm) -> Option<f64> {
        self.clips.iter().map(|c| c.end(bpm)).reduce(f64::max)
    }

    /// Check everything that serde may have let through
    pub fn validate(&self) -> RfResult<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(RfError::InvalidParam(format!(
                "node '{}' volume {} outside [0, 1]",
                self.name, self.volume
            )));
        }
        for segment in &self.segments {
            segment.validate()?;
        }
        for clip in &self.clips {
            clip.validate()?;
        }
        let sorted = self.segments.windows(2).all(|w| w[0].start() >= w[1].start());
        if !sorted {
            return Err(RfError::State(format!("node '{}' segments out of order", self.name)));
        }
        Ok(())
    }
}

/// Name for the next default-named node: "Speaker", then "Speaker N"
pub fn next_default_name<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let mut count = 0usize;
    let mut highest = 0u32;
    for name in existing.into_iter().filter(|n| n.contains(DEFAULT_NODE_NAME)) {
        count += 1;
        let number = name
            .strip_prefix(DEFAULT_NODE_NAME)
            .and_then(|rest| rest.trim().parse::<u32>().ok())
            .unwrap_or(0);
        highest = highest.max(number);
    }

    if count == 0 {
        DEFAULT_NODE_NAME.to_string()
    } else {
        format!("{DEFAULT_NODE_NAME} {}", highest + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_spatial::{Motion, MotionKind, OrbitParams};

    fn orbit(start: f64, length: f64) -> Segment {
        Segment::new(start, length, Motion::Orbit(OrbitParams::default())).unwrap()
    }

    #[test]
    fn test_segments_sorted_descending() {
        let mut node = Node::new("Speaker", 0);
        node.insert_segment(orbit(240.0, 240.0));
        node.insert_segment(orbit(0.0, 240.0));
        node.insert_segment(orbit(960.0, 240.0));
        let starts: Vec<f64> = node.segments().iter().map(|s| s.start()).collect();
        assert_eq!(starts, vec![960.0, 240.0, 0.0]);
    }

    #[test]
    fn test_equal_start_newest_first() {
        let mut node = Node::new("Speaker", 0);
        let first = orbit(240.0, 240.0);
        let second = Segment::with_defaults(MotionKind::Spiral, 240.0).unwrap();
        let (first_id, second_id) = (first.id, second.id);
        node.insert_segment(first);
        node.insert_segment(second);
        assert_eq!(node.segments()[0].id, second_id);
        assert_eq!(node.segments()[1].id, first_id);
    }

    #[test]
    fn test_segment_obstruction() {
        let mut node = Node::new("Speaker", 0);
        let a = orbit(0.0, 480.0);
        let b = orbit(240.0, 240.0);
        let (a_id, b_id) = (a.id, b.id);
        node.insert_segment(a);
        node.insert_segment(b);
        assert!(node.is_segment_obstructed(b_id));
        assert!(!node.is_segment_obstructed(a_id));
    }

    #[test]
    fn test_volume_bounds() {
        let mut node = Node::new("Speaker", 0);
        assert!(node.set_volume(0.3).is_ok());
        assert!(node.set_volume(1.2).is_err());
        assert_eq!(node.volume(), 0.3);
    }

    #[test]
    fn test_palette_by_layout_index() {
        assert_eq!(Node::new("a", 0).color, NODE_PALETTE[0]);
        assert_eq!(Node::new("b", 13).color, NODE_PALETTE[1]);
    }

    #[test]
    fn test_default_names() {
        assert_eq!(next_default_name(std::iter::empty()), "Speaker");
        assert_eq!(next_default_name(["Bass", "Speaker"]), "Speaker 1");
        assert_eq!(next_default_name(["Speaker", "Speaker 1", "Speaker 4"]), "Speaker 5");
    }

    #[test]
    fn test_max_clip_end() {
        let mut node = Node::new("Speaker", 0);
        let bpm = Bpm::new(80).unwrap();
        assert_eq!(node.max_clip_end(bpm), None);
        node.add_clip(AudioClip::new("a", "mp3", 0.0, 3.0).unwrap());
        node.add_clip(AudioClip::new("b", "mp3", 240.0, 3.0).unwrap());
        assert!((node.max_clip_end(bpm).unwrap() - 480.0).abs() < 1e-9);
    }
}
