//! Edit operations
//!
//! Every change to a project goes through `Project::apply`, which:
//! - validates the whole edit before touching anything (a rejected edit leaves
//!   the project unchanged)
//! - applies interactive snapping to starts and lengths
//! - reports what derived state the change invalidates

use rf_core::{snap_to_grid, Bpm, RfError, RfResult, TimeSignature, MIN_SEGMENT_LENGTH};
use rf_spatial::{Motion, Segment, SegmentId};

use crate::{AudioClip, ClipId, NodeId, Project};

// ═══════════════════════════════════════════════════════════════════════════════
// EDITS
// ═══════════════════════════════════════════════════════════════════════════════

/// A single user edit
#[derive(Debug, Clone)]
pub enum Edit {
    SetTempo(Bpm),
    SetTimeSignature(TimeSignature),
    AddNode { name: Option<String> },
    RemoveNode(NodeId),
    SetVolume { node: NodeId, volume: f32 },
    SetPlaying { node: NodeId, playing: bool },
    SetSolo { node: NodeId, solo: bool },
    AddSegment { node: NodeId, segment: Segment },
    EditSegment {
        node: NodeId,
        segment: SegmentId,
        start: f64,
        length: f64,
        motion: Motion,
    },
    DeleteSegment { node: NodeId, segment: SegmentId },
    AddClip { node: NodeId, clip: AudioClip },
    /// Move a clip, possibly onto another node
    MoveClip { clip: ClipId, to: NodeId, start: f64 },
    DeleteClip { node: NodeId, clip: ClipId },
}

impl Edit {
    /// True for edits that may only happen while playback is paused
    pub fn requires_pause(&self) -> bool {
        matches!(self, Edit::SetTempo(_) | Edit::SetTimeSignature(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Edit::SetTempo(_) => "set tempo",
            Edit::SetTimeSignature(_) => "set time signature",
            Edit::AddNode { .. } => "add node",
            Edit::RemoveNode(_) => "remove node",
            Edit::SetVolume { .. } => "set volume",
            Edit::SetPlaying { .. } => "set playing",
            Edit::SetSolo { .. } => "set solo",
            Edit::AddSegment { .. } => "add segment",
            Edit::EditSegment { .. } => "edit segment",
            Edit::DeleteSegment { .. } => "delete segment",
            Edit::AddClip { .. } => "add clip",
            Edit::MoveClip { .. } => "move clip",
            Edit::DeleteClip { .. } => "delete clip",
        }
    }
}

/// Derived state made stale by an applied edit
#[derive(Debug, Clone, PartialEq)]
pub enum Invalidation {
    /// Mix-only change; picked up on the next tick
    Mix,
    /// A node's trajectory changed from `from` onwards
    Trajectory { node: NodeId, from: f64 },
    /// Clip registrations changed on these nodes; timeline length may change
    Clips { nodes: Vec<NodeId> },
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    /// Tempo or meter changed: every clip width and the timeline length
    Timeline,
}

// ═══════════════════════════════════════════════════════════════════════════════
// APPLY
// ═══════════════════════════════════════════════════════════════════════════════

fn snapped_length(length: f64) -> RfResult<f64> {
    let snapped = snap_to_grid(length);
    if snapped < MIN_SEGMENT_LENGTH {
        return Err(RfError::InvalidParam(format!(
            "segment length {length} shorter than {MIN_SEGMENT_LENGTH}"
        )));
    }
    Ok(snapped)
}

impl Project {
    pub fn apply(&mut self, edit: Edit) -> RfResult<Invalidation> {
        log::debug!("Applying edit: {}", edit.name());

        match edit {
            Edit::SetTempo(bpm) => {
                self.bpm = bpm;
                Ok(Invalidation::Timeline)
            }
            Edit::SetTimeSignature(ts) => {
                self.time_signature = ts;
                Ok(Invalidation::Timeline)
            }
            Edit::AddNode { name } => Ok(Invalidation::NodeAdded(self.push_node(name))),
            Edit::RemoveNode(id) => {
                let index = self
                    .nodes
                    .iter()
                    .position(|n| n.id == id)
                    .ok_or_else(|| RfError::NodeNotFound(id.to_string()))?;
                self.nodes.remove(index);
                Ok(Invalidation::NodeRemoved(id))
            }
            Edit::SetVolume { node, volume } => {
                self.node_mut(node)?.set_volume(volume)?;
                Ok(Invalidation::Mix)
            }
            Edit::SetPlaying { node, playing } => {
                self.node_mut(node)?.playing = playing;
                Ok(Invalidation::Mix)
            }
            Edit::SetSolo { node, solo } => {
                self.node_mut(node)?.solo = solo;
                Ok(Invalidation::Mix)
            }
            Edit::AddSegment { node, mut segment } => {
                if self.node(node)?.segment(segment.id).is_some() {
                    return Err(RfError::InvalidParam(format!("segment {} already exists", segment.id)));
                }
                let start = snap_to_grid(segment.start());
                let length = snapped_length(segment.length())?;
                segment.set_span(start, length)?;
                self.node_mut(node)?.insert_segment(segment);
                Ok(Invalidation::Trajectory { node, from: start })
            }
            Edit::EditSegment {
                node,
                segment,
                start,
                length,
                motion,
            } => {
                let start = snap_to_grid(start);
                let length = snapped_length(length)?;
                let target = self.node_mut(node)?;
                let mut updated = target
                    .segment(segment)
                    .cloned()
                    .ok_or_else(|| RfError::SegmentNotFound(segment.to_string()))?;
                let old_start = updated.start();
                updated.set_span(start, length)?;
                updated.set_motion(motion)?;

                target.remove_segment(segment);
                target.insert_segment(updated);
                Ok(Invalidation::Trajectory {
                    node,
                    from: old_start.min(start),
                })
            }
            Edit::DeleteSegment { node, segment } => {
                let removed = self
                    .node_mut(node)?
                    .remove_segment(segment)
                    .ok_or_else(|| RfError::SegmentNotFound(segment.to_string()))?;
                Ok(Invalidation::Trajectory {
                    node,
                    from: removed.start(),
                })
            }
            Edit::AddClip { node, mut clip } => {
                clip.validate()?;
                if self.clip_owner(clip.id).is_some() {
                    return Err(RfError::InvalidParam(format!("clip {} already exists", clip.id)));
                }
                clip.start = snap_to_grid(clip.start);
                self.node_mut(node)?.add_clip(clip);
                Ok(Invalidation::Clips { nodes: vec![node] })
            }
            Edit::MoveClip { clip, to, start } => {
                if !start.is_finite() {
                    return Err(RfError::InvalidParam(format!("clip start {start}")));
                }
                self.node(to)?;
                let from = self
                    .clip_owner(clip)
                    .map(|(n, _)| n.id)
                    .ok_or_else(|| RfError::ClipNotFound(clip.to_string()))?;

                let mut moved = self
                    .node_mut(from)?
                    .remove_clip(clip)
                    .ok_or_else(|| RfError::ClipNotFound(clip.to_string()))?;
                moved.start = snap_to_grid(start);
                self.node_mut(to)?.add_clip(moved);

                let nodes = if from == to { vec![to] } else { vec![from, to] };
                Ok(Invalidation::Clips { nodes })
            }
            Edit::DeleteClip { node, clip } => {
                self.node_mut(node)?
                    .remove_clip(clip)
                    .ok_or_else(|| RfError::ClipNotFound(clip.to_string()))?;
                Ok(Invalidation::Clips { nodes: vec![node] })
            }
        }
    }
}
