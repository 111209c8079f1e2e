//! Per-node segment resolution
//!
//! A `NodeTimeline` is an owned snapshot of one node's segments, cheap to send
//! to a cache worker. Segments keep the node's order (descending start, newest
//! first on equal starts), which is the overlap tie-break.

use rf_spatial::{Position3D, Segment};
use rf_state::{Node, NodeId};

use crate::RestLayout;

#[derive(Debug, Clone)]
pub struct NodeTimeline {
    node: NodeId,
    segments: Vec<Segment>,
    rest: Position3D,
    hub: Position3D,
}

impl NodeTimeline {
    pub fn from_node(node: &Node, layout: &RestLayout) -> Self {
        Self {
            node: node.id,
            segments: node.segments().to_vec(),
            rest: layout.position(node.layout_index),
            hub: layout.hub(),
        }
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Position before any segment has run
    #[inline]
    pub fn rest_position(&self) -> Position3D {
        self.rest
    }

    /// Latest-ending segment that has finished by `offset`
    pub fn previous(&self, offset: f64) -> Option<&Segment> {
        self.segments
            .iter()
            .filter(|s| s.end() <= offset)
            .fold(None, |best: Option<&Segment>, s| match best {
                Some(b) if b.end() >= s.end() => Some(b),
                _ => Some(s),
            })
    }

    /// Segment governing `offset`
    pub fn current(&self, offset: f64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.contains(offset))
    }

    /// Position at `offset`, given the position resolved for the step before
    pub fn resolve(&self, offset: f64, last: Position3D) -> Position3D {
        let previous = self.previous(offset);
        match (self.current(offset), previous) {
            (Some(current), prev) => {
                let source = prev.map_or(self.hub, Segment::end_position);
                current.position_at(offset, source, last)
            }
            (None, Some(prev)) => prev.end_position(),
            (None, None) => self.rest,
        }
    }

    /// Offset where the last segment ends, if any
    pub fn last_end(&self) -> Option<f64> {
        self.segments.iter().map(Segment::end).reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rf_spatial::{Motion, MoveParams, OrbitParams};

    fn jump(start: f64, length: f64, x: f32) -> Segment {
        let params = MoveParams::new(Position3D::new(x, 10.0, 0.0), false).unwrap();
        Segment::new(start, length, Motion::Move(params)).unwrap()
    }

    fn timeline(segments: Vec<Segment>) -> NodeTimeline {
        let mut node = Node::new("Speaker", 0);
        for s in segments {
            node.insert_segment(s);
        }
        NodeTimeline::from_node(&node, &RestLayout::default())
    }

    #[test]
    fn test_rest_before_any_segment() {
        let tl = timeline(vec![jump(240.0, 240.0, 5.0)]);
        let p = tl.resolve(100.0, Position3D::origin());
        assert_eq!(p, RestLayout::default().position(0));
    }

    #[test]
    fn test_previous_end_held_in_gap() {
        let tl = timeline(vec![jump(0.0, 240.0, 5.0), jump(480.0, 240.0, 9.0)]);
        assert_eq!(tl.resolve(300.0, Position3D::origin()).x, 5.0);
        assert_eq!(tl.resolve(720.0, Position3D::origin()).x, 9.0);
    }

    #[test]
    fn test_previous_picks_latest_end() {
        let tl = timeline(vec![jump(0.0, 600.0, 1.0), jump(240.0, 240.0, 2.0)]);
        assert_eq!(tl.previous(700.0).unwrap().end(), 600.0);
        assert_eq!(tl.previous(500.0).unwrap().end(), 480.0);
        assert!(tl.previous(100.0).is_none());
    }

    #[test]
    fn test_previous_end_is_source_at_boundary() {
        let first = jump(0.0, 240.0, 20.0);
        let glide = Segment::new(
            240.0,
            240.0,
            Motion::Move(MoveParams::new(Position3D::new(0.0, 10.0, 0.0), true).unwrap()),
        )
        .unwrap();
        let tl = timeline(vec![first, glide]);
        let p = tl.resolve(360.0, Position3D::origin());
        assert_relative_eq!(p.x, 10.0);
    }

    #[test]
    fn test_newest_wins_equal_start() {
        let older = jump(0.0, 480.0, 1.0);
        let newer = jump(0.0, 240.0, 2.0);
        let tl = timeline(vec![older, newer]);
        assert_eq!(tl.resolve(100.0, Position3D::origin()).x, 2.0);
        // Past the newer one's end the older still covers the offset
        assert_eq!(tl.resolve(300.0, Position3D::origin()).x, 1.0);
    }

    #[test]
    fn test_first_segment_starts_from_hub() {
        let orbit = Segment::new(0.0, 960.0, Motion::Orbit(OrbitParams::new(30.0, 30.0, 1.0, 0.0).unwrap())).unwrap();
        let tl = timeline(vec![orbit]);
        let p = tl.resolve(0.0, Position3D::origin());
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(p.y, 30.0);
        assert_relative_eq!(p.z, -30.0, epsilon = 1e-4);
        assert_eq!(tl.last_end(), Some(960.0));
    }
}
