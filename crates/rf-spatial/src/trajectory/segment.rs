//! Motion bounded to a timeline span

use std::fmt;

use rf_core::DEFAULT_SEGMENT_LENGTH;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::motion::{Motion, MotionKind, Progress};
use crate::{Position3D, SpatialError, SpatialResult};

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A motion applied over `[start, start + length)` timeline units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    start: f64,
    length: f64,
    motion: Motion,
}

impl Segment {
    pub fn new(start: f64, length: f64, motion: Motion) -> SpatialResult<Self> {
        Self::validate_span(start, length)?;
        motion.validate()?;
        Ok(Self {
            id: SegmentId::new(),
            start,
            length,
            motion,
        })
    }

    /// Segment of `kind` with default parameters and length
    pub fn with_defaults(kind: MotionKind, start: f64) -> SpatialResult<Self> {
        Self::new(start, DEFAULT_SEGMENT_LENGTH, Motion::default_for(kind))
    }

    pub fn validate_span(start: f64, length: f64) -> SpatialResult<()> {
        if start.is_finite() && length.is_finite() && start >= 0.0 && length > 0.0 {
            Ok(())
        } else {
            Err(SpatialError::InvalidSpan { start, length })
        }
    }

    /// Re-check a segment that bypassed the constructor (deserialized)
    pub fn validate(&self) -> SpatialResult<()> {
        Self::validate_span(self.start, self.length)?;
        self.motion.validate()
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    #[inline]
    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    #[inline]
    pub fn kind(&self) -> MotionKind {
        self.motion.kind()
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    pub fn set_span(&mut self, start: f64, length: f64) -> SpatialResult<()> {
        Self::validate_span(start, length)?;
        self.start = start;
        self.length = length;
        Ok(())
    }

    pub fn set_motion(&mut self, motion: Motion) -> SpatialResult<()> {
        motion.validate()?;
        self.motion = motion;
        Ok(())
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// True when `offset` lies in `[start, end)`
    #[inline]
    pub fn contains(&self, offset: f64) -> bool {
        offset >= self.start && offset < self.end()
    }

    /// True when `other` starts earlier and is still running at our start
    pub fn is_obstructed_by(&self, other: &Segment) -> bool {
        other.id != self.id && other.start < self.start && other.end() > self.start
    }

    /// Position at `offset`. Callers pass offsets inside the segment.
    pub fn position_at(&self, offset: f64, source: Position3D, current: Position3D) -> Position3D {
        let progress = Progress::new(offset - self.start, self.length);
        self.motion.evaluate(progress, source, current)
    }

    pub fn end_position(&self) -> Position3D {
        self.motion.end_position()
    }

    /// Polyline of `samples + 1` points from start to end, for edit previews
    pub fn preview_path(&self, samples: usize, source: Position3D) -> Vec<Position3D> {
        let samples = samples.max(1);
        let mut current = source;
        (0..=samples)
            .map(|i| {
                let elapsed = self.length * i as f64 / samples as f64;
                current = self.motion.evaluate(Progress::new(elapsed, self.length), source, current);
                current
            })
            .collect()
    }
}
