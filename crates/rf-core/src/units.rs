//! Timeline unit conversion
//!
//! The timeline is laid out in display units. One full beat occupies
//! `FULL_BEAT_WIDTH` units, of which `FULL_BEAT_MARKER_WIDTH` is the marker
//! itself. All functions here are pure; tempo and meter arrive validated.

use crate::{Bpm, TimeSignature};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Units per full beat
pub const FULL_BEAT_WIDTH: f64 = 60.0;

/// Width of a beat marker at the quarter-note multiplier
pub const FULL_BEAT_MARKER_WIDTH: f64 = 10.0;

/// Interactive edit grid (a quarter beat)
pub const SNAP_UNIT: f64 = FULL_BEAT_WIDTH / 4.0;

/// Beats of empty timeline kept after the last clip
pub const LOOKAHEAD_BEATS: u32 = 10;

/// Length of a freshly created segment, in beats
pub const DEFAULT_SEGMENT_BEATS: f64 = 4.0;

/// Length of a freshly created segment, in units
pub const DEFAULT_SEGMENT_LENGTH: f64 = FULL_BEAT_WIDTH * DEFAULT_SEGMENT_BEATS;

/// Shortest length an interactive resize may produce
pub const MIN_SEGMENT_LENGTH: f64 = DEFAULT_SEGMENT_LENGTH;

// ═══════════════════════════════════════════════════════════════════════════════
// BEAT GRID
// ═══════════════════════════════════════════════════════════════════════════════

/// Scale factor from the beat unit (quarter = 1.0)
#[inline]
pub fn distance_multiplier(ts: TimeSignature) -> f64 {
    ts.beat_unit() as f64 / 4.0
}

/// Gap between adjacent beat markers
#[inline]
pub fn beat_spacing(ts: TimeSignature) -> f64 {
    (FULL_BEAT_WIDTH - FULL_BEAT_MARKER_WIDTH) / distance_multiplier(ts)
}

/// Width of one beat marker
#[inline]
pub fn beat_marker_width(ts: TimeSignature) -> f64 {
    FULL_BEAT_MARKER_WIDTH / distance_multiplier(ts)
}

/// Distance from one beat boundary to the next
#[inline]
pub fn beat_pitch(ts: TimeSignature) -> f64 {
    beat_spacing(ts) + beat_marker_width(ts)
}

/// Beat count shown on the timeline.
///
/// Covers every clip plus `LOOKAHEAD_BEATS`, rounded down to a whole bar.
/// With no clips the timeline shows a fixed default.
pub fn number_of_beats(max_clip_end: Option<f64>, ts: TimeSignature) -> u32 {
    let Some(end) = max_clip_end else {
        return (FULL_BEAT_WIDTH as u32 / 10) * ts.beat_unit();
    };

    let per_bar = ts.beats_per_bar();
    let mut beats = (end.max(0.0) / FULL_BEAT_WIDTH) as u32 + LOOKAHEAD_BEATS + per_bar;
    beats -= beats % per_bar;
    (beats as f64 * distance_multiplier(ts)) as u32
}

/// Offset of the last renderable beat boundary; playback auto-pauses here.
pub fn timeline_end(number_of_beats: u32, ts: TimeSignature) -> f64 {
    let last = number_of_beats.saturating_sub(ts.beats_per_bar() + 1);
    last as f64 * beat_pitch(ts)
}

/// Offset of a ruler beat number. Ruler numbering starts at `beats_per_bar`,
/// so earlier numbers have no offset.
pub fn beat_to_offset(beat: u32, ts: TimeSignature) -> Option<f64> {
    beat.checked_sub(ts.beats_per_bar())
        .map(|b| b as f64 * FULL_BEAT_WIDTH)
}

/// Ruler label for a beat index, as `bar.beat`
pub fn beat_label(index: u32, ts: TimeSignature) -> String {
    let per_bar = ts.beats_per_bar();
    format!("{}.{}", index / per_bar, index % per_bar + 1)
}

// ═══════════════════════════════════════════════════════════════════════════════
// REAL TIME ↔ UNITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Units the playhead covers per second of playback
#[inline]
pub fn units_per_second(bpm: Bpm) -> f64 {
    bpm.beats_per_second() * FULL_BEAT_WIDTH
}

/// Timeline width of a clip lasting `duration_secs` at `bpm`
#[inline]
pub fn track_width(duration_secs: f64, bpm: Bpm) -> f64 {
    bpm.as_f64() * (duration_secs / 60.0) * FULL_BEAT_WIDTH
}

/// Convert a unit distance to seconds at `bpm`
#[inline]
pub fn units_to_seconds(units: f64, bpm: Bpm) -> f64 {
    units / units_per_second(bpm)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPPING
// ═══════════════════════════════════════════════════════════════════════════════

/// Snap down to the quarter-beat grid, never below zero
#[inline]
pub fn snap_to_grid(x: f64) -> f64 {
    let x = x.max(0.0);
    x - x % SNAP_UNIT
}

/// Snap down to a whole-beat boundary
#[inline]
pub fn snap_to_beat(x: f64) -> f64 {
    x - x % FULL_BEAT_WIDTH
}

/// True when `x` lies on the quarter-beat grid
#[inline]
pub fn is_on_grid(x: f64) -> bool {
    x % SNAP_UNIT == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beat_spacing_quarter_meters() {
        for ts in TimeSignature::ALL {
            assert_eq!(beat_spacing(ts), 50.0);
            assert_eq!(beat_marker_width(ts), 10.0);
            assert_eq!(beat_pitch(ts), FULL_BEAT_WIDTH);
        }
    }

    #[test]
    fn test_number_of_beats_default() {
        assert_eq!(number_of_beats(None, TimeSignature::FourFour), 24);
        assert_eq!(number_of_beats(None, TimeSignature::ThreeFour), 24);
    }

    #[test]
    fn test_number_of_beats_bar_aligned() {
        // 480 units = 8 beats, + 10 lookahead + 4 = 22 → 20
        assert_eq!(number_of_beats(Some(480.0), TimeSignature::FourFour), 20);
        // 8 + 10 + 3 = 21 → 21
        assert_eq!(number_of_beats(Some(480.0), TimeSignature::ThreeFour), 21);
        // 8 + 10 + 5 = 23 → 20
        assert_eq!(number_of_beats(Some(480.0), TimeSignature::FiveFour), 20);

        for ts in TimeSignature::ALL {
            let n = number_of_beats(Some(1234.0), ts);
            assert_eq!(n % ts.beats_per_bar(), 0);
            assert!(n as f64 * FULL_BEAT_WIDTH > 1234.0);
        }
    }

    #[test]
    fn test_track_width_formula() {
        let bpm = Bpm::new(80).unwrap();
        // 3 s at 80 bpm = 4 beats
        assert!((track_width(3.0, bpm) - 240.0).abs() < 1e-9);
        assert!((units_to_seconds(240.0, bpm) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_track_width_monotone() {
        let mut prev = 0.0;
        for bpm in BPM_STEPS {
            let w = track_width(2.5, Bpm::new(bpm).unwrap());
            assert!(w > prev);
            prev = w;
        }

        let bpm = Bpm::default();
        assert!(track_width(2.0, bpm) < track_width(2.01, bpm));
    }

    const BPM_STEPS: [u32; 6] = [5, 20, 60, 80, 150, 200];

    #[test]
    fn test_timeline_end() {
        // 24 beats in 4/4: last boundary is beat 19
        assert_eq!(timeline_end(24, TimeSignature::FourFour), 19.0 * 60.0);
        assert_eq!(timeline_end(2, TimeSignature::FourFour), 0.0);
    }

    #[test]
    fn test_beat_to_offset() {
        assert_eq!(beat_to_offset(4, TimeSignature::FourFour), Some(0.0));
        assert_eq!(beat_to_offset(7, TimeSignature::FourFour), Some(180.0));
        assert_eq!(beat_to_offset(3, TimeSignature::FiveFour), None);
    }

    #[test]
    fn test_beat_label() {
        assert_eq!(beat_label(4, TimeSignature::FourFour), "1.1");
        assert_eq!(beat_label(6, TimeSignature::FourFour), "1.3");
        assert_eq!(beat_label(7, TimeSignature::ThreeFour), "2.2");
    }

    #[test]
    fn test_snapping() {
        assert_eq!(snap_to_grid(37.0), 30.0);
        assert_eq!(snap_to_grid(-5.0), 0.0);
        assert_eq!(snap_to_beat(119.9), 60.0);
        assert!(is_on_grid(45.0));
        assert!(!is_on_grid(46.0));
    }
}
