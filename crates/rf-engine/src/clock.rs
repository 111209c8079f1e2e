//! Playhead clock
//!
//! While playing, the offset is derived from wall time since the last start:
//! `offset = start_offset + bpm / 60 · FULL_BEAT_WIDTH · elapsed`. Nothing is
//! accumulated per tick, so irregular tick rates do not drift.

use std::time::Instant;

use rf_core::{beat_to_offset, snap_to_beat, units_per_second, Bpm, RfError, RfResult, TimeSignature, FULL_BEAT_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    wall: Instant,
    offset: f64,
}

/// Result of advancing the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    pub offset: f64,
    /// The playhead reached the timeline end and stopped
    pub auto_paused: bool,
}

#[derive(Debug, Clone)]
pub struct PlayheadClock {
    bpm: Bpm,
    time_signature: TimeSignature,
    offset: f64,
    /// Set while playing
    anchor: Option<Anchor>,
    /// Playback stops here
    end: f64,
}

impl PlayheadClock {
    pub fn new(bpm: Bpm, time_signature: TimeSignature, end: f64) -> Self {
        Self {
            bpm,
            time_signature,
            offset: 0.0,
            anchor: None,
            end,
        }
    }

    // ─── State ───────────────────────────────────────────────────────────

    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.anchor.is_some()
    }

    #[inline]
    pub fn is_at_zero(&self) -> bool {
        self.offset == 0.0
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn bpm(&self) -> Bpm {
        self.bpm
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn set_end(&mut self, end: f64) {
        self.end = end;
    }

    fn ensure_paused(&self, action: &'static str) -> RfResult<()> {
        if self.is_playing() {
            return Err(RfError::PlaybackActive(action));
        }
        Ok(())
    }

    pub fn set_bpm(&mut self, bpm: Bpm) -> RfResult<()> {
        self.ensure_paused("change tempo")?;
        self.bpm = bpm;
        Ok(())
    }

    pub fn set_time_signature(&mut self, ts: TimeSignature) -> RfResult<()> {
        self.ensure_paused("change time signature")?;
        self.time_signature = ts;
        Ok(())
    }

    // ─── Transport ───────────────────────────────────────────────────────

    /// Start or stop. Returns true when now playing.
    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(now);
        }
        self.is_playing()
    }

    pub fn play(&mut self, now: Instant) {
        if self.anchor.is_none() {
            self.anchor = Some(Anchor {
                wall: now,
                offset: self.offset,
            });
        }
    }

    /// Stop advancing; the offset keeps its last ticked value
    pub fn pause(&mut self) {
        self.anchor = None;
    }

    /// Advance to `now`. Reaching the end clamps the offset and pauses.
    pub fn tick(&mut self, now: Instant) -> ClockTick {
        let Some(anchor) = self.anchor else {
            return ClockTick {
                offset: self.offset,
                auto_paused: false,
            };
        };

        let elapsed = now.saturating_duration_since(anchor.wall).as_secs_f64();
        self.offset = anchor.offset + units_per_second(self.bpm) * elapsed;

        let auto_paused = self.offset >= self.end;
        if auto_paused {
            self.offset = self.end.max(anchor.offset);
            self.pause();
        }
        ClockTick {
            offset: self.offset,
            auto_paused,
        }
    }

    // ─── Seeking (paused only) ───────────────────────────────────────────

    /// One beat forward, snapped down to a beat boundary, never past the end
    pub fn jump_forward(&mut self) -> RfResult<f64> {
        self.ensure_paused("jump")?;
        self.offset = snap_to_beat(self.offset + FULL_BEAT_WIDTH).min(self.end);
        Ok(self.offset)
    }

    /// One beat back, snapped down to a beat boundary, never below zero
    pub fn jump_backward(&mut self) -> RfResult<f64> {
        self.ensure_paused("jump")?;
        let mut offset = self.offset;
        if offset >= FULL_BEAT_WIDTH {
            offset -= FULL_BEAT_WIDTH;
        }
        self.offset = snap_to_beat(offset);
        Ok(self.offset)
    }

    /// Jump to a ruler beat number. Beats past the timeline end are rejected.
    pub fn jump_to(&mut self, beat: u32) -> RfResult<f64> {
        self.ensure_paused("jump")?;
        let offset = beat_to_offset(beat, self.time_signature).ok_or_else(|| {
            RfError::InvalidParam(format!(
                "beat {beat} precedes the first ruler beat {}",
                self.time_signature.beats_per_bar()
            ))
        })?;
        if offset > self.end {
            return Err(RfError::InvalidParam(format!(
                "beat {beat} lies past the timeline end {:.0}",
                self.end
            )));
        }
        self.offset = offset;
        Ok(offset)
    }

    /// Place the playhead at an arbitrary offset (scrubbing), clamped to
    /// `0..=end`
    pub fn seek(&mut self, offset: f64) -> RfResult<f64> {
        self.ensure_paused("seek")?;
        if !offset.is_finite() {
            return Err(RfError::InvalidParam(format!("seek offset {offset}")));
        }
        self.offset = offset.max(0.0).min(self.end);
        Ok(self.offset)
    }

    /// Back to zero. While playing, playback continues from zero.
    pub fn revert(&mut self, now: Instant) {
        self.offset = 0.0;
        if self.anchor.is_some() {
            self.anchor = Some(Anchor { wall: now, offset: 0.0 });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn clock() -> PlayheadClock {
        PlayheadClock::new(Bpm::new(80).unwrap(), TimeSignature::FourFour, 10_000.0)
    }

    #[test]
    fn test_tick_rate() {
        let mut clock = clock();
        let t0 = Instant::now();
        assert!(clock.toggle(t0));
        let tick = clock.tick(t0 + Duration::from_secs(3));
        // 80 bpm: 80 units per second
        assert_relative_eq!(tick.offset, 240.0, epsilon = 1e-9);
        assert!(!tick.auto_paused);

        assert!(!clock.toggle(t0 + Duration::from_secs(4)));
        let later = clock.tick(t0 + Duration::from_secs(10));
        assert_relative_eq!(later.offset, 240.0, epsilon = 1e-9);
    }

    #[test]
    fn test_resume_continues_from_pause() {
        let mut clock = clock();
        let t0 = Instant::now();
        clock.play(t0);
        clock.tick(t0 + Duration::from_secs(1));
        clock.pause();
        clock.play(t0 + Duration::from_secs(5));
        let tick = clock.tick(t0 + Duration::from_secs(6));
        assert_relative_eq!(tick.offset, 160.0, epsilon = 1e-9);
    }

    #[test]
    fn test_auto_pause_at_end() {
        let mut clock = PlayheadClock::new(Bpm::new(60).unwrap(), TimeSignature::FourFour, 120.0);
        let t0 = Instant::now();
        clock.play(t0);
        let tick = clock.tick(t0 + Duration::from_secs(5));
        assert!(tick.auto_paused);
        assert_eq!(tick.offset, 120.0);
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_jumps_snap_to_beats() {
        let mut clock = clock();
        clock.seek(75.0).unwrap();
        assert_eq!(clock.jump_forward().unwrap(), 120.0);
        assert_eq!(clock.jump_backward().unwrap(), 60.0);
        clock.seek(30.0).unwrap();
        assert_eq!(clock.jump_backward().unwrap(), 0.0);
        assert_eq!(clock.jump_backward().unwrap(), 0.0);
    }

    #[test]
    fn test_jump_to_beat() {
        let mut clock = clock();
        assert_eq!(clock.jump_to(4).unwrap(), 0.0);
        assert_eq!(clock.jump_to(9).unwrap(), 300.0);
        assert!(clock.jump_to(2).is_err());

        clock.set_time_signature(TimeSignature::ThreeFour).unwrap();
        assert_eq!(clock.jump_to(9).unwrap(), 360.0);
    }

    #[test]
    fn test_moves_stay_inside_timeline() {
        let mut clock = PlayheadClock::new(Bpm::new(80).unwrap(), TimeSignature::FourFour, 1140.0);
        assert_eq!(clock.jump_to(23).unwrap(), 1140.0);
        assert!(matches!(clock.jump_to(24), Err(RfError::InvalidParam(_))));
        assert!(matches!(clock.jump_to(u32::MAX), Err(RfError::InvalidParam(_))));
        assert_eq!(clock.offset(), 1140.0);

        assert_eq!(clock.jump_forward().unwrap(), 1140.0);
        assert_eq!(clock.seek(1.0e12).unwrap(), 1140.0);
        assert_eq!(clock.seek(-5.0).unwrap(), 0.0);
    }

    #[test]
    fn test_seeking_requires_pause() {
        let mut clock = clock();
        clock.play(Instant::now());
        assert!(matches!(clock.jump_forward(), Err(RfError::PlaybackActive(_))));
        assert!(matches!(clock.jump_to(5), Err(RfError::PlaybackActive(_))));
        assert!(clock.set_bpm(Bpm::new(120).unwrap()).is_err());
        assert_eq!(clock.bpm().get(), 80);
    }

    #[test]
    fn test_revert_while_playing_restarts_from_zero() {
        let mut clock = clock();
        let t0 = Instant::now();
        clock.play(t0);
        clock.tick(t0 + Duration::from_secs(2));
        clock.revert(t0 + Duration::from_secs(2));
        assert!(clock.is_at_zero());
        let tick = clock.tick(t0 + Duration::from_secs(3));
        assert_relative_eq!(tick.offset, 80.0, epsilon = 1e-9);
    }
}
