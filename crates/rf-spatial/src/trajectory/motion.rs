//! Motion kinds and their evaluators

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::random::RandomParams;
use crate::{Position3D, SpatialError, SpatialResult};

/// Vertical wobble cycles per orbit/spiral segment
const HEIGHT_MODULATION_CYCLES: f64 = 5.0;

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Where the playhead sits inside a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Units since the segment start
    pub elapsed: f64,
    /// Segment length in units
    pub length: f64,
}

impl Progress {
    pub fn new(elapsed: f64, length: f64) -> Self {
        debug_assert!(length > 0.0, "segment length must be positive");
        Self { elapsed, length }
    }

    /// Elapsed fraction of the segment
    #[inline]
    pub fn t(&self) -> f64 {
        self.elapsed / self.length
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn check_range(
    kind: &'static str,
    name: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> SpatialResult<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SpatialError::ParamOutOfRange { kind, name, value, min, max })
    }
}

/// Straight-line move to a fixed destination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveParams {
    pub destination: Position3D,
    /// Glide from the hand-off position; `false` jumps at segment start
    #[serde(default = "default_interpolate")]
    pub interpolate: bool,
}

fn default_interpolate() -> bool {
    true
}

impl MoveParams {
    pub fn new(destination: Position3D, interpolate: bool) -> SpatialResult<Self> {
        let params = Self { destination, interpolate };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SpatialResult<()> {
        let d = self.destination;
        check_range("move", "x", d.x as f64, -50.0, 50.0)?;
        check_range("move", "y", d.y as f64, 0.0, 50.0)?;
        check_range("move", "z", d.z as f64, -50.0, 50.0)
    }
}

impl Default for MoveParams {
    fn default() -> Self {
        Self {
            destination: Position3D::new(0.0, 10.0, 30.0),
            interpolate: true,
        }
    }
}

/// Circular path around the listener
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitParams {
    pub radius: f32,
    pub height: f32,
    /// Full turns over the segment
    pub revolutions: f32,
    /// Amplitude of the vertical wobble
    #[serde(default)]
    pub height_modulation: f32,
}

impl OrbitParams {
    pub fn new(radius: f32, height: f32, revolutions: f32, height_modulation: f32) -> SpatialResult<Self> {
        let params = Self { radius, height, revolutions, height_modulation };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SpatialResult<()> {
        check_range("orbit", "radius", self.radius as f64, 0.0, 50.0)?;
        check_range("orbit", "height", self.height as f64, 0.0, 50.0)?;
        check_range("orbit", "revolutions", self.revolutions as f64, 1.0, 10.0)?;
        check_range("orbit", "height_modulation", self.height_modulation as f64, 0.0, 20.0)
    }
}

impl Default for OrbitParams {
    fn default() -> Self {
        Self {
            radius: 30.0,
            height: 30.0,
            revolutions: 1.0,
            height_modulation: 5.0,
        }
    }
}

/// Orbit whose radius collapses to zero while the height ramps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpiralParams {
    pub radius: f32,
    pub height_start: f32,
    pub height_end: f32,
    pub revolutions: f32,
}

impl SpiralParams {
    pub fn new(radius: f32, height_start: f32, height_end: f32, revolutions: f32) -> SpatialResult<Self> {
        let params = Self { radius, height_start, height_end, revolutions };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SpatialResult<()> {
        check_range("spiral", "radius", self.radius as f64, 0.0, 50.0)?;
        check_range("spiral", "height_start", self.height_start as f64, 0.0, 50.0)?;
        check_range("spiral", "height_end", self.height_end as f64, 0.0, 50.0)?;
        check_range("spiral", "revolutions", self.revolutions as f64, 1.0, 10.0)
    }
}

impl Default for SpiralParams {
    fn default() -> Self {
        Self {
            radius: 40.0,
            height_start: 0.0,
            height_end: 40.0,
            revolutions: 3.0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Motion kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    Move,
    Orbit,
    Spiral,
    Random,
}

impl MotionKind {
    pub const ALL: [MotionKind; 4] = [Self::Move, Self::Orbit, Self::Spiral, Self::Random];

    pub fn name(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Orbit => "orbit",
            Self::Spiral => "spiral",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for MotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MotionKind {
    type Err = SpatialError;

    fn from_str(s: &str) -> SpatialResult<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SpatialError::UnknownKind(s.to_string()))
    }
}

/// A motion rule with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Motion {
    Move(MoveParams),
    Orbit(OrbitParams),
    Spiral(SpiralParams),
    Random(RandomParams),
}

impl Motion {
    /// Default parameters for `kind`. Random motion draws a fresh seed.
    pub fn default_for(kind: MotionKind) -> Self {
        match kind {
            MotionKind::Move => Self::Move(MoveParams::default()),
            MotionKind::Orbit => Self::Orbit(OrbitParams::default()),
            MotionKind::Spiral => Self::Spiral(SpiralParams::default()),
            MotionKind::Random => Self::Random(RandomParams::with_seed(rand::random())),
        }
    }

    pub fn kind(&self) -> MotionKind {
        match self {
            Self::Move(_) => MotionKind::Move,
            Self::Orbit(_) => MotionKind::Orbit,
            Self::Spiral(_) => MotionKind::Spiral,
            Self::Random(_) => MotionKind::Random,
        }
    }

    pub fn validate(&self) -> SpatialResult<()> {
        match self {
            Self::Move(p) => p.validate(),
            Self::Orbit(p) => p.validate(),
            Self::Spiral(p) => p.validate(),
            Self::Random(p) => p.validate(),
        }
    }

    /// Position at `progress`.
    ///
    /// `source` is the hand-off position the segment starts from; `current`
    /// is the last emitted position, held by Random between triggers.
    pub fn evaluate(&self, progress: Progress, source: Position3D, current: Position3D) -> Position3D {
        let t = progress.t();
        match self {
            Self::Move(p) => {
                if p.interpolate {
                    source.lerp(&p.destination, t as f32)
                } else {
                    p.destination
                }
            }
            Self::Orbit(p) => orbit_point(
                t,
                p.revolutions as f64,
                p.radius as f64,
                p.height as f64,
                p.height_modulation as f64,
            ),
            Self::Spiral(p) => {
                let radius = p.radius as f64 * (1.0 - t);
                let height = p.height_start as f64 + (p.height_end - p.height_start) as f64 * t;
                orbit_point(t, p.revolutions as f64, radius, height, 0.0)
            }
            Self::Random(p) => p.evaluate(progress, current),
        }
    }

    /// Resting point once the segment has finished
    pub fn end_position(&self) -> Position3D {
        match self {
            Self::Move(p) => p.destination,
            Self::Orbit(p) => Position3D::new(0.0, p.height, 0.0),
            Self::Spiral(p) => Position3D::new(0.0, p.height_end, 0.0),
            Self::Random(p) => Position3D::new(0.0, p.radius / 2.0, 0.0),
        }
    }
}

fn orbit_point(t: f64, revolutions: f64, radius: f64, height: f64, modulation: f64) -> Position3D {
    let angle = revolutions * t * TAU - FRAC_PI_2;
    let wobble = (t * 2.0 * HEIGHT_MODULATION_CYCLES * PI - FRAC_PI_2).sin() * modulation;
    Position3D::new(
        (angle.cos() * radius) as f32,
        (height + wobble) as f32,
        (angle.sin() * radius) as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_move_interpolates_from_source() {
        let motion = Motion::Move(MoveParams::new(Position3D::new(10.0, 10.0, 10.0), true).unwrap());
        let p = motion.evaluate(Progress::new(120.0, 240.0), Position3D::origin(), Position3D::origin());
        assert_relative_eq!(p.x, 5.0);
        assert_relative_eq!(p.y, 5.0);
        assert_relative_eq!(p.z, 5.0);
    }

    #[test]
    fn test_move_without_interpolation_jumps() {
        let dest = Position3D::new(-27.0, 7.0, 50.0);
        let motion = Motion::Move(MoveParams::new(dest, false).unwrap());
        for elapsed in [0.0, 1.0, 119.5, 239.0] {
            let p = motion.evaluate(Progress::new(elapsed, 240.0), Position3D::new(3.0, 3.0, 3.0), Position3D::origin());
            assert_eq!(p, dest);
        }
    }

    #[test]
    fn test_orbit_quarter_turn() {
        let motion = Motion::Orbit(OrbitParams::new(30.0, 30.0, 1.0, 0.0).unwrap());
        let start = motion.evaluate(Progress::new(0.0, 960.0), Position3D::origin(), Position3D::origin());
        assert_relative_eq!(start.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(start.y, 30.0, epsilon = 1e-4);
        assert_relative_eq!(start.z, -30.0, epsilon = 1e-4);

        let quarter = motion.evaluate(Progress::new(240.0, 960.0), Position3D::origin(), Position3D::origin());
        assert_relative_eq!(quarter.x, 30.0, epsilon = 1e-4);
        assert_relative_eq!(quarter.y, 30.0, epsilon = 1e-4);
        assert_relative_eq!(quarter.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_orbit_height_modulation() {
        let motion = Motion::Orbit(OrbitParams::new(30.0, 20.0, 1.0, 5.0).unwrap());
        // sin(-π/2) at t = 0 pulls the wobble fully down
        let p = motion.evaluate(Progress::new(0.0, 960.0), Position3D::origin(), Position3D::origin());
        assert_relative_eq!(p.y, 15.0, epsilon = 1e-4);
        // one wobble cycle is a fifth of the segment; half a cycle is the peak
        let p = motion.evaluate(Progress::new(96.0, 960.0), Position3D::origin(), Position3D::origin());
        assert_relative_eq!(p.y, 25.0, epsilon = 1e-4);
    }

    #[test]
    fn test_spiral_collapses_and_climbs() {
        let motion = Motion::Spiral(SpiralParams::new(40.0, 0.0, 40.0, 3.0).unwrap());
        let half = motion.evaluate(Progress::new(480.0, 960.0), Position3D::origin(), Position3D::origin());
        assert_relative_eq!((half.x * half.x + half.z * half.z).sqrt(), 20.0, epsilon = 1e-3);
        assert_relative_eq!(half.y, 20.0, epsilon = 1e-4);

        let end = motion.evaluate(Progress::new(960.0, 960.0), Position3D::origin(), Position3D::origin());
        assert_relative_eq!(end.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(end.z, 0.0, epsilon = 1e-4);
        assert_eq!(motion.end_position(), Position3D::new(0.0, 40.0, 0.0));
    }

    #[test]
    fn test_end_positions() {
        let orbit = Motion::Orbit(OrbitParams::default());
        assert_eq!(orbit.end_position(), Position3D::new(0.0, 30.0, 0.0));

        let random = Motion::Random(RandomParams::new(24.0, 10, 1).unwrap());
        assert_eq!(random.end_position(), Position3D::new(0.0, 12.0, 0.0));
    }

    #[test]
    fn test_param_validation() {
        assert!(OrbitParams::new(30.0, 30.0, 0.0, 0.0).is_err());
        assert!(OrbitParams::new(30.0, 30.0, 1.0, 25.0).is_err());
        assert!(SpiralParams::new(60.0, 0.0, 10.0, 1.0).is_err());
        assert!(MoveParams::new(Position3D::new(0.0, -1.0, 0.0), true).is_err());
        assert!(MoveParams::new(Position3D::new(f32::NAN, 0.0, 0.0), true).is_err());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("Orbit".parse::<MotionKind>().unwrap(), MotionKind::Orbit);
        assert!("wiggle".parse::<MotionKind>().is_err());
        assert_eq!(Motion::default_for(MotionKind::Random).kind(), MotionKind::Random);
    }

    #[test]
    fn test_serde_tagged() {
        let motion = Motion::Orbit(OrbitParams::default());
        let json = serde_json::to_string(&motion).unwrap();
        assert!(json.contains("\"kind\":\"orbit\""));
        let back: Motion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, motion);
    }
}
