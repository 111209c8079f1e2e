//! Random jitter motion
//!
//! The segment is split into `frequency` equal sub-periods. During the first
//! unit of each sub-period a new point is drawn; otherwise the last point is
//! held. Each sub-period draws from its own ChaCha stream keyed by the segment
//! seed, so the same offset always yields the same point no matter where a
//! rebuild started.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::motion::{check_range, Progress};
use crate::{Position3D, SpatialResult};

/// Minimum distance between an emitted point and the listener
pub const LISTENER_EXCLUSION_RADIUS: f32 = 7.0;

/// Width of the window at the start of a sub-period in which a new point is drawn
const TRIGGER_WINDOW: f64 = 1.0;

const MAX_SAMPLE_ATTEMPTS: usize = 64;

/// Random jitter inside a cube around the listener
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomParams {
    /// Half-width of the sampling cube
    pub radius: f32,
    /// New points per segment
    pub frequency: u32,
    /// Stream seed; fixed when the segment is created
    #[serde(default)]
    pub seed: u64,
}

impl RandomParams {
    pub fn new(radius: f32, frequency: u32, seed: u64) -> SpatialResult<Self> {
        let params = Self { radius, frequency, seed };
        params.validate()?;
        Ok(params)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            radius: 24.0,
            frequency: 10,
            seed,
        }
    }

    pub fn validate(&self) -> SpatialResult<()> {
        check_range("random", "radius", self.radius as f64, 10.0, 50.0)?;
        check_range("random", "frequency", self.frequency as f64, 1.0, 30.0)
    }

    /// Length of one sub-period for a segment of `length` units
    pub fn period(&self, length: f64) -> f64 {
        length / self.frequency as f64
    }

    pub(crate) fn evaluate(&self, progress: Progress, current: Position3D) -> Position3D {
        let period = self.period(progress.length);
        let index = (progress.elapsed / period).floor().max(0.0);
        let phase = progress.elapsed - index * period;

        if phase < TRIGGER_WINDOW {
            self.sample(index as u64)
        } else {
            current
        }
    }

    /// Point drawn at the start of sub-period `index`
    pub fn sample(&self, index: u64) -> Position3D {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let r = self.radius;

        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let point = Position3D::new(
                rng.random_range(-r..=r),
                rng.random_range(0.0..=r / 2.0),
                rng.random_range(-r..=r),
            );
            if point.magnitude() >= LISTENER_EXCLUSION_RADIUS {
                return point;
            }
        }

        log::debug!(
            "Random sampling exhausted for seed {} period {}, using cube corner",
            self.seed,
            index
        );
        Position3D::new(r, 0.0, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RandomParams {
        RandomParams::new(24.0, 10, 42).unwrap()
    }

    #[test]
    fn test_holds_between_triggers() {
        let p = params();
        let held = Position3D::new(1.0, 2.0, 3.0);
        assert_eq!(p.evaluate(Progress::new(50.0, 2160.0), held), held);
        assert_ne!(p.evaluate(Progress::new(216.0, 2160.0), held), held);
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let p = params();
        assert_eq!(p.sample(3), p.sample(3));
        assert_ne!(p.sample(3), p.sample(4));

        let other_seed = RandomParams::new(24.0, 10, 43).unwrap();
        assert_ne!(p.sample(3), other_seed.sample(3));
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let p = params();
        for index in 0..500 {
            let point = p.sample(index);
            assert!(point.x.abs() <= 24.0 && point.z.abs() <= 24.0);
            assert!((0.0..=12.0).contains(&point.y));
            assert!(point.magnitude() >= LISTENER_EXCLUSION_RADIUS);
        }
    }

    #[test]
    fn test_radius_must_clear_listener() {
        assert!(RandomParams::new(5.0, 10, 0).is_err());
        assert!(RandomParams::new(24.0, 0, 0).is_err());
        assert!(RandomParams::new(24.0, 31, 0).is_err());
    }
}
