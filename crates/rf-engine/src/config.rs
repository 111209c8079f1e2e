//! Engine configuration
//!
//! Stored as JSON next to the project store. Every field has a default, so a
//! partial file only overrides what it names.

use std::f32::consts::TAU;
use std::fs;
use std::path::Path;

use rf_core::{RfError, RfResult, FULL_BEAT_WIDTH};
use rf_spatial::Position3D;
use serde::{Deserialize, Serialize};

/// Where idle speakers sit before their first segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestLayout {
    /// Circle radius around the listener
    pub radius: f32,
    /// Height of the circle and of the hand-off hub
    pub height: f32,
    /// Slots in a full turn
    pub slots: u32,
}

impl Default for RestLayout {
    fn default() -> Self {
        Self {
            radius: 1.0,
            height: 13.0,
            slots: 10,
        }
    }
}

impl RestLayout {
    /// Rest position for a layout index
    pub fn position(&self, layout_index: u32) -> Position3D {
        let slots = self.slots.max(1);
        let angle = TAU * (layout_index % slots) as f32 / slots as f32;
        Position3D::new(angle.cos() * self.radius, self.height, angle.sin() * self.radius)
    }

    /// Source a segment starts from when nothing precedes it
    pub fn hub(&self) -> Position3D {
        Position3D::new(0.0, self.height, 0.0)
    }
}

/// Playback engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Late-trigger window after a clip start, in units
    pub trigger_tolerance: f64,
    /// Worker threads for position cache rebuilds
    pub cache_workers: usize,
    /// Units cached past the timeline end
    pub cache_headroom: f64,
    pub rest: RestLayout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trigger_tolerance: 2.0,
            cache_workers: num_cpus::get().saturating_sub(1).max(1),
            cache_headroom: FULL_BEAT_WIDTH * 4.0,
            rest: RestLayout::default(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> RfResult<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No engine config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RfError::Serialization(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> RfResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RfError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> RfResult<()> {
        if !(self.trigger_tolerance.is_finite() && self.trigger_tolerance >= 0.0) {
            return Err(RfError::InvalidParam(format!(
                "trigger tolerance {}",
                self.trigger_tolerance
            )));
        }
        if !(self.cache_headroom.is_finite() && self.cache_headroom >= 0.0) {
            return Err(RfError::InvalidParam(format!("cache headroom {}", self.cache_headroom)));
        }
        if self.cache_workers == 0 {
            return Err(RfError::InvalidParam("cache workers must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rest_layout_slots() {
        let rest = RestLayout::default();
        let first = rest.position(0);
        assert_relative_eq!(first.x, 1.0);
        assert_relative_eq!(first.y, 13.0);
        assert_relative_eq!(first.z, 0.0);

        let half = rest.position(5);
        assert_relative_eq!(half.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(half.z, 0.0, epsilon = 1e-5);

        assert_eq!(rest.position(12), rest.position(2));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_from(dir.path().join("engine.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "trigger_tolerance": 4.0, "rest": { "height": 10.0 } }"#).unwrap();

        let config = EngineConfig::load_from(&path).unwrap();
        assert_eq!(config.trigger_tolerance, 4.0);
        assert_eq!(config.rest.height, 10.0);
        assert_eq!(config.rest.radius, 1.0);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, "{ trigger").unwrap();
        assert!(EngineConfig::load_from(&path).is_err());

        fs::write(&path, r#"{ "cache_workers": 0 }"#).unwrap();
        assert!(EngineConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.json");
        let config = EngineConfig {
            cache_workers: 3,
            ..EngineConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(EngineConfig::load_from(&path).unwrap(), config);
    }
}
