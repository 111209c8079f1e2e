//! Audio clips placed on a node's timeline

use std::fmt;
use std::path::{Path, PathBuf};

use rf_core::{track_width, Bpm, RfError, RfResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique clip identifier; also names the imported asset file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Imported audio file placed at a timeline offset.
///
/// The duration is fixed at import; only the start (and owning node) move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub id: ClipId,
    /// Display name of the source file
    pub file_name: String,
    /// File extension without the dot
    pub extension: String,
    /// Start offset in timeline units
    pub start: f64,
    duration_secs: f64,
}

impl AudioClip {
    pub fn new(
        file_name: impl Into<String>,
        extension: impl Into<String>,
        start: f64,
        duration_secs: f64,
    ) -> RfResult<Self> {
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(RfError::InvalidParam(format!(
                "clip duration must be positive, got {duration_secs}"
            )));
        }
        if !(start.is_finite() && start >= 0.0) {
            return Err(RfError::InvalidParam(format!(
                "clip start must be non-negative, got {start}"
            )));
        }
        Ok(Self {
            id: ClipId::new(),
            file_name: file_name.into(),
            extension: extension.into(),
            start,
            duration_secs,
        })
    }

    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Timeline width at `bpm`
    #[inline]
    pub fn width(&self, bpm: Bpm) -> f64 {
        track_width(self.duration_secs, bpm)
    }

    #[inline]
    pub fn end(&self, bpm: Bpm) -> f64 {
        self.start + self.width(bpm)
    }

    /// True when `offset` lies in `[start, end)`
    pub fn contains(&self, offset: f64, bpm: Bpm) -> bool {
        offset >= self.start && offset < self.end(bpm)
    }

    /// Seconds into the file that correspond to `offset`
    pub fn seek_secs(&self, offset: f64, bpm: Bpm) -> f64 {
        (offset - self.start) / self.width(bpm) * self.duration_secs
    }

    /// True when `other` starts earlier and is still playing at our start
    pub fn is_obstructed_by(&self, other: &AudioClip, bpm: Bpm) -> bool {
        other.id != self.id && other.start < self.start && other.end(bpm) > self.start
    }

    /// Location of the imported copy inside `assets_dir`
    pub fn asset_path(&self, assets_dir: &Path) -> PathBuf {
        assets_dir.join(format!("{}.{}", self.id, self.extension))
    }

    /// Re-check a clip that bypassed the constructor (deserialized)
    pub fn validate(&self) -> RfResult<()> {
        if self.duration_secs.is_finite() && self.duration_secs > 0.0 && self.start.is_finite() && self.start >= 0.0 {
            Ok(())
        } else {
            Err(RfError::InvalidParam(format!("clip {} has an invalid span", self.id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_follows_tempo() {
        let clip = AudioClip::new("Bass", "mp3", 0.0, 3.0).unwrap();
        let slow = clip.width(Bpm::new(80).unwrap());
        let fast = clip.width(Bpm::new(160).unwrap());
        assert!((slow - 240.0).abs() < 1e-9);
        assert!((fast - 480.0).abs() < 1e-9);
        assert_eq!(clip.duration_secs(), 3.0);
    }

    #[test]
    fn test_seek_secs() {
        let clip = AudioClip::new("Bass", "mp3", 240.0, 3.0).unwrap();
        let bpm = Bpm::new(80).unwrap();
        assert!((clip.seek_secs(360.0, bpm) - 1.5).abs() < 1e-9);
        assert!(clip.contains(240.0, bpm));
        assert!(!clip.contains(480.0, bpm));
    }

    #[test]
    fn test_rejects_bad_duration() {
        assert!(AudioClip::new("x", "wav", 0.0, 0.0).is_err());
        assert!(AudioClip::new("x", "wav", -1.0, 2.0).is_err());
    }

    #[test]
    fn test_asset_path_uses_id() {
        let clip = AudioClip::new("Piano", "mp3", 0.0, 1.0).unwrap();
        let path = clip.asset_path(Path::new("/tmp/assets"));
        assert_eq!(path, PathBuf::from(format!("/tmp/assets/{}.mp3", clip.id)));
    }
}
