//! Tempo and Time Signature
//!
//! Projects carry a single integer tempo and one of a fixed set of meters:
//! - `Bpm`: beats per minute, validated to `MIN_BPM..=MAX_BPM`
//! - `TimeSignature`: 3/4, 4/4 or 5/4 (the beat unit is always a quarter)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{RfError, RfResult};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimum tempo
pub const MIN_BPM: u32 = 5;

/// Maximum tempo
pub const MAX_BPM: u32 = 200;

/// Tempo of a freshly created project
pub const DEFAULT_BPM: u32 = 80;

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPO
// ═══════════════════════════════════════════════════════════════════════════════

/// Validated tempo in beats per minute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Bpm(u32);

impl Bpm {
    pub fn new(bpm: u32) -> RfResult<Self> {
        if (MIN_BPM..=MAX_BPM).contains(&bpm) {
            Ok(Self(bpm))
        } else {
            Err(RfError::InvalidTempo(bpm))
        }
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    /// Beats elapsed per second of wall time
    #[inline]
    pub fn beats_per_second(self) -> f64 {
        self.as_f64() / 60.0
    }
}

impl Default for Bpm {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl TryFrom<u32> for Bpm {
    type Error = RfError;

    fn try_from(value: u32) -> RfResult<Self> {
        Self::new(value)
    }
}

impl From<Bpm> for u32 {
    fn from(bpm: Bpm) -> Self {
        bpm.0
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TIME SIGNATURE
// ═══════════════════════════════════════════════════════════════════════════════

/// Time signature (beats per bar × beat unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSignature {
    #[serde(rename = "3/4")]
    ThreeFour,
    #[serde(rename = "4/4")]
    FourFour,
    #[serde(rename = "5/4")]
    FiveFour,
}

impl TimeSignature {
    /// Every supported signature, in menu order
    pub const ALL: [TimeSignature; 3] = [Self::ThreeFour, Self::FourFour, Self::FiveFour];

    /// Numerator (beats per bar)
    #[inline]
    pub fn beats_per_bar(self) -> u32 {
        match self {
            Self::ThreeFour => 3,
            Self::FourFour => 4,
            Self::FiveFour => 5,
        }
    }

    /// Denominator (note value that gets one beat)
    #[inline]
    pub fn beat_unit(self) -> u32 {
        4
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::FourFour
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_bar(), self.beat_unit())
    }
}

impl FromStr for TimeSignature {
    type Err = RfError;

    fn from_str(s: &str) -> RfResult<Self> {
        Self::ALL
            .into_iter()
            .find(|ts| ts.to_string() == s.trim())
            .ok_or_else(|| RfError::InvalidTimeSignature(s.to_string()))
    }
}
