//! rf-core: Shared types and unit rules for the speaker choreography engine
//!
//! This crate provides the foundational types used across all rf-* crates:
//! - `RfError` / `RfResult`
//! - `Bpm` and `TimeSignature` (validated musical domains)
//! - Timeline unit conversion (beat spacing, beat counts, track widths, snapping)

mod error;
mod tempo;
mod units;

pub use error::*;
pub use tempo::*;
pub use units::*;
