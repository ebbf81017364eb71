//! Loop mode and AB markers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    #[default]
    Off,
    /// Jump back to zero at the end of the effective duration.
    Repeat,
    /// Jump back to marker A when marker B is crossed.
    AbRange,
}

/// Loop settings in logical seconds.
///
/// Markers are stored exactly as given; ordering them is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoopConfig {
    pub mode: LoopMode,
    pub marker_a: Option<f64>,
    pub marker_b: Option<f64>,
}

impl LoopConfig {
    pub const fn new(mode: LoopMode, marker_a: Option<f64>, marker_b: Option<f64>) -> Self {
        Self {
            mode,
            marker_a,
            marker_b,
        }
    }

    #[inline]
    pub fn repeats(&self) -> bool {
        self.mode == LoopMode::Repeat
    }

    /// `(a, b)` when AB looping is active. Requires marker B; a missing A means 0.
    pub fn ab_range(&self) -> Option<(f64, f64)> {
        match (self.mode, self.marker_b) {
            (LoopMode::AbRange, Some(b)) => Some((self.marker_a.unwrap_or(0.0), b)),
            _ => None,
        }
    }

    /// Both markers are set and A comes after B.
    pub fn markers_inverted(&self) -> bool {
        matches!((self.marker_a, self.marker_b), (Some(a), Some(b)) if a > b)
    }
}
