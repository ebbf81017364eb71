//! Values handed from the master clock to player groups.

use crate::fence::Generation;

/// Passed to every player group on a synchronized start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncInfo {
    /// Logical offset each group seeks its media to.
    pub master_time: f64,
    /// Engine time at which playback must become audible.
    pub engine_clock_time: f64,
    pub generation: Generation,
}

/// Clock reading used for mid-stream joins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSnapshot {
    pub logical_time: f64,
    pub engine_time: f64,
    /// `tempo / original tempo`
    pub tempo_ratio: f64,
    pub generation: Generation,
    pub is_playing: bool,
}

impl ClockSnapshot {
    /// Logical time that will be current `lookahead` engine seconds from now.
    pub fn logical_time_after(&self, lookahead: f64) -> f64 {
        self.logical_time + lookahead * self.tempo_ratio
    }
}
