//! Playback engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::time_stretch::AnalysisWindow;
use crate::{Error, Result};

/// Slowest tempo accepted by the clock.
pub const MIN_TEMPO_BPM: f64 = 20.0;
/// Fastest tempo accepted by the clock.
pub const MAX_TEMPO_BPM: f64 = 999.0;

/// Configuration for the playback synchronization engine.
///
/// Every field has a default, so a TOML file only needs the values it changes:
///
/// ```toml
/// original_tempo_bpm = 96.0
/// start_lookahead_sec = 0.08
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TandemConfig {
    /// Baseline tempo. The ratio `tempo / original` scales logical time.
    pub original_tempo_bpm: f64,
    /// Lookahead between `play()` and the audible start instant.
    pub start_lookahead_sec: f64,
    /// Lookahead used by atomic restarts (seek, tempo, loop jumps).
    pub seek_lookahead_sec: f64,
    /// Lookahead used when a single track joins mid-stream.
    pub join_lookahead_sec: f64,
    /// Minimum interval between two join attempts for the same track.
    pub late_join_throttle_ms: u64,
    /// Polling loop period.
    pub poll_interval_ms: u64,
    /// Readiness polling period while `play()` waits for decodes.
    pub ready_poll_interval_ms: u64,
    /// Upper bound on how long `play()` waits for readiness.
    pub ready_timeout_ms: u64,
    /// Note-trigger polyphony.
    pub max_voices: usize,
    /// Pitch-correction analysis window (drives reported chain latency).
    pub analysis_window: AnalysisWindow,
}

impl Default for TandemConfig {
    fn default() -> Self {
        Self {
            original_tempo_bpm: 120.0,
            start_lookahead_sec: 0.05,
            seek_lookahead_sec: 0.02,
            join_lookahead_sec: 0.03,
            late_join_throttle_ms: 250,
            poll_interval_ms: 16,
            ready_poll_interval_ms: 20,
            ready_timeout_ms: 5000,
            max_voices: 64,
            analysis_window: AnalysisWindow::default(),
        }
    }
}

impl TandemConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&self.original_tempo_bpm) {
            return Err(Error::InvalidConfig(format!(
                "original_tempo_bpm {} out of range ({MIN_TEMPO_BPM}-{MAX_TEMPO_BPM})",
                self.original_tempo_bpm
            )));
        }
        for (name, value) in [
            ("start_lookahead_sec", self.start_lookahead_sec),
            ("seek_lookahead_sec", self.seek_lookahead_sec),
            ("join_lookahead_sec", self.join_lookahead_sec),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} {value} out of range (0-1 s)"
                )));
            }
        }
        if self.poll_interval_ms == 0 || self.ready_poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "polling intervals must be non-zero".into(),
            ));
        }
        if self.max_voices == 0 {
            return Err(Error::InvalidConfig("max_voices must be at least 1".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Join throttle in engine-clock seconds.
    pub fn late_join_throttle_sec(&self) -> f64 {
        self.late_join_throttle_ms as f64 / 1000.0
    }
}
