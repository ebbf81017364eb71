//! Tempo scaling and pitch-correction parameters.

use serde::{Deserialize, Serialize};

/// Pitch correction that cancels the pitch change of playing at `rate`.
///
/// `rate = 2.0` gives `-12.0` semitones, `rate = 0.5` gives `+12.0`.
#[inline]
pub fn pitch_correction_semitones(rate: f64) -> f64 {
    -12.0 * rate.log2()
}

/// Time-stretch and pitch-shift parameters pushed to a buffer chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStretchParams {
    /// Native playback rate (1.0 = normal, 2.0 = double speed)
    pub rate: f64,

    /// Pitch shift applied after rate scaling, in semitones
    pub pitch_semitones: f64,
}

impl TimeStretchParams {
    pub const IDENTITY: Self = Self {
        rate: 1.0,
        pitch_semitones: 0.0,
    };

    /// Parameters that play at `bpm / original_bpm` with musical pitch preserved.
    pub fn for_tempo(bpm: f64, original_bpm: f64) -> Self {
        let rate = bpm / original_bpm;
        Self {
            rate,
            pitch_semitones: pitch_correction_semitones(rate),
        }
    }

    /// Frequency ratio of the pitch shift: 2^(semitones/12)
    pub fn pitch_ratio(&self) -> f64 {
        2.0_f64.powf(self.pitch_semitones / 12.0)
    }

    /// Net pitch ratio heard at the output; 1.0 when correction is exact.
    pub fn perceived_pitch_ratio(&self) -> f64 {
        self.rate * self.pitch_ratio()
    }

    /// Check if any time-stretching/pitch-shifting is active
    pub fn is_active(&self) -> bool {
        (self.rate - 1.0).abs() > 0.001 || self.pitch_semitones.abs() > 0.005
    }
}

impl Default for TimeStretchParams {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Analysis window of the pitch-correction stage.
///
/// Larger windows sound better but delay the output by one window:
///
/// - **Small (1024)**: ~23ms @ 44.1kHz
/// - **Medium (2048)**: ~46ms @ 44.1kHz - Default
/// - **Large (4096)**: ~93ms @ 44.1kHz
/// - **XLarge (8192)**: ~186ms @ 44.1kHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisWindow {
    Small = 1024,
    #[default]
    Medium = 2048,
    Large = 4096,
    XLarge = 8192,
}

impl AnalysisWindow {
    pub fn size(&self) -> usize {
        *self as usize
    }

    /// Default hop size (window / 4 = 75% overlap)
    pub fn hop_size(&self) -> usize {
        self.size() / 4
    }

    /// Delay introduced by the window at a given sample rate.
    pub fn latency_seconds(&self, sample_rate: f64) -> f64 {
        self.size() as f64 / sample_rate
    }
}
