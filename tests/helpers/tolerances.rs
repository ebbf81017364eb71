//! Tolerance constants for timing assertions.

/// Exact arithmetic on a few additions (anchor + elapsed × ratio).
pub const TIME_EPSILON: f64 = 1e-9;

/// Pitch correction in semitones.
pub const SEMITONE_EPSILON: f64 = 1e-9;

/// Gain products computed in f32.
pub const GAIN_EPSILON: f32 = 1e-6;
