//! Note timeline in logical (untempo-scaled) seconds.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One note of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI note number (0-127)
    pub pitch: u8,
    /// Velocity (0.0-1.0, normalized)
    pub velocity: f32,
    /// Onset in logical seconds
    pub start: f64,
    /// Length in logical seconds
    pub duration: f64,
}

impl Note {
    pub fn new(pitch: u8, velocity: f32, start: f64, duration: f64) -> Self {
        Self {
            pitch,
            velocity,
            start,
            duration,
        }
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    fn validate(&self, index: usize) -> Result<()> {
        let reason = if self.pitch > 127 {
            format!("pitch {} above 127", self.pitch)
        } else if !self.velocity.is_finite() || !(0.0..=1.0).contains(&self.velocity) {
            format!("velocity {} outside 0-1", self.velocity)
        } else if !self.start.is_finite() || self.start < 0.0 {
            format!("start {} is negative or not finite", self.start)
        } else if !self.duration.is_finite() || self.duration <= 0.0 {
            format!("duration {} must be positive", self.duration)
        } else {
            return Ok(());
        };
        Err(Error::InvalidNote { index, reason })
    }
}

/// Validated notes, ordered by onset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoteTimeline {
    notes: Vec<Note>,
}

impl NoteTimeline {
    pub fn new(mut notes: Vec<Note>) -> Result<Self> {
        for (index, note) in notes.iter().enumerate() {
            note.validate(index)?;
        }
        notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
        Ok(Self { notes })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// End of the last note to finish; 0.0 when empty.
    pub fn duration(&self) -> f64 {
        self.notes.iter().map(Note::end).fold(0.0, f64::max)
    }

    /// Notes still sounding at or starting after `time`.
    pub fn from_time(&self, time: f64) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(move |note| note.end() > time)
    }
}

impl<'de> Deserialize<'de> for NoteTimeline {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            notes: Vec<Note>,
        }
        let raw = Raw::deserialize(deserializer)?;
        NoteTimeline::new(raw.notes).map_err(serde::de::Error::custom)
    }
}
