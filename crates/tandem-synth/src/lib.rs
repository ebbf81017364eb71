//! Note-trigger player group for tandem.
//!
//! Schedules a note timeline as discrete note-on/note-off events against the
//! engine clock, scaled by `original_tempo / tempo`.
//!
//! # Example
//!
//! ```ignore
//! use tandem_synth::{Note, NoteGroup, NoteTimeline};
//!
//! let mut notes = NoteGroup::new(engine.create_note_output("piano"), &config);
//! notes.set_timeline(NoteTimeline::new(vec![Note::new(60, 0.8, 0.0, 1.0)])?);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod timeline;
pub use timeline::{Note, NoteTimeline};

pub mod voice;
pub use voice::{AllocationResult, VoiceAllocator, VoiceSlot};

pub mod schedule;
pub use schedule::{build_schedule, time_scale};

pub mod group;
pub use group::NoteGroup;
