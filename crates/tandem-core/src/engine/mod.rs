//! Native audio engine interface.
//!
//! The engine renders audio on its own real-time thread. The control thread
//! only reads its clock and issues commands through these traits; it never
//! touches rendering directly.

mod headless;

pub use headless::{
    ChainRecord, ChainStart, HeadlessChain, HeadlessEngine, HeadlessNotes, NoteRecord,
    ResumeBehavior,
};

use std::future::Future;
use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::time_stretch::TimeStretchParams;
use crate::Result;

/// Voice identifier for scheduled notes.
pub type VoiceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Running,
    Suspended,
    Closed,
}

/// One playback chain: source → time-stretch/pitch-correction → gain → pan.
pub trait BufferChain {
    /// Begin audible playback at engine time `at`, reading the buffer from `offset` seconds.
    fn start(&mut self, at: f64, offset: f64);

    /// Stop playback. Idempotent.
    fn stop(&mut self);

    fn set_time_stretch(&mut self, params: TimeStretchParams);

    fn set_gain(&mut self, gain: f32);

    /// Stereo position in [-1, 1].
    fn set_pan(&mut self, pan: f32);

    /// Delay between feeding a sample and hearing it, in seconds.
    fn latency(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEventKind {
    On,
    Off,
}

/// A note-on or note-off at an absolute engine time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub at: f64,
    pub voice: VoiceId,
    pub pitch: u8,
    pub velocity: f32,
    pub kind: NoteEventKind,
}

/// Synthesizer input that accepts discretely scheduled note events.
pub trait NoteOutput {
    fn schedule(&mut self, event: NoteEvent);

    /// Drop every pending event and silence sounding voices.
    fn cancel_all(&mut self);

    fn set_gain(&mut self, gain: f32);
}

/// The host audio engine.
pub trait AudioEngine {
    type Chain: BufferChain + 'static;
    type Notes: NoteOutput + 'static;

    /// Engine clock in seconds.
    fn now(&self) -> f64;

    fn state(&self) -> EngineState;

    /// Leave the suspended state.
    fn resume(&self) -> impl Future<Output = Result<()>>;

    /// Synchronous resume used as a fallback when [`resume`](Self::resume) fails.
    fn resume_direct(&self) -> Result<()>;

    fn create_chain(&self, label: &str, buffer: Arc<AudioBuffer>) -> Self::Chain;

    fn create_note_output(&self, label: &str) -> Self::Notes;
}
