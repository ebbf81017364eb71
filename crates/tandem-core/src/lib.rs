//! Clock, fencing and backend contract for synchronized dual-backend playback.
//!
//! # Primary API
//!
//! - [`MasterClock`]: logical time, tempo, loop settings and the generation fence
//! - [`PlayerGroup`]: the contract every backend implements
//! - [`Fence`] / [`Permit`]: cooperative cancellation of stale continuations
//! - [`AudioEngine`]: the host audio engine (clock, resume, buffer chains, note outputs)
//! - [`HeadlessEngine`]: deterministic engine with a manual clock
//! - [`TandemConfig`]: configuration, loadable from TOML
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use tandem_core::{HeadlessEngine, MasterClock, TandemConfig};
//!
//! let engine = Rc::new(HeadlessEngine::new());
//! let mut clock = MasterClock::new(engine.clone(), &TandemConfig::default());
//! clock.register_group(waveform_group);
//! clock.start_playback(0.0, 0.05);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{TandemConfig, MAX_TEMPO_BPM, MIN_TEMPO_BPM};

pub mod fence;
pub use fence::{Fence, Generation, Permit};

pub mod buffer;
pub use buffer::AudioBuffer;

pub mod time_stretch;
pub use time_stretch::{pitch_correction_semitones, AnalysisWindow, TimeStretchParams};

pub mod engine;
pub use engine::{
    AudioEngine, BufferChain, ChainRecord, ChainStart, EngineState, HeadlessChain, HeadlessEngine,
    HeadlessNotes, NoteEvent, NoteEventKind, NoteOutput, NoteRecord, ResumeBehavior, VoiceId,
};

pub mod group;
pub use group::{PlayerGroup, SharedGroup};

pub(crate) mod transport;
pub use transport::{
    ClockSnapshot, LoopConfig, LoopMode, MasterClock, PlaybackState, SyncInfo, TransitionResult,
    TransportEvent, TransportFsm, TransportState,
};
