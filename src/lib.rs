//! # Tandem - Unified Playback Synchronization
//!
//! Drives a waveform player group and a note-trigger player group from one
//! authoritative logical clock, so seeking, tempo changes, looping and
//! per-track mixing stay aligned across both.
//!
//! ## Architecture
//!
//! Tandem is an umbrella crate that coordinates:
//! - **tandem-core** - Master clock, generation fence, player-group contract, engine traits
//! - **tandem-sampler** - Waveform group (buffer chains, mixing, late join, readiness)
//! - **tandem-synth** - Note group (tempo-scaled note scheduling, voice allocation)
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::rc::Rc;
//! use tandem::prelude::*;
//!
//! let controller = Rc::new(
//!     Controller::builder(HeadlessEngine::new())
//!         .repository(repository)
//!         .build()?,
//! );
//!
//! let local = tokio::task::LocalSet::new();
//! local.run_until(async {
//!     controller.spawn_poll_loop();
//!     controller.register_visual_callback(|t| println!("{t:.2}s"));
//!     controller.play().await?;
//!     controller.set_tempo(90.0);
//!     controller.seek(42.0);
//!     Ok::<_, tandem::Error>(())
//! }).await?;
//! ```

/// Re-export of tandem-core for direct access
pub use tandem_core as core;

/// Re-export of tandem-sampler
pub use tandem_sampler as sampler;

/// Re-export of tandem-synth
pub use tandem_synth as synth;

pub use tandem_core::{
    AnalysisWindow, AudioBuffer, AudioEngine, EngineState, Generation, HeadlessEngine, LoopConfig,
    LoopMode, ResumeBehavior, TandemConfig, TimeStretchParams, TransportState,
};
pub use tandem_sampler::{
    InMemoryRepository, ManualLoader, TrackDescriptor, TrackEvent, TrackId, TrackInfo,
    TrackRepository, WavLoader,
};
pub use tandem_synth::{Note, NoteTimeline};

mod error;
pub use error::{Error, Result};

mod builder;
pub use builder::ControllerBuilder;

mod controller;
pub use controller::{Controller, GroupKind, TickOutcome, VisualCallback};

mod loop_guard;
pub use loop_guard::{LoopAction, LoopGuard};

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        AudioBuffer, AudioEngine, Controller, ControllerBuilder, Error, GroupKind,
        HeadlessEngine, InMemoryRepository, LoopMode, Note, NoteTimeline, Result, TandemConfig,
        TickOutcome, TrackDescriptor, TrackEvent, TrackId, WavLoader,
    };
}
