//! Waveform player group for tandem.
//!
//! One buffer chain per registered asset (time-stretch with pitch correction,
//! gain, pan), synchronized start/stop, per-track mixing, late join and
//! readiness gating.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use tandem_sampler::{InMemoryRepository, TrackDescriptor, WavLoader, WaveformGroup};
//!
//! let repository = InMemoryRepository::new();
//! repository.insert(TrackDescriptor::path("drums", "stems/drums.wav"));
//!
//! let group = WaveformGroup::new(engine, Box::new(repository), Box::new(WavLoader), &config);
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod registry;
pub use registry::{AssetSource, InMemoryRepository, TrackDescriptor, TrackId, TrackRepository};

pub mod loader;
pub use loader::{decode_wav, AssetLoader, DecodePoll, ManualLoader, PendingDecode, WavLoader};

pub mod track;
pub use track::{mix_gain, TrackInfo};

pub mod events;
pub use events::{Observers, TrackEvent, TrackObserver};

pub mod group;
pub use group::WaveformGroup;

pub mod ready;
pub use ready::wait_until_ready;
