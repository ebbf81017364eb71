//! Centralized error type for the tandem umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tandem_core::Error),

    #[error("Sampler: {0}")]
    Sampler(#[from] tandem_sampler::Error),

    #[error("Synth: {0}")]
    Synth(#[from] tandem_synth::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
