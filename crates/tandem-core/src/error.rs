//! Error types for tandem-core.

use thiserror::Error;

/// Error type for tandem-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio engine could not leave the suspended state: {0}")]
    EngineNotResumable(String),

    #[error("Audio engine is closed")]
    EngineClosed,
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
