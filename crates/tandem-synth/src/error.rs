//! Error types for tandem-synth.

use thiserror::Error;

/// Result type alias for tandem-synth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tandem-synth.
#[derive(Debug, Error)]
pub enum Error {
    /// A note in a timeline is malformed.
    #[error("Invalid note #{index}: {reason}")]
    InvalidNote { index: usize, reason: String },

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
