//! Error types.

use thiserror::Error;

use crate::registry::TrackId;

/// Error type.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV decoding error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// File type the loader cannot decode.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The decode worker went away before delivering a buffer.
    #[error("Decode for track '{0}' was cancelled")]
    LoadCancelled(TrackId),

    /// No entry for the track, even after rescanning the registry.
    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
