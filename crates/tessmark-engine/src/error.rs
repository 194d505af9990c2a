//! Error types for the engine binding.

use thiserror::Error;

/// Errors that can occur at the native engine boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine returned a null handle.
    #[error("engine unavailable: create returned a null handle")]
    EngineUnavailable,

    /// The language data path was empty or whitespace.
    #[error("invalid data path")]
    InvalidDataPath,

    /// The engine initializer returned a non-zero code.
    #[error("engine init failed with code {0}")]
    InitFailed(i32),

    /// A call was made on a session that is not ready.
    #[error("session is not ready")]
    SessionNotReady,

    /// The engine reported a recognition failure.
    #[error("recognition failed with code {0}")]
    RecognitionFailed(i32),

    /// The engine produced no text.
    #[error("engine returned no text")]
    NoText,

    /// The confidence array could not be decoded.
    #[error("malformed confidence array: {0}")]
    MalformedConfidenceArray(String),

    /// No sentinel was found within the word limit.
    #[error("confidence array exceeds {0} words without a terminator")]
    ConfidenceArrayTooLong(usize),

    /// The box array could not be decoded.
    #[error("malformed box array: {0}")]
    MalformedBoxArray(String),

    /// Failed to load the engine library or resolve a symbol.
    #[error("failed to load engine library: {0}")]
    LibraryLoad(String),

    /// The submitted image does not match its declared geometry.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// An argument could not be passed across the native boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
