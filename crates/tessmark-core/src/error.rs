//! Error types for the tessmark-core library.

use thiserror::Error;

/// Main error type for the tessmark library.
#[derive(Error, Debug)]
pub enum TessmarkError {
    /// Error from the native engine boundary.
    #[error("engine error: {0}")]
    Engine(#[from] tessmark_engine::EngineError),

    /// The engine's words, confidences and boxes disagree in length.
    #[error("misaligned results: {tokens} tokens, {confidences} confidences, {boxes} boxes")]
    MisalignedResults {
        tokens: usize,
        confidences: usize,
        boxes: usize,
    },

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for the tessmark library.
pub type Result<T> = std::result::Result<T, TessmarkError>;
