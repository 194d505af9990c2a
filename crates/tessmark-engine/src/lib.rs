//! Native OCR engine binding for tessmark.
//!
//! This crate owns everything that touches unmanaged memory:
//! - the [`EngineApi`] call surface and its backends (`tesseract` loaded at
//!   runtime for native builds, `scripted` for tests)
//! - [`Session`], the owned engine handle and its lifecycle
//! - the result decoders for the confidence and box arrays
//! - [`NativeBuffer`], the unmanaged image storage handed to the engine

mod backend;
mod buffer;
pub mod decode;
mod error;
pub mod raw;
mod session;

pub use backend::EngineApi;
pub use buffer::NativeBuffer;
pub use error::EngineError;
pub use raw::BoundingBox;
pub use session::{Recognized, Session, SessionState, Submission};

#[cfg(feature = "native")]
pub use backend::tesseract::TesseractApi;

#[cfg(any(test, feature = "scripted"))]
pub use backend::scripted::{
    EngineEvent, ScriptedEngine, ScriptedOutput, ScriptedStats, SubmittedImage,
};

/// Default upper bound on the number of words decoded from one result.
pub const DEFAULT_MAX_WORDS: usize = 1 << 16;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
