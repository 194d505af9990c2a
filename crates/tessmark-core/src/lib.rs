//! Core library for tessmark.
//!
//! This crate provides:
//! - the [`Bitmap`] image model and its engine encoding
//! - the recognition [`Pipeline`]: submit, recognize, decode, filter by
//!   confidence and outline the accepted words
//! - configuration loaded from JSON

pub mod error;
pub mod models;
pub mod ocr;

pub use error::{Result, TessmarkError};
pub use models::{Bitmap, EngineConfig, PixelBuffer, RecognitionConfig, Rect, TessmarkConfig};
pub use ocr::{draw_rectangle, open_session, Alignment, Pipeline, Recognition, RecognizedWord};
#[cfg(feature = "native")]
pub use ocr::create_session;

/// Re-export engine types.
pub use tessmark_engine::{EngineApi, EngineError, Session, SessionState};

#[cfg(feature = "native")]
pub use tessmark_engine::TesseractApi;
