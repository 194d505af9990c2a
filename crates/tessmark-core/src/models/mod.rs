//! Data models and configuration.

pub mod bitmap;
pub mod config;

pub use bitmap::{Bitmap, PixelBuffer, Rect};
pub use config::{EngineConfig, RecognitionConfig, TessmarkConfig};
