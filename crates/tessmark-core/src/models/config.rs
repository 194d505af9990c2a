//! Configuration structures for the recognition pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TessmarkError;

/// Main configuration for tessmark.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TessmarkConfig {
    /// Engine library and language data.
    pub engine: EngineConfig,

    /// Filtering and highlighting.
    pub recognition: RecognitionConfig,
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Tesseract shared library. `None` uses the platform default name.
    pub library: Option<PathBuf>,

    /// Leptonica shared library, used to release box arrays.
    pub leptonica_library: Option<PathBuf>,

    /// Engine language code (e.g. "eng", "deu+eng").
    pub language: String,

    /// Directory containing the trained language data.
    pub data_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library: None,
            leptonica_library: None,
            language: "eng".to_string(),
            data_path: PathBuf::from("tessdata"),
        }
    }
}

/// Recognition filtering and highlight configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Minimum word confidence (0 - 100) to keep a word.
    pub minimum_confidence: i32,

    /// RGBA color of the highlight rectangles.
    pub highlight_color: [u8; 4],

    /// Highlight line thickness in pixels.
    pub line_thickness: u32,

    /// Maximum number of words decoded from one result.
    pub max_words: usize,

    /// Fail when words, confidences and boxes differ in length instead of
    /// using the shortest.
    pub strict_alignment: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            minimum_confidence: 60,
            highlight_color: [255, 0, 255, 255],
            line_thickness: crate::ocr::DEFAULT_THICKNESS,
            max_words: tessmark_engine::DEFAULT_MAX_WORDS,
            strict_alignment: false,
        }
    }
}

impl RecognitionConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), TessmarkError> {
        if self.line_thickness == 0 {
            return Err(TessmarkError::Config(
                "recognition.line_thickness must be at least 1".to_string(),
            ));
        }
        if self.max_words == 0 {
            return Err(TessmarkError::Config(
                "recognition.max_words must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl TessmarkConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
