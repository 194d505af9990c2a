//! Subcommands and the settings they share.

pub mod batch;
pub mod config;
pub mod recognize;
pub mod version;

use std::path::{Path, PathBuf};

use clap::Args;
use image::DynamicImage;
use tracing::debug;

use tessmark_core::{Bitmap, TessmarkConfig};

/// Image extensions accepted as input.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp", "gif"];

/// Engine and filtering overrides shared by the recognition commands.
#[derive(Args, Debug, Default)]
pub struct EngineArgs {
    /// Minimum word confidence (0-100) to keep and highlight a word
    #[arg(long)]
    min_confidence: Option<i32>,

    /// Engine language (e.g. "eng", "deu+eng")
    #[arg(short, long)]
    language: Option<String>,

    /// Directory containing the trained language data
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Path to the Tesseract shared library
    #[arg(long)]
    library: Option<PathBuf>,
}

impl EngineArgs {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, config: &mut TessmarkConfig) {
        if let Some(min_confidence) = self.min_confidence {
            config.recognition.minimum_confidence = min_confidence;
        }
        if let Some(language) = &self.language {
            config.engine.language = language.clone();
        }
        if let Some(tessdata) = &self.tessdata {
            config.engine.data_path = tessdata.clone();
        }
        if let Some(library) = &self.library {
            config.engine.library = Some(library.clone());
        }
    }
}

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tessmark")
        .join("config.json")
}

/// Load the configuration from `config_path`, falling back to the default
/// location and then to built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TessmarkConfig> {
    if let Some(path) = config_path {
        return Ok(TessmarkConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        Ok(TessmarkConfig::from_file(&default_path)?)
    } else {
        Ok(TessmarkConfig::default())
    }
}

/// Whether `path` has one of the supported image extensions.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read an image file into a bitmap.
pub fn load_bitmap(path: &Path) -> anyhow::Result<Bitmap> {
    let image: DynamicImage = image::open(path)?;
    debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(Bitmap::from_dynamic(&image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("scan.PNG")));
        assert!(is_image(Path::new("dir/photo.jpeg")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("no_extension")));
    }

    #[test]
    fn test_engine_args_override_config() {
        let args = EngineArgs {
            min_confidence: Some(75),
            language: Some("deu".to_string()),
            tessdata: None,
            library: Some(PathBuf::from("/usr/lib/libtesseract.so.5")),
        };
        let mut config = TessmarkConfig::default();
        args.apply(&mut config);

        assert_eq!(config.recognition.minimum_confidence, 75);
        assert_eq!(config.engine.language, "deu");
        assert_eq!(config.engine.data_path, PathBuf::from("tessdata"));
        assert_eq!(
            config.engine.library,
            Some(PathBuf::from("/usr/lib/libtesseract.so.5"))
        );
    }
}
