//! Version command - report tessmark and engine versions.

use std::sync::Arc;

use clap::Args;
use console::style;

use tessmark_core::{Session, TesseractApi};

use super::load_config;

/// Arguments for the version command.
#[derive(Args)]
pub struct VersionArgs {
    /// Path to the Tesseract shared library
    #[arg(long)]
    library: Option<std::path::PathBuf>,
}

pub async fn run(args: VersionArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    println!("tessmark {}", env!("CARGO_PKG_VERSION"));

    let library = args
        .library
        .or(config.engine.library)
        .unwrap_or_else(TesseractApi::default_library);

    match TesseractApi::load(&library, config.engine.leptonica_library.as_deref()) {
        Ok(api) => {
            let session = Session::new(Arc::new(api));
            let version = session.version().unwrap_or_else(|| "unknown".to_string());
            println!("tesseract {}", version);
        }
        Err(e) => {
            println!(
                "{} Engine not available ({}): {}",
                style("⚠").yellow(),
                library.display(),
                e
            );
        }
    }

    Ok(())
}
