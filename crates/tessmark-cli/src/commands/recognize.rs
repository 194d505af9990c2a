//! Recognize command - read text from a single image and highlight confident words.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use tessmark_core::{create_session, Pipeline, Recognition};

use super::{load_bitmap, load_config, EngineArgs};

/// Arguments for the recognize command.
#[derive(Args)]
pub struct RecognizeArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,

    /// Write the annotated image to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Accepted words as plain text
    Text,
    /// Full recognition report as JSON
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

pub async fn run(args: RecognizeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.engine.apply(&mut config);

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Loading image...");
    let bitmap = load_bitmap(&args.input)?;

    pb.set_message("Starting engine...");
    let mut session = create_session(&config)
        .map_err(|e| anyhow::anyhow!("Failed to start OCR engine: {}", e))?;

    pb.set_message("Recognizing...");
    let pipeline = Pipeline::new(config.recognition.clone());
    let recognition = pipeline.recognize(&mut session, &bitmap)?;

    pb.finish_and_clear();

    if let Some(output_path) = &args.output {
        recognition.annotated.to_rgba_image().save(output_path)?;
        eprintln!(
            "{} Annotated image written to {}",
            style("✓").green(),
            output_path.display()
        );
    }

    println!("{}", format_recognition(&recognition, args.format)?);

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render a recognition in the requested format.
pub fn format_recognition(recognition: &Recognition, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(recognition.text.trim_end().to_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(recognition)?),
    }
}

/// Write a recognition next to its annotated image.
pub fn write_outputs(
    recognition: &Recognition,
    format: OutputFormat,
    output_dir: &std::path::Path,
    stem: &str,
) -> anyhow::Result<()> {
    let report_path = output_dir.join(format!("{}.{}", stem, format.extension()));
    fs::write(&report_path, format_recognition(recognition, format)?)?;

    let image_path = output_dir.join(format!("{}.annotated.png", stem));
    recognition.annotated.to_rgba_image().save(&image_path)?;

    debug!("Wrote {} and {}", report_path.display(), image_path.display());
    Ok(())
}
