//! Batch command - recognize text in every image matching a pattern.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use tessmark_core::{create_session, EngineApi, Pipeline, Recognition, Session};

use super::recognize::{write_outputs, OutputFormat};
use super::{is_image, load_bitmap, load_config, EngineArgs};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input images
    #[arg(required = true)]
    input: String,

    /// Output directory for reports and annotated images
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Report format for each file
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    recognition: Option<Recognition>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.engine.apply(&mut config);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_image(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let mut session = create_session(&config)
        .map_err(|e| anyhow::anyhow!("Failed to start OCR engine: {}", e))?;
    let pipeline = Pipeline::new(config.recognition.clone());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = process_file(
            &path,
            &pipeline,
            &mut session,
            args.format,
            args.output_dir.as_deref(),
        );
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(recognition) => {
                results.push(FileResult {
                    path,
                    recognition: Some(recognition),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path,
                        recognition: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = results.iter().filter(|r| r.recognition.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Recognize one file and write its outputs when an output directory is set.
fn process_file<A: EngineApi>(
    path: &Path,
    pipeline: &Pipeline,
    session: &mut Session<A>,
    format: OutputFormat,
    output_dir: Option<&Path>,
) -> anyhow::Result<Recognition> {
    let bitmap = load_bitmap(path)?;
    let recognition = pipeline.recognize(session, &bitmap)?;

    if let Some(output_dir) = output_dir {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
        write_outputs(&recognition, format, output_dir, stem)?;
    }

    Ok(recognition)
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "accepted_words",
        "engine_words",
        "text",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.file_name().and_then(|s| s.to_str()).unwrap_or("");

        if let Some(recognition) = &result.recognition {
            wtr.write_record([
                filename,
                "success",
                &recognition.words.len().to_string(),
                &recognition.alignment.paired().to_string(),
                recognition.text.trim_end(),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use image::{Rgba, RgbaImage};
    use tessmark_core::{open_session, TessmarkConfig};
    use tessmark_engine::{ScriptedEngine, ScriptedOutput};

    fn scripted_session() -> Session<ScriptedEngine> {
        let engine = Arc::new(ScriptedEngine::new(ScriptedOutput::words(&[
            ("Hello", 90, [0, 0, 2, 2]),
        ])));
        open_session(engine, &TessmarkConfig::default()).unwrap()
    }

    fn write_image(dir: &Path) -> PathBuf {
        let path = dir.join("scan.png");
        RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_process_file_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(dir.path());
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let mut session = scripted_session();

        let recognition = process_file(
            &input,
            &Pipeline::default(),
            &mut session,
            OutputFormat::Text,
            Some(&out),
        )
        .unwrap();

        assert_eq!(recognition.text, "Hello ");
        assert_eq!(fs::read_to_string(out.join("scan.txt")).unwrap(), "Hello");
        assert!(out.join("scan.annotated.png").exists());
    }

    #[test]
    fn test_output_write_failure_is_a_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(dir.path());
        // A regular file where the output directory should be.
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "").unwrap();
        let mut session = scripted_session();
        let pipeline = Pipeline::default();

        let result = process_file(&input, &pipeline, &mut session, OutputFormat::Json, Some(&blocked));
        assert!(result.is_err());

        // The session is still usable for the next file.
        assert!(session.is_ready());
        assert!(process_file(&input, &pipeline, &mut session, OutputFormat::Json, None).is_ok());
    }
}
