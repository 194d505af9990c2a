//! Recognition pipeline: encode, submit, recognize, decode, filter, annotate.

use std::time::Instant;

use image::Rgba;
use serde::Serialize;
use tessmark_engine::{EngineApi, EngineError, NativeBuffer, Session};
use tracing::{debug, info, warn};

use crate::error::{Result, TessmarkError};
use crate::models::bitmap::BYTES_PER_PIXEL;
use crate::models::{Bitmap, RecognitionConfig};

use super::annotate::draw_rectangle;
use super::filter::{compose_text, filter_words, tokenize, Alignment, RecognizedWord};

/// Output of one recognition.
#[derive(Debug, Clone, Serialize)]
pub struct Recognition {
    /// Accepted words, each followed by a space.
    pub text: String,

    /// Accepted words with their boxes.
    pub words: Vec<RecognizedWord>,

    /// Full text as returned by the engine, before filtering.
    pub engine_text: String,

    /// Lengths of the engine's word sequences.
    pub alignment: Alignment,

    /// Image dimensions (width, height).
    pub image_size: (u32, u32),

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Copy of the input with accepted words outlined.
    #[serde(skip)]
    pub annotated: Bitmap,
}

/// Runs recognition on a session and post-processes the engine's results.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: RecognitionConfig,
}

impl Pipeline {
    /// Create a pipeline with the given filtering and highlight settings.
    pub fn new(config: RecognitionConfig) -> Self {
        Self { config }
    }

    /// Set the minimum word confidence.
    pub fn with_minimum_confidence(mut self, minimum_confidence: i32) -> Self {
        self.config.minimum_confidence = minimum_confidence;
        self
    }

    /// Current settings.
    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Recognize `bitmap` on `session`.
    ///
    /// The encoded image lives in a native buffer that is released before
    /// this returns, whichever step fails. A failed recognition leaves the
    /// session ready for the next call.
    pub fn recognize<A: EngineApi>(
        &self,
        session: &mut Session<A>,
        bitmap: &Bitmap,
    ) -> Result<Recognition> {
        let start = Instant::now();

        if !session.is_ready() {
            return Err(EngineError::SessionNotReady.into());
        }

        let (width, height) = (bitmap.width(), bitmap.height());
        info!("Recognizing image: {}x{}", width, height);

        let pixels = bitmap.encode_bottom_up();
        let native = NativeBuffer::copy_from(pixels.as_bytes())?;

        let (confidences, boxes, engine_text) = {
            let recognized = session
                .submit_image(&native, width, height, BYTES_PER_PIXEL)?
                .recognize()?;

            let confidences = recognized.confidences()?;
            let boxes = recognized.boxes()?;
            let text = recognized.text()?;
            (confidences, boxes, text)
        };
        drop(native);

        let tokens = tokenize(&engine_text);
        let alignment = Alignment::new(tokens.len(), confidences.len(), boxes.len());

        if !alignment.is_aligned() {
            warn!(
                "Engine results disagree: {} tokens, {} confidences, {} boxes",
                alignment.tokens, alignment.confidences, alignment.boxes
            );
            if self.config.strict_alignment {
                return Err(TessmarkError::MisalignedResults {
                    tokens: alignment.tokens,
                    confidences: alignment.confidences,
                    boxes: alignment.boxes,
                });
            }
        }

        let words = filter_words(
            &tokens,
            &confidences,
            &boxes,
            self.config.minimum_confidence,
            height,
        );

        let color = Rgba(self.config.highlight_color);
        let mut annotated = bitmap.clone();
        for word in &words {
            draw_rectangle(&mut annotated, word.highlight, color, self.config.line_thickness);
        }

        let recognition = Recognition {
            text: compose_text(&words),
            words,
            engine_text,
            alignment,
            image_size: (width, height),
            processing_time_ms: start.elapsed().as_millis() as u64,
            annotated,
        };

        info!(
            "Recognition complete: {} of {} words accepted in {}ms",
            recognition.words.len(),
            alignment.paired(),
            recognition.processing_time_ms
        );

        Ok(recognition)
    }

    /// Recognize several bitmaps on one session, continuing past failures.
    pub fn recognize_batch<A: EngineApi>(
        &self,
        session: &mut Session<A>,
        bitmaps: &[Bitmap],
    ) -> Vec<Result<Recognition>> {
        bitmaps
            .iter()
            .enumerate()
            .map(|(i, bitmap)| {
                let result = self.recognize(session, bitmap);
                if let Err(ref e) = result {
                    debug!("Bitmap {} failed: {}", i + 1, e);
                }
                result
            })
            .collect()
    }
}
