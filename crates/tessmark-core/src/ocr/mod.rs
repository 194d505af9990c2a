//! Recognition pipeline over a native engine session.

mod annotate;
mod filter;
mod pipeline;

pub use annotate::{draw_rectangle, DEFAULT_THICKNESS};
pub use filter::{compose_text, filter_words, to_bitmap_rect, tokenize, Alignment, RecognizedWord};
pub use pipeline::{Pipeline, Recognition};

use std::sync::Arc;

use tessmark_engine::{EngineApi, Session};
use tracing::info;

use crate::error::Result;
use crate::models::TessmarkConfig;

/// Open and initialize a session on `api` using the engine settings in `config`.
pub fn open_session<A: EngineApi>(api: Arc<A>, config: &TessmarkConfig) -> Result<Session<A>> {
    config.recognition.validate()?;

    let mut session = Session::new(api).with_max_words(config.recognition.max_words);
    let data_path = config.engine.data_path.to_string_lossy();
    session.init(&config.engine.language, &data_path)?;

    info!(
        "Engine ready: language={}, data_path={}",
        config.engine.language, data_path
    );
    Ok(session)
}

/// Load the Tesseract library named in `config` and open a session on it.
#[cfg(feature = "native")]
pub fn create_session(
    config: &TessmarkConfig,
) -> Result<Session<tessmark_engine::TesseractApi>> {
    use tessmark_engine::TesseractApi;

    let library = config
        .engine
        .library
        .clone()
        .unwrap_or_else(TesseractApi::default_library);
    let api = TesseractApi::load(&library, config.engine.leptonica_library.as_deref())?;

    open_session(Arc::new(api), config)
}
