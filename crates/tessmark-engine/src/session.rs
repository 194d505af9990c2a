//! Engine session lifecycle and the typed call surface over [`EngineApi`].

use std::ffi::{c_int, c_void, CStr, CString};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::backend::EngineApi;
use crate::buffer::NativeBuffer;
use crate::decode::{decode_boxes, decode_confidences};
use crate::error::EngineError;
use crate::raw::{BoundingBox, RawHandle};
use crate::{Result, DEFAULT_MAX_WORDS};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No handle; never initialized or the last init failed.
    Uninitialized,
    /// A handle exists but the initializer has not returned yet.
    Initializing,
    /// Initialized and accepting images.
    Ready,
    /// The handle was ended and deleted.
    Closed,
}

/// One engine instance bound to a language and a data path.
///
/// The session owns its native handle: it is created by [`Session::init`] and
/// ended and deleted exactly once, by [`Session::close`] or on drop.
pub struct Session<A: EngineApi> {
    api: Arc<A>,
    handle: Option<NonNull<c_void>>,
    state: SessionState,
    language: Option<String>,
    data_path: Option<String>,
    max_words: usize,
}

// Safety: the handle is owned exclusively by this session and only used
// through `&mut self`, so moving the session to another thread moves sole
// access with it. The session is deliberately not `Sync`.
unsafe impl<A: EngineApi> Send for Session<A> {}

impl<A: EngineApi> Session<A> {
    /// Create an uninitialized session over `api`.
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            handle: None,
            state: SessionState::Uninitialized,
            language: None,
            data_path: None,
            max_words: DEFAULT_MAX_WORDS,
        }
    }

    /// Cap the number of words decoded from one recognition.
    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether images can be submitted.
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Language of the live handle.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Data path of the live handle.
    pub fn data_path(&self) -> Option<&str> {
        self.data_path.as_deref()
    }

    /// Engine version string, if the engine reports one.
    pub fn version(&self) -> Option<String> {
        let ptr = self.api.version();
        if ptr.is_null() {
            return None;
        }
        // Safety: the engine returns a static NUL-terminated string.
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    /// Initialize the engine for `language` with trained data in `data_path`.
    ///
    /// A live handle is closed first. An empty data path is rejected before
    /// any engine call. If the engine initializer fails, the new handle is
    /// ended and deleted and the session returns to `Uninitialized`.
    pub fn init(&mut self, language: &str, data_path: &str) -> Result<()> {
        if self.handle.is_some() {
            debug!("Closing previous engine handle before re-init");
            self.close();
        }

        self.language = None;
        self.data_path = None;

        if data_path.trim().is_empty() {
            self.state = SessionState::Uninitialized;
            return Err(EngineError::InvalidDataPath);
        }

        let (c_data_path, c_language) = match c_strings(data_path, language) {
            Ok(strings) => strings,
            Err(e) => {
                self.state = SessionState::Uninitialized;
                return Err(e);
            }
        };

        let handle = match self.create_session() {
            Ok(handle) => handle,
            Err(e) => {
                self.state = SessionState::Uninitialized;
                return Err(e);
            }
        };
        self.state = SessionState::Initializing;

        // Safety: `handle` is fresh from `create`; both strings outlive the call.
        let code = unsafe {
            self.api
                .init3(handle.as_ptr(), c_data_path.as_ptr(), c_language.as_ptr())
        };

        if code != 0 {
            warn!("Engine init failed with code {}, releasing handle", code);
            // Safety: the handle was created above and is released only here.
            unsafe {
                self.api.end(handle.as_ptr());
                self.api.delete(handle.as_ptr());
            }
            self.state = SessionState::Uninitialized;
            return Err(EngineError::InitFailed(code));
        }

        self.handle = Some(handle);
        self.state = SessionState::Ready;
        self.language = Some(language.to_string());
        self.data_path = Some(data_path.to_string());

        info!(language, data_path, "Engine session ready");
        Ok(())
    }

    /// End and delete the engine handle. A no-op without a live handle.
    pub fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        // Safety: `take` guarantees this handle is released exactly once.
        unsafe {
            self.api.end(handle.as_ptr());
            self.api.delete(handle.as_ptr());
        }
        self.state = SessionState::Closed;
        debug!("Engine session closed");
    }

    /// Hand `buffer` to the engine as a `width` × `height` image.
    ///
    /// The returned [`Submission`] borrows the buffer, so it cannot be freed or
    /// moved until recognition has finished with it.
    pub fn submit_image<'s, 'b>(
        &'s mut self,
        buffer: &'b NativeBuffer,
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    ) -> Result<Submission<'s, 'b, A>> {
        let handle = self.ready_handle()?;

        if width == 0 || height == 0 || bytes_per_pixel == 0 {
            return Err(EngineError::InvalidImage(format!(
                "degenerate geometry {}x{}x{}",
                width, height, bytes_per_pixel
            )));
        }

        let bytes_per_line = width
            .checked_mul(bytes_per_pixel)
            .ok_or_else(|| EngineError::InvalidImage("row stride overflows".to_string()))?;
        let expected = (bytes_per_line as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| EngineError::InvalidImage("image size overflows".to_string()))?;

        if buffer.len() != expected {
            return Err(EngineError::InvalidImage(format!(
                "expected {} bytes for {}x{}x{}, got {}",
                expected,
                width,
                height,
                bytes_per_pixel,
                buffer.len()
            )));
        }

        let to_c_int = |value: u32, what: &str| {
            c_int::try_from(value)
                .map_err(|_| EngineError::InvalidImage(format!("{} {} out of range", what, value)))
        };
        let c_width = to_c_int(width, "width")?;
        let c_height = to_c_int(height, "height")?;
        let c_bpp = to_c_int(bytes_per_pixel, "bytes per pixel")?;
        let c_bpl = to_c_int(bytes_per_line, "bytes per line")?;

        trace!("Submitting {}x{} image ({} bytes)", width, height, expected);

        // Safety: the buffer holds exactly `height * bytes_per_line` bytes and
        // the returned guard keeps it borrowed until recognition is done.
        unsafe {
            self.api
                .set_image(handle, buffer.as_ptr(), c_width, c_height, c_bpp, c_bpl);
        }

        Ok(Submission {
            session: Some(self),
            _buffer: PhantomData,
        })
    }

    fn create_session(&self) -> Result<NonNull<c_void>> {
        NonNull::new(self.api.create()).ok_or(EngineError::EngineUnavailable)
    }

    fn ready_handle(&self) -> Result<RawHandle> {
        match (self.state, self.handle) {
            (SessionState::Ready, Some(handle)) => Ok(handle.as_ptr()),
            _ => Err(EngineError::SessionNotReady),
        }
    }
}

fn c_strings(data_path: &str, language: &str) -> Result<(CString, CString)> {
    let c_data_path = CString::new(data_path)
        .map_err(|e| EngineError::InvalidArgument(format!("data path: {}", e)))?;
    let c_language = CString::new(language)
        .map_err(|e| EngineError::InvalidArgument(format!("language: {}", e)))?;
    Ok((c_data_path, c_language))
}

impl<A: EngineApi> Drop for Session<A> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<A: EngineApi> std::fmt::Debug for Session<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("language", &self.language)
            .field("data_path", &self.data_path)
            .finish()
    }
}

/// An image handed to the engine and not yet recognized.
///
/// Dropping it without recognizing clears the engine's image.
pub struct Submission<'s, 'b, A: EngineApi> {
    session: Option<&'s mut Session<A>>,
    _buffer: PhantomData<&'b NativeBuffer>,
}

impl<'s, 'b, A: EngineApi> Submission<'s, 'b, A> {
    /// Run recognition on the submitted image.
    ///
    /// A non-zero engine code is `RecognitionFailed`; the session stays ready.
    pub fn recognize(mut self) -> Result<Recognized<'s, 'b, A>> {
        let Some(session) = self.session.take() else {
            return Err(EngineError::SessionNotReady);
        };
        let handle = session.ready_handle()?;

        // Safety: the handle is ready and the image buffer is still borrowed.
        let code = unsafe { session.api.recognize(handle, ptr::null_mut()) };
        if code != 0 {
            warn!("Engine recognition failed with code {}", code);
            // Safety: live handle.
            unsafe { session.api.clear(handle) };
            return Err(EngineError::RecognitionFailed(code));
        }

        Ok(Recognized {
            session,
            _buffer: PhantomData,
        })
    }
}

impl<A: EngineApi> Drop for Submission<'_, '_, A> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Ok(handle) = session.ready_handle() {
                // Safety: live handle.
                unsafe { session.api.clear(handle) };
            }
        }
    }
}

/// Results of one recognition, readable until dropped.
///
/// Every accessor copies the engine's data into owned memory and releases the
/// native result through the engine's own deletion call. Dropping clears the
/// engine's recognition state.
pub struct Recognized<'s, 'b, A: EngineApi> {
    session: &'s mut Session<A>,
    _buffer: PhantomData<&'b NativeBuffer>,
}

impl<A: EngineApi> Recognized<'_, '_, A> {
    /// Per-word confidences in engine order.
    pub fn confidences(&self) -> Result<Vec<i32>> {
        let handle = self.session.ready_handle()?;
        let api = &self.session.api;

        // Safety: live handle; the array is decoded before it is released and
        // released at most once.
        unsafe {
            let raw = api.all_word_confidences(handle);
            let decoded = decode_confidences(raw, self.session.max_words);
            if !raw.is_null() {
                api.delete_int_array(raw);
            }
            decoded
        }
    }

    /// Per-word bounding boxes in engine order.
    pub fn boxes(&self) -> Result<Vec<BoundingBox>> {
        let handle = self.session.ready_handle()?;
        let api = &self.session.api;

        // Safety: as above; the box array is only read by the decoder.
        unsafe {
            let mut raw = api.get_words(handle, ptr::null_mut());
            let decoded = decode_boxes(raw, self.session.max_words);
            if !raw.is_null() && !api.destroy_boxa(&mut raw) {
                trace!("Box array left to the engine");
            }
            decoded
        }
    }

    /// Recognized text as UTF-8.
    pub fn text(&self) -> Result<String> {
        let handle = self.session.ready_handle()?;
        let api = &self.session.api;

        // Safety: the text is copied before it is released through the
        // engine's own deallocator.
        unsafe {
            let raw = api.get_utf8_text(handle);
            if raw.is_null() {
                return Err(EngineError::NoText);
            }
            let text = CStr::from_ptr(raw).to_string_lossy().into_owned();
            api.delete_text(raw);
            Ok(text)
        }
    }
}

impl<A: EngineApi> Drop for Recognized<'_, '_, A> {
    fn drop(&mut self) {
        if let Ok(handle) = self.session.ready_handle() {
            // Safety: live handle.
            unsafe { self.session.api.clear(handle) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::{EngineEvent, ScriptedEngine, ScriptedOutput};
    use pretty_assertions::assert_eq;

    fn hello_output() -> ScriptedOutput {
        ScriptedOutput::words(&[
            ("Hello", 80, [10, 5, 20, 8]),
            ("World", 40, [35, 5, 22, 8]),
        ])
    }

    fn ready_session(engine: &Arc<ScriptedEngine>) -> Session<ScriptedEngine> {
        let mut session = Session::new(Arc::clone(engine));
        session.init("eng", "/data/tessdata").unwrap();
        session
    }

    #[test]
    fn test_init_ready() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let session = ready_session(&engine);

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.language(), Some("eng"));
        assert_eq!(
            engine.last_init(),
            Some(("/data/tessdata".to_string(), "eng".to_string()))
        );
    }

    #[test]
    fn test_init_twice_closes_first_handle() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let mut session = ready_session(&engine);
        session.init("eng", "/data/tessdata").unwrap();

        assert_eq!(
            engine.events(),
            vec![
                EngineEvent::Create(1),
                EngineEvent::Init(1),
                EngineEvent::End(1),
                EngineEvent::Delete(1),
                EngineEvent::Create(2),
                EngineEvent::Init(2),
            ]
        );
        assert_eq!(engine.stats().live_handles, 1);
    }

    #[test]
    fn test_init_rejects_blank_data_path_without_engine_call() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let mut session = Session::new(Arc::clone(&engine));

        assert_eq!(session.init("eng", "   "), Err(EngineError::InvalidDataPath));
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_init_failure_releases_handle() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()).with_init_code(-1));
        let mut session = Session::new(Arc::clone(&engine));

        assert_eq!(session.init("eng", "/missing"), Err(EngineError::InitFailed(-1)));
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(
            engine.events(),
            vec![
                EngineEvent::Create(1),
                EngineEvent::Init(1),
                EngineEvent::End(1),
                EngineEvent::Delete(1),
            ]
        );
        assert_eq!(engine.stats().live_handles, 0);
    }

    #[test]
    fn test_reinit_with_nul_byte_returns_to_uninitialized() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let mut session = ready_session(&engine);

        let result = session.init("en\0g", "/data/tessdata");

        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(!session.is_ready());
        assert_eq!(session.language(), None);
        assert_eq!(engine.stats().live_handles, 0);

        session.init("eng", "/data/tessdata").unwrap();
        assert!(session.is_ready());
    }

    #[test]
    fn test_null_create_is_engine_unavailable() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()).with_null_create());
        let mut session = Session::new(engine);

        assert_eq!(session.init("eng", "/data"), Err(EngineError::EngineUnavailable));
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_close_is_idempotent() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let mut never_opened = Session::new(Arc::clone(&engine));
        never_opened.close();
        assert_eq!(never_opened.state(), SessionState::Uninitialized);

        let mut session = ready_session(&engine);
        session.close();
        session.close();
        drop(session);

        assert_eq!(session_deletes(&engine), 1);
        assert_eq!(engine.stats().live_handles, 0);
    }

    fn session_deletes(engine: &ScriptedEngine) -> usize {
        engine
            .events()
            .iter()
            .filter(|e| matches!(e, EngineEvent::Delete(_)))
            .count()
    }

    #[test]
    fn test_drop_releases_handle() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        {
            let _session = ready_session(&engine);
            assert_eq!(engine.stats().live_handles, 1);
        }
        assert_eq!(engine.stats().live_handles, 0);
    }

    #[test]
    fn test_submit_requires_ready() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let mut session = Session::new(engine);
        let buffer = NativeBuffer::copy_from(&[0u8; 16]).unwrap();

        let result = session.submit_image(&buffer, 2, 2, 4);
        assert!(matches!(result, Err(EngineError::SessionNotReady)));
    }

    #[test]
    fn test_submit_checks_buffer_size() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let mut session = ready_session(&engine);
        let buffer = NativeBuffer::copy_from(&[0u8; 15]).unwrap();

        let result = session.submit_image(&buffer, 2, 2, 4);
        assert!(matches!(result, Err(EngineError::InvalidImage(_))));
    }

    #[test]
    fn test_recognize_and_read_results() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let mut session = ready_session(&engine);
        let buffer = NativeBuffer::copy_from(&[7u8; 2 * 3 * 4]).unwrap();

        {
            let recognized = session.submit_image(&buffer, 2, 3, 4).unwrap().recognize().unwrap();
            assert_eq!(recognized.confidences().unwrap(), vec![80, 40]);
            assert_eq!(recognized.boxes().unwrap().len(), 2);
            assert_eq!(recognized.text().unwrap(), "Hello World\n");
        }

        let image = engine.last_image().unwrap();
        assert_eq!(image.bytes_per_line, 8);
        assert_eq!(image.data.len(), 24);

        let stats = engine.stats();
        assert_eq!(stats.outstanding_texts, 0);
        assert_eq!(stats.outstanding_confidences, 0);
        assert_eq!(stats.outstanding_box_arrays, 0);
        assert_eq!(stats.clears, 1);
        assert!(session.is_ready());
    }

    #[test]
    fn test_recognize_failure_keeps_session_ready() {
        let engine = Arc::new(ScriptedEngine::new(hello_output().with_recognize_code(-1)));
        let mut session = ready_session(&engine);
        let buffer = NativeBuffer::copy_from(&[0u8; 16]).unwrap();

        {
            let result = session.submit_image(&buffer, 2, 2, 4).unwrap().recognize();
            assert!(matches!(result, Err(EngineError::RecognitionFailed(-1))));
        }
        assert!(session.is_ready());
        assert_eq!(engine.stats().recognitions, 0);
    }

    #[test]
    fn test_null_text_is_no_text() {
        let mut output = hello_output();
        output.text = None;
        let engine = Arc::new(ScriptedEngine::new(output));
        let mut session = ready_session(&engine);
        let buffer = NativeBuffer::copy_from(&[0u8; 16]).unwrap();

        let recognized = session.submit_image(&buffer, 2, 2, 4).unwrap().recognize().unwrap();
        assert_eq!(recognized.text(), Err(EngineError::NoText));
    }

    #[test]
    fn test_box_array_kept_by_engine_still_decodes() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()).without_box_release());
        let mut session = ready_session(&engine);
        let buffer = NativeBuffer::copy_from(&[0u8; 16]).unwrap();

        {
            let recognized = session.submit_image(&buffer, 2, 2, 4).unwrap().recognize().unwrap();
            let boxes = recognized.boxes().unwrap();
            assert_eq!(boxes.len(), 2);
            assert_eq!(boxes[0], BoundingBox { x: 10, y: 5, width: 20, height: 8, refcount: 1 });
        }

        // The engine keeps ownership; nothing was freed on its behalf.
        assert_eq!(engine.stats().outstanding_box_arrays, 1);
        assert!(session.is_ready());
    }

    #[test]
    fn test_max_words_caps_confidence_array() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let mut session = Session::new(Arc::clone(&engine)).with_max_words(1);
        session.init("eng", "/data/tessdata").unwrap();
        let buffer = NativeBuffer::copy_from(&[0u8; 16]).unwrap();

        {
            let recognized = session.submit_image(&buffer, 2, 2, 4).unwrap().recognize().unwrap();
            assert_eq!(recognized.confidences(), Err(EngineError::ConfidenceArrayTooLong(1)));
            assert!(matches!(recognized.boxes(), Err(EngineError::MalformedBoxArray(_))));
        }

        let stats = engine.stats();
        assert_eq!(stats.outstanding_confidences, 0);
        assert_eq!(stats.outstanding_box_arrays, 0);
    }

    #[test]
    fn test_version() {
        let engine = Arc::new(ScriptedEngine::new(hello_output()));
        let session = Session::new(engine);
        assert_eq!(session.version().as_deref(), Some("5.3.0-scripted"));
    }
}
