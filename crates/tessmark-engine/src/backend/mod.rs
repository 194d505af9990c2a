//! Engine backend implementations.

#[cfg(feature = "native")]
pub mod tesseract;

#[cfg(any(test, feature = "scripted"))]
pub mod scripted;

use std::ffi::{c_char, c_int, c_void};

use crate::raw::{RawBoxa, RawHandle};

/// Raw call surface of an OCR engine.
///
/// Every method maps one-to-one onto a function of the engine's C API. The
/// typed, checked layer on top of it is [`crate::Session`]; nothing outside
/// this crate calls these methods directly.
///
/// # Safety
///
/// Implementors must behave like the engine's C API:
/// - `create` returns either null or a handle valid until `delete`
/// - pointers returned by `get_utf8_text`, `all_word_confidences` and
///   `get_words` stay valid until released through the matching deletion
///   method, and are not touched by the engine after that
/// - `all_word_confidences` returns null or an array terminated by `-1`
pub unsafe trait EngineApi: Send + Sync {
    /// Version string owned by the engine, or null.
    fn version(&self) -> *const c_char;

    /// Allocate a new engine handle.
    fn create(&self) -> RawHandle;

    /// # Safety
    /// `handle` must come from `create` and not yet be deleted; both strings
    /// must be NUL-terminated.
    unsafe fn init3(
        &self,
        handle: RawHandle,
        data_path: *const c_char,
        language: *const c_char,
    ) -> c_int;

    /// # Safety
    /// `data` must point to `height * bytes_per_line` readable bytes that stay
    /// valid until `recognize` returns.
    unsafe fn set_image(
        &self,
        handle: RawHandle,
        data: *const u8,
        width: c_int,
        height: c_int,
        bytes_per_pixel: c_int,
        bytes_per_line: c_int,
    );

    /// # Safety
    /// `handle` must be initialized and have an image set.
    unsafe fn recognize(&self, handle: RawHandle, monitor: *mut c_void) -> c_int;

    /// # Safety
    /// `handle` must be live.
    unsafe fn get_utf8_text(&self, handle: RawHandle) -> *mut c_char;

    /// # Safety
    /// `text` must come from `get_utf8_text` and be released only once.
    unsafe fn delete_text(&self, text: *mut c_char);

    /// # Safety
    /// `handle` must be live.
    unsafe fn clear(&self, handle: RawHandle);

    /// # Safety
    /// `handle` must be live.
    unsafe fn all_word_confidences(&self, handle: RawHandle) -> *mut c_int;

    /// # Safety
    /// `array` must come from `all_word_confidences` and be released only once.
    unsafe fn delete_int_array(&self, array: *mut c_int);

    /// # Safety
    /// `handle` must be live; `pixa` may be null.
    unsafe fn get_words(&self, handle: RawHandle, pixa: *mut *mut c_void) -> *mut RawBoxa;

    /// Release a box array returned by `get_words` and null the caller's
    /// pointer. Returns `false` when the backend cannot release box arrays.
    ///
    /// # Safety
    /// `boxa` must point to a pointer obtained from `get_words`.
    unsafe fn destroy_boxa(&self, boxa: *mut *mut RawBoxa) -> bool;

    /// # Safety
    /// `handle` must be live.
    unsafe fn end(&self, handle: RawHandle);

    /// # Safety
    /// `handle` must be live; it is invalid afterwards.
    unsafe fn delete(&self, handle: RawHandle);
}
