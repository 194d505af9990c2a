//! Tesseract backend loaded at runtime through its C API.

use std::ffi::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, info};

use crate::backend::EngineApi;
use crate::error::EngineError;
use crate::raw::{RawBoxa, RawHandle};
use crate::Result;

type BoxaDestroyFn = unsafe extern "C" fn(*mut *mut RawBoxa);

/// Resolved Tesseract C API function pointers.
pub struct TesseractApi {
    _lib: Library,
    _leptonica: Option<Library>,
    version: unsafe extern "C" fn() -> *const c_char,
    create: unsafe extern "C" fn() -> RawHandle,
    init3: unsafe extern "C" fn(RawHandle, *const c_char, *const c_char) -> c_int,
    set_image: unsafe extern "C" fn(RawHandle, *const u8, c_int, c_int, c_int, c_int),
    recognize: unsafe extern "C" fn(RawHandle, *mut c_void) -> c_int,
    get_utf8_text: unsafe extern "C" fn(RawHandle) -> *mut c_char,
    delete_text: unsafe extern "C" fn(*mut c_char),
    clear: unsafe extern "C" fn(RawHandle),
    all_word_confidences: unsafe extern "C" fn(RawHandle) -> *mut c_int,
    delete_int_array: unsafe extern "C" fn(*const c_int),
    get_words: unsafe extern "C" fn(RawHandle, *mut *mut c_void) -> *mut RawBoxa,
    boxa_destroy: Option<BoxaDestroyFn>,
    end: unsafe extern "C" fn(RawHandle),
    delete: unsafe extern "C" fn(RawHandle),
}

// Safety: the struct holds function pointers into libraries it owns. The
// engine API is thread-safe across distinct handles, and `Session` never
// shares a handle between threads.
unsafe impl Send for TesseractApi {}
unsafe impl Sync for TesseractApi {}

impl TesseractApi {
    /// Platform file name of the Tesseract library (`libtesseract.so`,
    /// `tesseract.dll`, `libtesseract.dylib`).
    pub fn default_library() -> PathBuf {
        PathBuf::from(libloading::library_filename("tesseract"))
    }

    /// Load the Tesseract library and resolve every symbol the binding uses.
    ///
    /// `leptonica` names the image library that owns box arrays. When it is
    /// `None` the release function is looked up through the Tesseract library's
    /// own dependencies; if that fails too, box arrays are left to the engine.
    pub fn load(library: &Path, leptonica: Option<&Path>) -> Result<Self> {
        debug!("Loading engine library from: {}", library.display());

        // Safety: loading a shared library runs its initializers. The caller
        // names a Tesseract build; nothing else is assumed about it.
        let lib = unsafe { Library::new(library) }.map_err(|e| {
            EngineError::LibraryLoad(format!("'{}': {}", library.display(), e))
        })?;

        let leptonica = match leptonica {
            Some(path) => Some(unsafe { Library::new(path) }.map_err(|e| {
                EngineError::LibraryLoad(format!("'{}': {}", path.display(), e))
            })?),
            None => None,
        };

        // Safety: each symbol is resolved with the signature documented by the
        // Tesseract C API (capi.h) and leptonica (boxbasic.c).
        unsafe {
            let boxa_destroy = match &leptonica {
                Some(lept) => Some(symbol::<BoxaDestroyFn>(lept, b"boxaDestroy\0")?),
                None => symbol::<BoxaDestroyFn>(&lib, b"boxaDestroy\0").ok(),
            };
            if boxa_destroy.is_none() {
                debug!("boxaDestroy not found, box arrays stay with the engine");
            }

            let api = Self {
                version: symbol(&lib, b"TessVersion\0")?,
                create: symbol(&lib, b"TessBaseAPICreate\0")?,
                init3: symbol(&lib, b"TessBaseAPIInit3\0")?,
                set_image: symbol(&lib, b"TessBaseAPISetImage\0")?,
                recognize: symbol(&lib, b"TessBaseAPIRecognize\0")?,
                get_utf8_text: symbol(&lib, b"TessBaseAPIGetUTF8Text\0")?,
                delete_text: symbol(&lib, b"TessDeleteText\0")?,
                clear: symbol(&lib, b"TessBaseAPIClear\0")?,
                all_word_confidences: symbol(&lib, b"TessBaseAPIAllWordConfidences\0")?,
                delete_int_array: symbol(&lib, b"TessDeleteIntArray\0")?,
                get_words: symbol(&lib, b"TessBaseAPIGetWords\0")?,
                boxa_destroy,
                end: symbol(&lib, b"TessBaseAPIEnd\0")?,
                delete: symbol(&lib, b"TessBaseAPIDelete\0")?,
                _lib: lib,
                _leptonica: leptonica,
            };

            info!(library = %library.display(), "Engine library loaded");
            Ok(api)
        }
    }
}

/// Resolve a NUL-terminated symbol name to a function pointer of type `T`.
///
/// # Safety
/// `T` must match the symbol's real signature.
unsafe fn symbol<T: Copy>(lib: &Library, name: &[u8]) -> Result<T> {
    let printable = String::from_utf8_lossy(&name[..name.len().saturating_sub(1)]);
    let sym = unsafe { lib.get::<T>(name) }
        .map_err(|e| EngineError::LibraryLoad(format!("{}: {}", printable, e)))?;
    Ok(*sym)
}

unsafe impl EngineApi for TesseractApi {
    fn version(&self) -> *const c_char {
        // Safety: TessVersion takes no arguments and returns a static string.
        unsafe { (self.version)() }
    }

    fn create(&self) -> RawHandle {
        // Safety: TessBaseAPICreate takes no arguments.
        unsafe { (self.create)() }
    }

    unsafe fn init3(
        &self,
        handle: RawHandle,
        data_path: *const c_char,
        language: *const c_char,
    ) -> c_int {
        unsafe { (self.init3)(handle, data_path, language) }
    }

    unsafe fn set_image(
        &self,
        handle: RawHandle,
        data: *const u8,
        width: c_int,
        height: c_int,
        bytes_per_pixel: c_int,
        bytes_per_line: c_int,
    ) {
        unsafe { (self.set_image)(handle, data, width, height, bytes_per_pixel, bytes_per_line) }
    }

    unsafe fn recognize(&self, handle: RawHandle, monitor: *mut c_void) -> c_int {
        unsafe { (self.recognize)(handle, monitor) }
    }

    unsafe fn get_utf8_text(&self, handle: RawHandle) -> *mut c_char {
        unsafe { (self.get_utf8_text)(handle) }
    }

    unsafe fn delete_text(&self, text: *mut c_char) {
        unsafe { (self.delete_text)(text) }
    }

    unsafe fn clear(&self, handle: RawHandle) {
        unsafe { (self.clear)(handle) }
    }

    unsafe fn all_word_confidences(&self, handle: RawHandle) -> *mut c_int {
        unsafe { (self.all_word_confidences)(handle) }
    }

    unsafe fn delete_int_array(&self, array: *mut c_int) {
        unsafe { (self.delete_int_array)(array) }
    }

    unsafe fn get_words(&self, handle: RawHandle, pixa: *mut *mut c_void) -> *mut RawBoxa {
        unsafe { (self.get_words)(handle, pixa) }
    }

    unsafe fn destroy_boxa(&self, boxa: *mut *mut RawBoxa) -> bool {
        match self.boxa_destroy {
            Some(destroy) => {
                unsafe { destroy(boxa) };
                true
            }
            None => false,
        }
    }

    unsafe fn end(&self, handle: RawHandle) {
        unsafe { (self.end)(handle) }
    }

    unsafe fn delete(&self, handle: RawHandle) {
        unsafe { (self.delete)(handle) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_library_name() {
        let name = TesseractApi::default_library();
        let name = name.to_string_lossy();
        assert!(name.contains("tesseract"));
    }

    #[test]
    fn test_load_missing_library() {
        let result = TesseractApi::load(Path::new("/nonexistent/libtesseract-missing.so"), None);
        assert!(matches!(result, Err(EngineError::LibraryLoad(_))));
    }
}
