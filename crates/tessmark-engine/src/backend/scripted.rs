//! In-process engine that replays a configured result.
//!
//! `ScriptedEngine` implements the raw call surface the way the native engine
//! does: every pointer it hands out is a real allocation that stays valid
//! until released through the matching deletion call. It keeps a ledger of
//! handles and result buffers so callers can check that everything they
//! obtained was released, and it panics on double frees.

use std::collections::{HashMap, HashSet};
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;
use std::sync::Mutex;

use crate::backend::EngineApi;
use crate::raw::{RawBox, RawBoxa, RawHandle};

/// What the scripted engine reports after `recognize`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedOutput {
    /// Text returned by `get_utf8_text`; `None` returns null.
    pub text: Option<String>,
    /// Word confidences; the sentinel is appended on output. `None` returns null.
    pub confidences: Option<Vec<i32>>,
    /// Word boxes in engine order. `None` returns a null box array.
    pub boxes: Option<Vec<RawBox>>,
    /// Return code of `recognize`.
    pub recognize_code: i32,
}

impl ScriptedOutput {
    /// Build an aligned result from `(word, confidence, [x, y, w, h])` entries.
    pub fn words(words: &[(&str, i32, [i32; 4])]) -> Self {
        let text = words.iter().map(|(word, _, _)| *word).collect::<Vec<_>>().join(" ");
        Self {
            text: Some(format!("{}\n", text)),
            confidences: Some(words.iter().map(|(_, conf, _)| *conf).collect()),
            boxes: Some(
                words
                    .iter()
                    .map(|(_, _, [x, y, w, h])| RawBox { x: *x, y: *y, w: *w, h: *h, refcount: 1 })
                    .collect(),
            ),
            recognize_code: 0,
        }
    }

    /// Set the return code of `recognize`.
    pub fn with_recognize_code(mut self, code: i32) -> Self {
        self.recognize_code = code;
        self
    }
}

/// One lifecycle call observed by the scripted engine, keyed by handle id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Create(u64),
    Init(u64),
    End(u64),
    Delete(u64),
}

/// Image most recently passed to `set_image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedImage {
    pub data: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub bytes_per_pixel: i32,
    pub bytes_per_line: i32,
}

/// Snapshot of the engine's allocation ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedStats {
    pub live_handles: usize,
    pub outstanding_texts: usize,
    pub outstanding_confidences: usize,
    pub outstanding_box_arrays: usize,
    pub recognitions: usize,
    pub clears: usize,
}

struct BoxaAllocation {
    header: usize,
    entries: usize,
    records: usize,
    len: usize,
}

#[derive(Default)]
struct HandleState {
    initialized: bool,
    image_set: bool,
}

#[derive(Default)]
struct Ledger {
    next_id: u64,
    handles: HashMap<usize, (u64, HandleState)>,
    texts: HashSet<usize>,
    confidences: HashMap<usize, usize>,
    box_arrays: HashMap<usize, BoxaAllocation>,
    events: Vec<EngineEvent>,
    last_image: Option<SubmittedImage>,
    last_init: Option<(String, String)>,
    recognitions: usize,
    clears: usize,
}

/// Engine double that behaves like the native API.
pub struct ScriptedEngine {
    version: CString,
    init_code: c_int,
    null_create: bool,
    release_boxes: bool,
    output: Mutex<ScriptedOutput>,
    ledger: Mutex<Ledger>,
}

impl ScriptedEngine {
    /// Create an engine that reports `output` after every recognition.
    pub fn new(output: ScriptedOutput) -> Self {
        Self {
            version: CString::from(c"5.3.0-scripted"),
            init_code: 0,
            null_create: false,
            release_boxes: true,
            output: Mutex::new(output),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Make `init3` return `code`.
    pub fn with_init_code(mut self, code: i32) -> Self {
        self.init_code = code;
        self
    }

    /// Make `create` return a null handle.
    pub fn with_null_create(mut self) -> Self {
        self.null_create = true;
        self
    }

    /// Behave like a backend without a box array release function.
    pub fn without_box_release(mut self) -> Self {
        self.release_boxes = false;
        self
    }

    /// Replace the reported output.
    pub fn set_output(&self, output: ScriptedOutput) {
        *self.output.lock().unwrap_or_else(|e| e.into_inner()) = output;
    }

    /// Current allocation ledger.
    pub fn stats(&self) -> ScriptedStats {
        let ledger = self.ledger();
        ScriptedStats {
            live_handles: ledger.handles.len(),
            outstanding_texts: ledger.texts.len(),
            outstanding_confidences: ledger.confidences.len(),
            outstanding_box_arrays: ledger.box_arrays.len(),
            recognitions: ledger.recognitions,
            clears: ledger.clears,
        }
    }

    /// Lifecycle calls in the order they happened.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.ledger().events.clone()
    }

    /// The image passed to the most recent `set_image`.
    pub fn last_image(&self) -> Option<SubmittedImage> {
        self.ledger().last_image.clone()
    }

    /// `(data_path, language)` passed to the most recent `init3`.
    pub fn last_init(&self) -> Option<(String, String)> {
        self.ledger().last_init.clone()
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current_output(&self) -> ScriptedOutput {
        self.output.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn with_handle<R>(&self, handle: RawHandle, f: impl FnOnce(u64, &mut HandleState, &mut Ledger) -> R) -> R {
        let mut ledger = self.ledger();
        let (id, mut state) = match ledger.handles.remove(&(handle as usize)) {
            Some(entry) => entry,
            None => panic!("scripted engine: call on unknown handle {:p}", handle),
        };
        let result = f(id, &mut state, &mut ledger);
        ledger.handles.insert(handle as usize, (id, state));
        result
    }
}

unsafe impl EngineApi for ScriptedEngine {
    fn version(&self) -> *const c_char {
        self.version.as_ptr()
    }

    fn create(&self) -> RawHandle {
        if self.null_create {
            return ptr::null_mut();
        }
        let mut ledger = self.ledger();
        ledger.next_id += 1;
        let id = ledger.next_id;
        let handle = Box::into_raw(Box::new(id)) as RawHandle;
        ledger.handles.insert(handle as usize, (id, HandleState::default()));
        ledger.events.push(EngineEvent::Create(id));
        handle
    }

    unsafe fn init3(
        &self,
        handle: RawHandle,
        data_path: *const c_char,
        language: *const c_char,
    ) -> c_int {
        // Safety: the caller passes NUL-terminated strings.
        let data_path = unsafe { CStr::from_ptr(data_path) }.to_string_lossy().into_owned();
        let language = unsafe { CStr::from_ptr(language) }.to_string_lossy().into_owned();
        let code = self.init_code;

        self.with_handle(handle, |id, state, ledger| {
            ledger.events.push(EngineEvent::Init(id));
            ledger.last_init = Some((data_path, language));
            state.initialized = code == 0;
        });
        code
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
        let len = (height.max(0) as usize) * (bytes_per_line.max(0) as usize);
        // Safety: the caller guarantees `height * bytes_per_line` readable bytes.
        let data = unsafe { std::slice::from_raw_parts(data, len) }.to_vec();

        self.with_handle(handle, |_, state, ledger| {
            assert!(state.initialized, "scripted engine: set_image before init");
            state.image_set = true;
            ledger.last_image = Some(SubmittedImage {
                data,
                width,
                height,
                bytes_per_pixel,
                bytes_per_line,
            });
        });
    }

    unsafe fn recognize(&self, handle: RawHandle, _monitor: *mut c_void) -> c_int {
        let code = self.current_output().recognize_code;
        self.with_handle(handle, |_, state, ledger| {
            if !state.initialized || !state.image_set {
                return -1;
            }
            if code == 0 {
                ledger.recognitions += 1;
            }
            code
        })
    }

    unsafe fn get_utf8_text(&self, handle: RawHandle) -> *mut c_char {
        let output = self.current_output();
        self.with_handle(handle, |_, _, ledger| match output.text {
            Some(text) => {
                let text = CString::new(text.replace('\0', " ")).unwrap_or_default();
                let raw = text.into_raw();
                ledger.texts.insert(raw as usize);
                raw
            }
            None => ptr::null_mut(),
        })
    }

    unsafe fn delete_text(&self, text: *mut c_char) {
        let mut ledger = self.ledger();
        assert!(
            ledger.texts.remove(&(text as usize)),
            "scripted engine: text {:p} freed twice or never allocated",
            text
        );
        // Safety: allocated by `CString::into_raw` in `get_utf8_text`.
        drop(unsafe { CString::from_raw(text) });
    }

    unsafe fn clear(&self, handle: RawHandle) {
        self.with_handle(handle, |_, state, ledger| {
            state.image_set = false;
            ledger.clears += 1;
        });
    }

    unsafe fn all_word_confidences(&self, handle: RawHandle) -> *mut c_int {
        let output = self.current_output();
        self.with_handle(handle, |_, _, ledger| match output.confidences {
            Some(mut values) => {
                values.push(crate::decode::CONFIDENCE_SENTINEL);
                let len = values.len();
                let raw = Box::into_raw(values.into_boxed_slice()) as *mut c_int;
                ledger.confidences.insert(raw as usize, len);
                raw
            }
            None => ptr::null_mut(),
        })
    }

    unsafe fn delete_int_array(&self, array: *mut c_int) {
        let mut ledger = self.ledger();
        let Some(len) = ledger.confidences.remove(&(array as usize)) else {
            panic!("scripted engine: int array {:p} freed twice or never allocated", array);
        };
        // Safety: allocated as a boxed slice of `len` values.
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(array, len)) });
    }

    unsafe fn get_words(&self, handle: RawHandle, _pixa: *mut *mut c_void) -> *mut RawBoxa {
        let output = self.current_output();
        self.with_handle(handle, |_, _, ledger| {
            let Some(boxes) = output.boxes else {
                return ptr::null_mut();
            };

            let len = boxes.len();
            let records = Box::into_raw(boxes.into_boxed_slice()) as *mut RawBox;
            let entries: Box<[*mut RawBox]> =
                (0..len).map(|i| unsafe { records.add(i) }).collect();
            let entries = Box::into_raw(entries) as *mut *mut RawBox;
            let header = Box::into_raw(Box::new(RawBoxa {
                n: len as c_int,
                nalloc: len as c_int,
                refcount: 1,
                boxes: entries,
            }));

            ledger.box_arrays.insert(
                header as usize,
                BoxaAllocation {
                    header: header as usize,
                    entries: entries as usize,
                    records: records as usize,
                    len,
                },
            );
            header
        })
    }

    unsafe fn destroy_boxa(&self, boxa: *mut *mut RawBoxa) -> bool {
        if !self.release_boxes {
            return false;
        }

        // Safety: the caller passes a pointer to a pointer from `get_words`.
        let header = unsafe { *boxa };
        let mut ledger = self.ledger();
        let Some(alloc) = ledger.box_arrays.remove(&(header as usize)) else {
            panic!("scripted engine: box array {:p} freed twice or never allocated", header);
        };

        // Safety: the three blocks were leaked from boxes in `get_words`.
        unsafe {
            drop(Box::from_raw(alloc.header as *mut RawBoxa));
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                alloc.entries as *mut *mut RawBox,
                alloc.len,
            )));
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                alloc.records as *mut RawBox,
                alloc.len,
            )));
            *boxa = ptr::null_mut();
        }
        true
    }

    unsafe fn end(&self, handle: RawHandle) {
        self.with_handle(handle, |id, state, ledger| {
            ledger.events.push(EngineEvent::End(id));
            state.initialized = false;
        });
    }

    unsafe fn delete(&self, handle: RawHandle) {
        let mut ledger = self.ledger();
        let Some((id, _)) = ledger.handles.remove(&(handle as usize)) else {
            panic!("scripted engine: handle {:p} deleted twice or never created", handle);
        };
        ledger.events.push(EngineEvent::Delete(id));
        // Safety: allocated by `Box::into_raw` in `create`.
        drop(unsafe { Box::from_raw(handle as *mut u64) });
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        let ledger = self.ledger.get_mut().unwrap_or_else(|e| e.into_inner());

        // Reclaim anything the caller leaked.
        for (addr, _) in ledger.handles.drain() {
            drop(unsafe { Box::from_raw(addr as *mut u64) });
        }
        for addr in ledger.texts.drain() {
            drop(unsafe { CString::from_raw(addr as *mut c_char) });
        }
        for (addr, len) in ledger.confidences.drain() {
            drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(addr as *mut c_int, len)) });
        }
        for (_, alloc) in ledger.box_arrays.drain() {
            unsafe {
                drop(Box::from_raw(alloc.header as *mut RawBoxa));
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    alloc.entries as *mut *mut RawBox,
                    alloc.len,
                )));
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    alloc.records as *mut RawBox,
                    alloc.len,
                )));
            }
        }
    }
}
