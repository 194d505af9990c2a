//! Unmanaged image storage handed to the engine.

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::error::EngineError;
use crate::Result;

static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD_LIVE_BYTES: Cell<usize> = const { Cell::new(0) };
}

/// A heap block outside any Rust collection, holding one encoded image for
/// the duration of a native call.
///
/// The block is allocated once, never reallocated (so its address is stable
/// while the engine holds it), and freed exactly once in `Drop`.
pub struct NativeBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl NativeBuffer {
    /// Allocate a block the size of `bytes` and copy them in.
    pub fn copy_from(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(EngineError::InvalidImage("empty pixel buffer".to_string()));
        }

        let layout = Layout::from_size_align(bytes.len(), align_of::<u32>())
            .map_err(|e| EngineError::InvalidImage(e.to_string()))?;

        // Safety: the layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            alloc::handle_alloc_error(layout);
        };

        // Safety: `ptr` is a fresh allocation of `bytes.len()` bytes and
        // cannot overlap `bytes`.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len()) };

        LIVE_BYTES.fetch_add(layout.size(), Ordering::SeqCst);
        THREAD_LIVE_BYTES.with(|live| live.set(live.get() + layout.size()));
        trace!("Allocated native buffer of {} bytes", layout.size());

        Ok(Self { ptr, layout })
    }

    /// Address of the first byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Size of the block in bytes.
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Always false; empty buffers are rejected at allocation.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// View the block as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        // Safety: the block is initialized by `copy_from` and lives as long
        // as `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Bytes currently held by native buffers across the process.
    pub fn live_bytes() -> usize {
        LIVE_BYTES.load(Ordering::SeqCst)
    }

    /// Bytes currently held by native buffers allocated on this thread.
    pub fn live_bytes_on_thread() -> usize {
        THREAD_LIVE_BYTES.with(Cell::get)
    }
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        // Safety: allocated in `copy_from` with this exact layout and freed
        // only here.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };

        LIVE_BYTES.fetch_sub(self.layout.size(), Ordering::SeqCst);
        THREAD_LIVE_BYTES.with(|live| live.set(live.get().saturating_sub(self.layout.size())));
        trace!("Released native buffer of {} bytes", self.layout.size());
    }
}

impl std::fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.layout.size())
            .finish()
    }
}
