//! Decoders for the engine's native result structures.
//!
//! Both decoders copy into owned vectors before returning. The engine may
//! reuse or free its buffers on the next call, so raw result pointers never
//! leave this module.

use std::ffi::c_int;
use std::mem::size_of;

use tracing::trace;

use crate::error::EngineError;
use crate::raw::{BoundingBox, RawBox, RawBoxa};
use crate::Result;

/// Terminator of the confidence array.
pub const CONFIDENCE_SENTINEL: c_int = -1;

/// Decode a sentinel-terminated confidence array.
///
/// Reads `i32` values until [`CONFIDENCE_SENTINEL`]; the sentinel itself is
/// not part of the result. At most `max_words` values are read before the
/// array is rejected as unterminated.
///
/// # Safety
/// `ptr` must be null or point to readable `c_int`s up to and including the
/// first sentinel, or to at least `max_words + 1` values.
pub unsafe fn decode_confidences(ptr: *const c_int, max_words: usize) -> Result<Vec<i32>> {
    if ptr.is_null() {
        return Err(EngineError::MalformedConfidenceArray(
            "null array pointer".to_string(),
        ));
    }

    let mut confidences = Vec::new();

    for index in 0..=max_words {
        // Safety: the caller guarantees readability up to the sentinel, and
        // we never read past index `max_words`.
        let value = unsafe { ptr.add(index).read() };

        if value == CONFIDENCE_SENTINEL {
            trace!("Decoded {} word confidences", confidences.len());
            return Ok(confidences);
        }
        if value < 0 {
            return Err(EngineError::MalformedConfidenceArray(format!(
                "negative confidence {} at index {}",
                value, index
            )));
        }
        if index == max_words {
            break;
        }

        confidences.push(value);
    }

    Err(EngineError::ConfidenceArrayTooLong(max_words))
}

/// Decode a box array into owned bounding boxes, in engine order.
///
/// The array and its records are only read; reference counts are copied but
/// never modified.
///
/// # Safety
/// `ptr` must be null or point to a valid box array header whose entry table
/// holds `n` pointers to valid box records.
pub unsafe fn decode_boxes(ptr: *const RawBoxa, max_words: usize) -> Result<Vec<BoundingBox>> {
    if ptr.is_null() {
        return Err(EngineError::MalformedBoxArray(
            "null header pointer".to_string(),
        ));
    }

    // Safety: non-null and valid per the caller's contract.
    let header = unsafe { &*ptr };

    if header.n < 0 {
        return Err(EngineError::MalformedBoxArray(format!(
            "negative count {}",
            header.n
        )));
    }
    if header.n > header.nalloc {
        return Err(EngineError::MalformedBoxArray(format!(
            "count {} exceeds capacity {}",
            header.n, header.nalloc
        )));
    }

    let count = header.n as usize;
    if count > max_words {
        return Err(EngineError::MalformedBoxArray(format!(
            "count {} exceeds limit {}",
            count, max_words
        )));
    }
    if count == 0 {
        return Ok(Vec::new());
    }
    if header.boxes.is_null() {
        return Err(EngineError::MalformedBoxArray(format!(
            "null entry table with count {}",
            count
        )));
    }

    let mut boxes = Vec::with_capacity(count);

    for index in 0..count {
        // Safety: the entry table holds `count` pointer-sized slots.
        let entry = unsafe { header.boxes.add(index).read() };
        if entry.is_null() {
            return Err(EngineError::MalformedBoxArray(format!(
                "null entry at index {}",
                index
            )));
        }

        // Safety: non-null entries point to valid box records.
        let raw: RawBox = unsafe { entry.read() };
        boxes.push(BoundingBox::from(raw));
    }

    trace!(
        "Decoded {} boxes ({} bytes of entry pointers)",
        boxes.len(),
        count * size_of::<*mut RawBox>()
    );

    Ok(boxes)
}
