//! Native record layouts shared with the engine.

use std::ffi::{c_int, c_void};

/// Opaque engine handle as passed across the native boundary.
pub type RawHandle = *mut c_void;

/// Box record as laid out by the engine's image library.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawBox {
    pub x: c_int,
    pub y: c_int,
    pub w: c_int,
    pub h: c_int,
    pub refcount: c_int,
}

/// Box array header: `n` live entries out of `nalloc` allocated, followed by a
/// pointer to an array of `n` box pointers.
#[repr(C)]
#[derive(Debug)]
pub struct RawBoxa {
    pub n: c_int,
    pub nalloc: c_int,
    pub refcount: c_int,
    pub boxes: *mut *mut RawBox,
}

/// Word bounding box copied out of the engine's result.
///
/// Coordinates are in the engine's frame; see the pipeline for the conversion
/// into bitmap space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Engine-side reference count at decode time. Informational only.
    pub refcount: i32,
}

impl From<RawBox> for BoundingBox {
    fn from(raw: RawBox) -> Self {
        Self {
            x: raw.x,
            y: raw.y,
            width: raw.w,
            height: raw.h,
            refcount: raw.refcount,
        }
    }
}
