//! Pixel grid used as recognition input and highlight output.

use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TessmarkError};

/// Bytes per encoded pixel (R, G, B, A).
pub const BYTES_PER_PIXEL: u32 = 4;

/// RGBA bitmap with its origin at the bottom-left corner.
///
/// Row 0 is the bottom row of the picture, the texture convention of the
/// image sources this crate was built for. [`Bitmap::from_rgba_image`] and
/// [`Bitmap::to_rgba_image`] flip rows to and from the `image` crate's
/// top-left convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Create a bitmap filled with `color`.
    pub fn new(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let data = color
            .0
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * BYTES_PER_PIXEL as usize)
            .collect();
        Self { width, height, data }
    }

    /// Convert from a top-left origin image.
    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let row_len = width as usize * BYTES_PER_PIXEL as usize;
        let raw = image.as_raw();

        let mut data = Vec::with_capacity(raw.len());
        for row in raw.chunks_exact(row_len.max(1)).rev() {
            data.extend_from_slice(row);
        }

        Self { width, height, data }
    }

    /// Convert from any decoded image.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from_rgba_image(&image.to_rgba8())
    }

    /// Convert to a top-left origin image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            self.pixel(x, self.height - 1 - y)
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at `(x, y)`, counting rows from the bottom.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        let offset = self.offset(x, y);
        Rgba([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Pixel at signed coordinates, or `None` outside the bitmap.
    pub fn get_pixel(&self, x: i64, y: i64) -> Option<Rgba<u8>> {
        self.contains(x, y).then(|| self.pixel(x as u32, y as u32))
    }

    /// Set a pixel if it lies inside the bitmap. Returns whether it was written.
    pub fn put_pixel_clipped(&mut self, x: i64, y: i64, color: Rgba<u8>) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        let offset = self.offset(x as u32, y as u32);
        self.data[offset..offset + BYTES_PER_PIXEL as usize].copy_from_slice(&color.0);
        true
    }

    /// Whether signed coordinates fall inside the bitmap.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Encode for the engine: rows from the last stored row to the first,
    /// columns left to right, 4 bytes per pixel in R, G, B, A order.
    pub fn encode_bottom_up(&self) -> PixelBuffer {
        let row_len = self.width as usize * BYTES_PER_PIXEL as usize;
        let mut data = Vec::with_capacity(self.data.len());

        for row in self.data.chunks_exact(row_len.max(1)).rev() {
            data.extend_from_slice(row);
        }

        PixelBuffer {
            width: self.width,
            height: self.height,
            data,
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({}, {}) out of bounds", x, y);
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL as usize
    }
}

/// Encoded RGBA image in the byte order the engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap encoded bytes, checking `data.len() == width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL as usize;
        if data.len() != expected {
            return Err(TessmarkError::Config(format!(
                "pixel buffer holds {} bytes, {}x{} needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Axis-aligned rectangle in bitmap coordinates. May extend past the bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn test_rgba_image_round_trip_flips_rows() {
        let mut image = RgbaImage::from_pixel(3, 2, BLUE);
        image.put_pixel(0, 0, RED); // top-left

        let bitmap = Bitmap::from_rgba_image(&image);
        // Top-left of the picture is the last stored row.
        assert_eq!(bitmap.pixel(0, 1), RED);
        assert_eq!(bitmap.pixel(0, 0), BLUE);

        assert_eq!(bitmap.to_rgba_image(), image);
    }

    #[test]
    fn test_encode_puts_last_row_first() {
        let mut bitmap = Bitmap::new(2, 3, BLUE);
        bitmap.put_pixel_clipped(1, 2, RED);

        let encoded = bitmap.encode_bottom_up();
        assert_eq!(encoded.as_bytes().len(), 2 * 3 * 4);
        // Second pixel of the first encoded row.
        assert_eq!(&encoded.as_bytes()[4..8], &[255, 0, 0, 255]);
        assert_eq!(&encoded.as_bytes()[0..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_put_pixel_clipped() {
        let mut bitmap = Bitmap::new(2, 2, BLUE);
        assert!(!bitmap.put_pixel_clipped(-1, 0, RED));
        assert!(!bitmap.put_pixel_clipped(0, 2, RED));
        assert!(bitmap.put_pixel_clipped(1, 1, RED));
        assert_eq!(bitmap.get_pixel(1, 1), Some(RED));
        assert_eq!(bitmap.get_pixel(2, 1), None);
    }

    #[test]
    fn test_pixel_buffer_length_check() {
        assert!(PixelBuffer::new(2, 2, vec![0; 16]).is_ok());
        assert!(PixelBuffer::new(2, 2, vec![0; 15]).is_err());
    }
}
