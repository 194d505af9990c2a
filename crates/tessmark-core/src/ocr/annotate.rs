//! Rectangle outlines drawn over recognized words.

use image::Rgba;

use crate::models::{Bitmap, Rect};

/// Default outline thickness in pixels.
pub const DEFAULT_THICKNESS: u32 = 3;

/// Draw the outline of `rect` onto `bitmap`.
///
/// Horizontal bands of `thickness` pixels run inward from `rect.y` and
/// `rect.y + rect.height`; vertical bands run inward from `rect.x` and
/// `rect.x + rect.width`. Pixels outside the bitmap are skipped.
pub fn draw_rectangle(bitmap: &mut Bitmap, rect: Rect, color: Rgba<u8>, thickness: u32) {
    if bitmap.width() == 0 || bitmap.height() == 0 {
        return;
    }

    let x1 = rect.x as i64;
    let x2 = x1 + rect.width as i64;
    let y1 = rect.y as i64;
    let y2 = y1 + rect.height as i64;
    let t = thickness as i64;

    let max_x = bitmap.width() as i64 - 1;
    let max_y = bitmap.height() as i64 - 1;

    // Visible part of each band.
    let columns = x1.max(0)..=x2.min(max_x);
    let rows = y1.max(0)..=y2.min(max_y);
    let bottom_band = y1.max(0)..=(y1 + t - 1).min(max_y);
    let top_band = (y2 - t + 1).max(0)..=y2.min(max_y);
    let left_band = x1.max(0)..=(x1 + t - 1).min(max_x);
    let right_band = (x2 - t + 1).max(0)..=x2.min(max_x);

    for x in columns {
        for y in bottom_band.clone().chain(top_band.clone()) {
            bitmap.put_pixel_clipped(x, y, color);
        }
    }

    for y in rows {
        for x in left_band.clone().chain(right_band.clone()) {
            bitmap.put_pixel_clipped(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const MAGENTA: Rgba<u8> = Rgba([255, 0, 255, 255]);

    fn count(bitmap: &Bitmap, color: Rgba<u8>) -> usize {
        let mut n = 0;
        for y in 0..bitmap.height() {
            for x in 0..bitmap.width() {
                if bitmap.pixel(x, y) == color {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_outline_thickness_one() {
        let mut bitmap = Bitmap::new(20, 20, WHITE);
        draw_rectangle(&mut bitmap, Rect::new(2, 3, 4, 5), MAGENTA, 1);

        // Perimeter of a 5x6 pixel box.
        assert_eq!(count(&bitmap, MAGENTA), 2 * 5 + 2 * 6 - 4);
        assert_eq!(bitmap.pixel(2, 3), MAGENTA);
        assert_eq!(bitmap.pixel(6, 8), MAGENTA);
        assert_eq!(bitmap.pixel(4, 5), WHITE);
    }

    #[test]
    fn test_outline_default_thickness_leaves_interior() {
        let mut bitmap = Bitmap::new(40, 40, WHITE);
        draw_rectangle(&mut bitmap, Rect::new(10, 10, 10, 10), MAGENTA, DEFAULT_THICKNESS);

        assert_eq!(bitmap.pixel(10, 10), MAGENTA);
        assert_eq!(bitmap.pixel(12, 15), MAGENTA);
        assert_eq!(bitmap.pixel(18, 15), MAGENTA);
        assert_eq!(bitmap.pixel(15, 15), WHITE);
        assert_eq!(bitmap.pixel(9, 9), WHITE);
        assert_eq!(bitmap.pixel(21, 21), WHITE);
    }

    #[test]
    fn test_outline_clipped_at_edges() {
        let mut bitmap = Bitmap::new(10, 10, WHITE);
        draw_rectangle(&mut bitmap, Rect::new(-5, 7, 20, 8), MAGENTA, 3);

        // Bottom band at y = 7..=9 spans the full width.
        for x in 0..10 {
            assert_eq!(bitmap.pixel(x, 7), MAGENTA);
        }
        assert_eq!(bitmap.pixel(5, 6), WHITE);
    }

    #[test]
    fn test_outline_fully_outside_is_noop() {
        let mut bitmap = Bitmap::new(10, 10, WHITE);
        let before = bitmap.clone();
        draw_rectangle(&mut bitmap, Rect::new(100, -50, 20, 8), MAGENTA, 3);
        assert_eq!(bitmap, before);
    }

    #[test]
    fn test_oversized_thickness_stays_bounded() {
        let mut bitmap = Bitmap::new(10, 10, WHITE);
        draw_rectangle(&mut bitmap, Rect::new(0, 0, 9, 9), MAGENTA, u32::MAX);

        assert_eq!(count(&bitmap, MAGENTA), 100);
    }

    #[test]
    fn test_thick_band_from_offscreen_edge_reaches_bitmap() {
        let mut bitmap = Bitmap::new(10, 10, WHITE);
        // Vertical edges far outside; bottom edge at y = -15 with a 20 pixel
        // band covering rows -15..=4, top edge at y = 25 covering rows 6..=25.
        draw_rectangle(&mut bitmap, Rect::new(-100, -15, 300, 40), MAGENTA, 20);

        for x in 0..10 {
            assert_eq!(bitmap.pixel(x, 4), MAGENTA);
            assert_eq!(bitmap.pixel(x, 5), WHITE);
            assert_eq!(bitmap.pixel(x, 6), MAGENTA);
        }
        assert_eq!(count(&bitmap, MAGENTA), 90);
    }
}
