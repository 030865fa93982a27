//! Deterministic checkerboard fill
//!
//! The test pattern the classic tutorial clients draw: 8x8 pixel tiles
//! alternating between two grays, optionally scrolled by an offset. The
//! cell function is pure, which makes the pattern usable as a golden
//! fixture when verifying buffer contents end to end.

/// Color of the dark tiles, XRGB8888.
pub const DARK: u32 = 0xFF66_6666;
/// Color of the light tiles, XRGB8888.
pub const LIGHT: u32 = 0xFFEE_EEEE;

/// Tile edge in pixels.
const TILE: u32 = 8;
/// The pattern repeats every two tiles.
const PERIOD: u32 = 16;

/// Color of pixel `(x, y)` with the pattern scrolled by `offset` on both
/// axes.
pub fn checker_pixel(x: u32, y: u32, offset: u32) -> u32 {
    let x = x.wrapping_add(offset);
    let y = y.wrapping_add(offset);
    if (x.wrapping_add(y / TILE * TILE)) % PERIOD < TILE {
        DARK
    } else {
        LIGHT
    }
}

/// Fill `pixels` with the checkerboard, writing little-endian 32-bit
/// pixels row by row.
///
/// Bytes past `width * 4` in each row are left untouched.
///
/// # Panics
///
/// Panics if `stride` does not cover `width * 4` bytes per row, or if
/// `pixels` holds fewer than `stride * height` bytes.
pub fn fill_checkerboard(pixels: &mut [u8], width: u32, height: u32, stride: u32, offset: u32) {
    assert!(
        (stride as usize) >= (width as usize) * 4,
        "stride must cover width * 4 bytes"
    );
    assert!(
        pixels.len() >= (stride as usize) * (height as usize),
        "pixel slice too small for stride * height"
    );
    for y in 0..height {
        let row = (y as usize) * (stride as usize);
        for x in 0..width {
            let at = row + (x as usize) * 4;
            pixels[at..at + 4].copy_from_slice(&checker_pixel(x, y, offset).to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel_at(pixels: &[u8], x: u32, y: u32, stride: u32) -> u32 {
        let at = (y as usize) * (stride as usize) + (x as usize) * 4;
        u32::from_le_bytes([pixels[at], pixels[at + 1], pixels[at + 2], pixels[at + 3]])
    }

    #[test]
    fn test_origin_is_dark() {
        assert_eq!(checker_pixel(0, 0, 0), DARK);
    }

    #[test]
    fn test_first_row_alternates_every_eight() {
        let mut pixels = vec![0u8; 16 * 4];
        fill_checkerboard(&mut pixels, 16, 1, 16 * 4, 0);
        for x in 0..8 {
            assert_eq!(pixel_at(&pixels, x, 0, 16 * 4), DARK, "x={x}");
        }
        for x in 8..16 {
            assert_eq!(pixel_at(&pixels, x, 0, 16 * 4), LIGHT, "x={x}");
        }
    }

    #[test]
    fn test_top_left_tile_is_solid() {
        let mut pixels = vec![0u8; 8 * 8 * 4];
        fill_checkerboard(&mut pixels, 8, 8, 8 * 4, 0);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(pixel_at(&pixels, x, y, 8 * 4), DARK, "({x},{y})");
            }
        }
    }

    #[test]
    fn test_tiles_flip_across_row_boundary() {
        assert_eq!(checker_pixel(0, 7, 0), DARK);
        assert_eq!(checker_pixel(0, 8, 0), LIGHT);
        assert_eq!(checker_pixel(8, 8, 0), DARK);
    }

    #[test]
    fn test_offset_scrolls_the_pattern() {
        // A full tile of scroll moves each pixel diagonally into the
        // opposite-colored tile... except that x and y shift together, so
        // shifting both by 8 lands back on the same color.
        assert_eq!(checker_pixel(0, 0, 8), checker_pixel(8, 8, 0));
        // A single pixel of scroll matches the pixel one step down-right.
        for x in 0..16 {
            for y in 0..16 {
                assert_eq!(checker_pixel(x, y, 1), checker_pixel(x + 1, y + 1, 0));
            }
        }
    }

    #[test]
    #[should_panic(expected = "pixel slice too small")]
    fn test_undersized_slice_panics_up_front() {
        let mut pixels = vec![0u8; 8];
        fill_checkerboard(&mut pixels, 4, 2, 16, 0);
    }

    #[test]
    #[should_panic(expected = "stride must cover")]
    fn test_narrow_stride_panics_up_front() {
        let mut pixels = vec![0u8; 64];
        fill_checkerboard(&mut pixels, 4, 2, 8, 0);
    }

    #[test]
    fn test_stride_padding_left_untouched() {
        // 4 pixels wide but a 32-byte stride; the pad bytes stay zero.
        let stride = 32u32;
        let mut pixels = vec![0u8; (stride * 2) as usize];
        fill_checkerboard(&mut pixels, 4, 2, stride, 0);
        for y in 0..2usize {
            for pad in 16..32usize {
                assert_eq!(pixels[y * 32 + pad], 0);
            }
        }
    }
}
