//! Pixel formats
//!
//! The format tag travels with the buffer hand-off as a raw `wl_shm`
//! format code. A pixel size is only defined for the formats this crate
//! knows how to allocate; anything else is carried opaquely and refused
//! at allocation time instead of being sized by guesswork.

/// Pixel layout of a shared buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32 bits per pixel, alpha in the high byte
    Argb8888,
    /// 32 bits per pixel, high byte unused
    Xrgb8888,
    /// 16 bits per pixel, 5-6-5 packing
    Rgb565,
    /// A format this crate cannot size, carried as its raw code
    Other(u32),
}

/// `wl_shm` uses the fourcc 'RG16' for 16-bit 5-6-5.
const RGB565_CODE: u32 = 0x3631_4752;

impl PixelFormat {
    /// Interpret a raw `wl_shm` format code.
    pub fn from_wayland(code: u32) -> Self {
        match code {
            0 => PixelFormat::Argb8888,
            1 => PixelFormat::Xrgb8888,
            RGB565_CODE => PixelFormat::Rgb565,
            other => PixelFormat::Other(other),
        }
    }

    /// The raw `wl_shm` format code for the hand-off.
    pub fn to_wayland(&self) -> u32 {
        match self {
            PixelFormat::Argb8888 => 0,
            PixelFormat::Xrgb8888 => 1,
            PixelFormat::Rgb565 => RGB565_CODE,
            PixelFormat::Other(code) => *code,
        }
    }

    /// Bytes per pixel, or `None` for formats with no defined size.
    ///
    /// This drives how large the backing store is allocated, so there is
    /// no fallback value for [`PixelFormat::Other`].
    pub fn bytes_per_pixel(&self) -> Option<u32> {
        match self {
            PixelFormat::Argb8888 | PixelFormat::Xrgb8888 => Some(4),
            PixelFormat::Rgb565 => Some(2),
            PixelFormat::Other(_) => None,
        }
    }
}
