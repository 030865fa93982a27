//! Shared pixel buffers
//!
//! Pairs an anonymous shm file with pixel geometry and exposes it as
//! directly addressable memory. The mapped views are shared mappings:
//! writes are visible to any other process mapping the same store, which
//! is how the compositor reads the pixels. Releasing a view is its `Drop`,
//! so a region can never be used after unmap.

use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::Path;

use log::debug;
use memmap2::{Mmap, MmapMut};

use crate::alloc::{AllocError, AnonShmFile};
use crate::format::PixelFormat;

/// Mapping failures
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("could not map shm buffer: {0}")]
    Map(#[source] io::Error),
}

/// Geometry handed to the protocol layer together with the descriptor
///
/// The protocol layer wraps this into its own shareable buffer object
/// (`wl_shm_pool` plus `wl_buffer` for Wayland).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandoff {
    pub size_bytes: u64,
    pub stride: u32,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// A pixel buffer backed by an anonymous shared-memory store
#[derive(Debug)]
pub struct SharedBuffer {
    shm: AnonShmFile,
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
    in_use: bool,
}

impl SharedBuffer {
    /// Allocate a buffer for `width` x `height` pixels of `format`.
    ///
    /// The stride is `width * bytes_per_pixel` and the backing store is
    /// sized to exactly `stride * height` bytes. Fails with
    /// [`AllocError::UnknownFormat`] for formats without a defined pixel
    /// size and [`AllocError::Geometry`] when the stride does not fit in
    /// `u32`; nothing is allocated in either case.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, AllocError> {
        let (stride, size) = geometry(width, height, format)?;
        let shm = AnonShmFile::create(size)?;
        debug!(
            "created {}x{} shared buffer, stride {}, {} bytes",
            width, height, stride, size
        );
        Ok(Self {
            shm,
            width,
            height,
            stride,
            format,
            in_use: false,
        })
    }

    /// Like [`new`](Self::new) but allocating under an explicit directory
    /// instead of the runtime directory.
    pub fn new_in(
        dir: &Path,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, AllocError> {
        let (stride, size) = geometry(width, height, format)?;
        let shm = AnonShmFile::create_in(dir, size)?;
        Ok(Self {
            shm,
            width,
            height,
            stride,
            format,
            in_use: false,
        })
    }

    /// Map the buffer read-only.
    ///
    /// The returned region's length equals [`size_bytes`](Self::size_bytes);
    /// writes from other mappings of the store are visible through it.
    pub fn map(&self) -> Result<Mmap, MapError> {
        // Safety: the store is owned by this buffer and never resized after
        // creation, so the mapping cannot outgrow it.
        unsafe { Mmap::map(self.shm.file()) }.map_err(MapError::Map)
    }

    /// Map the buffer read-write.
    ///
    /// The design assumes a single writer per region; sharing the store
    /// with another process is an explicit descriptor hand-off coordinated
    /// by the protocol layer's release events.
    pub fn map_mut(&self) -> Result<MmapMut, MapError> {
        // Safety: as for `map`; exclusive writing is the caller's contract.
        unsafe { MmapMut::map_mut(self.shm.file()) }.map_err(MapError::Map)
    }

    /// Geometry for the protocol hand-off.
    pub fn handoff(&self) -> BufferHandoff {
        BufferHandoff {
            size_bytes: self.shm.size_bytes(),
            stride: self.stride,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    /// Record that the descriptor has been handed to the protocol layer.
    pub fn mark_in_use(&mut self) {
        self.in_use = true;
    }

    /// Record a release notification from the protocol layer.
    ///
    /// After release the store may be refilled or remapped for the next
    /// frame without reallocating.
    pub fn mark_released(&mut self) {
        self.in_use = false;
    }

    /// Whether the other side may still be reading the store.
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn size_bytes(&self) -> u64 {
        self.shm.size_bytes()
    }

    /// Take back the underlying store, e.g. to pool it for reuse.
    pub fn into_shm(self) -> AnonShmFile {
        self.shm
    }
}

impl AsFd for SharedBuffer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.shm.as_fd()
    }
}

/// Derive `(stride, size_bytes)` from the pixel geometry, refusing
/// anything that cannot be represented exactly.
fn geometry(width: u32, height: u32, format: PixelFormat) -> Result<(u32, u64), AllocError> {
    let bytes_per_pixel = format
        .bytes_per_pixel()
        .ok_or_else(|| AllocError::UnknownFormat(format.to_wayland()))?;
    let stride = width
        .checked_mul(bytes_per_pixel)
        .ok_or(AllocError::Geometry {
            width,
            height,
            bytes_per_pixel,
        })?;
    // u32 * u32 always fits in u64.
    let size = u64::from(stride) * u64::from(height);
    Ok((stride, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(width: u32, height: u32, dir: &tempfile::TempDir) -> SharedBuffer {
        SharedBuffer::new_in(dir.path(), width, height, PixelFormat::Xrgb8888).unwrap()
    }

    #[test]
    fn test_region_length_matches_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer(100, 50, &dir);
        assert_eq!(buf.stride(), 400);
        assert_eq!(buf.size_bytes(), 400 * 50);
        let region = buf.map().unwrap();
        assert_eq!(region.len() as u64, buf.size_bytes());
    }

    #[test]
    fn test_bytes_survive_remap() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer(4, 4, &dir);

        let mut region = buf.map_mut().unwrap();
        for (i, byte) in region.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        drop(region);

        let region = buf.map().unwrap();
        assert_eq!(region.len(), 64);
        for (i, byte) in region.iter().enumerate() {
            assert_eq!(*byte, (i % 251) as u8);
        }
    }

    #[test]
    fn test_mappings_share_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer(2, 2, &dir);

        let mut writer = buf.map_mut().unwrap();
        let reader = buf.map().unwrap();
        writer[0] = 0xAB;
        assert_eq!(reader[0], 0xAB);
    }

    #[test]
    fn test_zero_sized_buffer_maps_empty() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer(0, 0, &dir);
        assert_eq!(buf.size_bytes(), 0);
        let region = buf.map().unwrap();
        assert!(region.is_empty());
    }

    #[test]
    fn test_handoff_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let buf = buffer(640, 480, &dir);
        let handoff = buf.handoff();
        assert_eq!(handoff.width, 640);
        assert_eq!(handoff.height, 480);
        assert_eq!(handoff.stride, 640 * 4);
        assert_eq!(handoff.size_bytes, 640 * 4 * 480);
        assert_eq!(handoff.format, PixelFormat::Xrgb8888);
    }

    #[test]
    fn test_oversized_width_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let err = SharedBuffer::new_in(dir.path(), 0x4000_0001, 1, PixelFormat::Xrgb8888)
            .unwrap_err();
        assert!(matches!(err, AllocError::Geometry { .. }));
    }

    #[test]
    fn test_unsized_format_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let err = SharedBuffer::new_in(dir.path(), 2, 2, PixelFormat::Other(0x2020_3843))
            .unwrap_err();
        assert!(matches!(err, AllocError::UnknownFormat(0x2020_3843)));
    }

    #[test]
    fn test_stride_follows_the_format_pixel_size() {
        let dir = tempfile::tempdir().unwrap();
        let buf = SharedBuffer::new_in(dir.path(), 4, 4, PixelFormat::Rgb565).unwrap();
        assert_eq!(buf.stride(), 8);
        assert_eq!(buf.size_bytes(), 32);
    }

    #[test]
    fn test_release_signal() {
        let dir = tempfile::tempdir().unwrap();
        let mut buf = buffer(8, 8, &dir);
        assert!(!buf.is_in_use());
        buf.mark_in_use();
        assert!(buf.is_in_use());
        buf.mark_released();
        assert!(!buf.is_in_use());
    }
}
