//! Waybuf - anonymous shared-memory pixel buffers for Wayland clients
//!
//! Wayland clients hand pixel data to the compositor through file
//! descriptors backing `wl_shm` pools. This crate implements the client
//! side of that buffer lifecycle:
//!
//! - **Allocation**: a uniquely named file under `XDG_RUNTIME_DIR`,
//!   unlinked while the descriptor stays live so only descriptor passing
//!   can reach the backing store, then truncated to the requested size
//! - **Mapping**: shared read or read-write views over the store
//! - **Pattern fill**: the deterministic checkerboard drawn by the
//!   classic tutorial clients, useful as a golden-output fixture
//!
//! The protocol layer itself (registry binding, surface commits, buffer
//! release events) is out of scope; it consumes the descriptor and the
//! [`BufferHandoff`] geometry this crate produces. See
//! `demos/checkerboard.rs` for a complete client built on top.
//!
//! # Example
//!
//! ```no_run
//! use waybuf::{pattern, PixelFormat, SharedBuffer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let buffer = SharedBuffer::new(640, 480, PixelFormat::Xrgb8888)?;
//! let mut region = buffer.map_mut()?;
//! pattern::fill_checkerboard(&mut region, 640, 480, buffer.stride(), 0);
//! drop(region);
//! // buffer.as_fd() plus buffer.handoff() go to the protocol layer
//! # Ok(())
//! # }
//! ```

pub mod alloc;
pub mod buffer;
pub mod format;
pub mod pattern;

pub use alloc::{AllocError, AnonShmFile, ConfigError};
pub use buffer::{BufferHandoff, MapError, SharedBuffer};
pub use format::PixelFormat;
