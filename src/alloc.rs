//! Anonymous shared-memory file allocation
//!
//! Produces the file descriptors backing `wl_shm` pools: a uniquely named
//! file created under the runtime directory, unlinked while the descriptor
//! stays open, then truncated to the requested size. Once unlinked the
//! store has no reachable path; only processes holding a copy of the
//! descriptor can access it, and the OS reclaims the storage as soon as
//! the last descriptor closes, even on crash.

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use rustix::fs::{Mode, OFlags};
use rustix::io::{Errno, FdFlags};

/// Environment variable naming the per-user runtime directory.
pub const RUNTIME_DIR_VAR: &str = "XDG_RUNTIME_DIR";

/// Name prefix for the short-lived files created under the runtime directory.
const FILE_PREFIX: &str = "waybuf-";

/// Attempts before giving up on finding an unused name.
const CREATE_ATTEMPTS: u32 = 32;

/// Environment or descriptor-setup failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("XDG_RUNTIME_DIR is not set")]
    NoRuntimeDir,
    #[error("could not set close-on-exec on shm file: {0}")]
    Cloexec(#[source] io::Error),
}

/// Allocation failures
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not create shm file: {0}")]
    Create(#[source] io::Error),
    #[error("could not resize shm file to {size} bytes: {source}")]
    Truncate {
        size: u64,
        #[source]
        source: io::Error,
    },
    #[error("pixel format code {0:#x} has no defined size")]
    UnknownFormat(u32),
    #[error("{width}x{height} at {bytes_per_pixel} bytes per pixel overflows the stride")]
    Geometry {
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
    },
}

/// An unlinked, size-truncated temporary file suitable for shared mapping
///
/// The descriptor is the only way to reach the backing store. Dropping the
/// last [`AnonShmFile`] (or the [`File`] taken out of it) releases the
/// storage.
#[derive(Debug)]
pub struct AnonShmFile {
    file: File,
    size_bytes: u64,
}

impl AnonShmFile {
    /// Allocate an anonymous store of exactly `size_bytes` under the
    /// runtime directory.
    ///
    /// `size_bytes == 0` is valid and yields a zero-length store. Failures
    /// never leave a descriptor or a named file behind.
    pub fn create(size_bytes: u64) -> Result<Self, AllocError> {
        let dir = runtime_dir()?;
        Self::create_in(&dir, size_bytes)
    }

    /// Like [`create`](Self::create) but allocating under an explicit
    /// directory instead of consulting the environment.
    pub fn create_in(dir: &Path, size_bytes: u64) -> Result<Self, AllocError> {
        let file = create_unlinked(dir)?;
        truncate(&file, size_bytes).map_err(|err| AllocError::Truncate {
            size: size_bytes,
            source: err.into(),
        })?;
        debug!(
            "allocated {} byte anonymous shm file under {}",
            size_bytes,
            dir.display()
        );
        Ok(Self { file, size_bytes })
    }

    /// Size the store was truncated to.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Consume the handle, e.g. to transfer ownership to a protocol layer.
    pub fn into_file(self) -> File {
        self.file
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }
}

impl AsFd for AnonShmFile {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

fn runtime_dir() -> Result<PathBuf, ConfigError> {
    runtime_dir_from(std::env::var_os(RUNTIME_DIR_VAR))
}

fn runtime_dir_from(value: Option<OsString>) -> Result<PathBuf, ConfigError> {
    match value {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Err(ConfigError::NoRuntimeDir),
    }
}

/// Create a uniquely named file under `dir` and unlink it while the
/// descriptor stays open.
///
/// `O_EXCL` makes creation atomic, so concurrent callers can never share a
/// store; a name collision just means another attempt with a fresh suffix.
fn create_unlinked(dir: &Path) -> Result<File, AllocError> {
    for _ in 0..CREATE_ATTEMPTS {
        let path = dir.join(format!("{}{}", FILE_PREFIX, unique_suffix()));
        let fd = match rustix::fs::open(
            &path,
            OFlags::RDWR | OFlags::CREATE | OFlags::EXCL,
            Mode::RUSR | Mode::WUSR,
        ) {
            Ok(fd) => fd,
            Err(Errno::EXIST) => continue,
            Err(err) => return Err(AllocError::Create(err.into())),
        };
        // An inheritable descriptor would leak the buffer into unrelated
        // children; treat failure to secure it as fatal for this attempt.
        if let Err(err) = set_cloexec(&fd) {
            let _ = rustix::fs::unlink(&path);
            return Err(ConfigError::Cloexec(err).into());
        }
        // From here on only descriptor passing can reach the store.
        if let Err(err) = rustix::fs::unlink(&path) {
            return Err(AllocError::Create(err.into()));
        }
        return Ok(File::from(fd));
    }
    Err(AllocError::Create(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "exhausted unique name attempts",
    )))
}

fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    let flags = rustix::io::fcntl_getfd(fd)?;
    rustix::io::fcntl_setfd(fd, flags | FdFlags::CLOEXEC)?;
    Ok(())
}

fn truncate(fd: &impl AsFd, size_bytes: u64) -> rustix::io::Result<()> {
    loop {
        match rustix::fs::ftruncate(fd, size_bytes) {
            // A signal can interrupt ftruncate; that is transient, not a
            // failure.
            Err(Errno::INTR) => continue,
            other => return other,
        }
    }
}

fn unique_suffix() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!(
        "{}-{}-{:08x}",
        process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed),
        nanos
    )
}
