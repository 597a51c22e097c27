//! Error types for ttybridge.

use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ttybridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ttybridge operations.
///
/// Every variant that wraps a failed syscall carries the platform error code.
/// Any descriptor opened along the way is already closed when one of these
/// is returned.
#[derive(Debug, Error)]
pub enum Error {
    /// The device node could not be opened (missing, permission, busy).
    #[error("cannot open {}: {errno}", path.display())]
    DeviceOpenFailed {
        /// Device path passed to `open`.
        path: PathBuf,
        /// Platform error code.
        errno: Errno,
    },

    /// Reading the terminal attributes of an opened node failed.
    #[error("tcgetattr failed on {}: {errno}", path.display())]
    AttributeReadFailed {
        /// Device path passed to `open`.
        path: PathBuf,
        /// Platform error code.
        errno: Errno,
    },

    /// Applying the raw line configuration failed.
    #[error("tcsetattr failed on {}: {errno}", path.display())]
    AttributeWriteFailed {
        /// Device path passed to `open`.
        path: PathBuf,
        /// Platform error code.
        errno: Errno,
    },

    /// A read or write syscall failed.
    #[error("I/O failed: {errno}")]
    IoFailed {
        /// Platform error code.
        errno: Errno,
    },

    /// The handle was already closed.
    #[error("port is closed")]
    Closed,

    /// Requested speed is not in the baud table (strict policy only).
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),

    /// Serial port enumeration failed.
    #[cfg(feature = "discovery")]
    #[error("port discovery failed: {0}")]
    Discovery(#[from] serialport::Error),
}

impl Error {
    /// Platform error code carried by this error, if any.
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::DeviceOpenFailed { errno, .. }
            | Self::AttributeReadFailed { errno, .. }
            | Self::AttributeWriteFailed { errno, .. }
            | Self::IoFailed { errno } => Some(*errno),
            _ => None,
        }
    }
}

/// Extract the platform error code from a std I/O error.
pub(crate) fn errno_of(err: &std::io::Error) -> Errno {
    err.raw_os_error()
        .map_or(Errno::UnknownErrno, Errno::from_raw)
}
