//! Open serial connection.

use {
    super::raw,
    crate::{
        baud::{BaudPolicy, BaudRate},
        error::{Error, Result, errno_of},
    },
    log::{debug, error, trace, warn},
    nix::{
        errno::Errno,
        fcntl::OFlag,
        sys::termios::{self, SetArg, Termios},
    },
    std::{
        fs::{File, OpenOptions},
        io::{Read, Write},
        os::{
            fd::{AsFd, BorrowedFd},
            unix::fs::OpenOptionsExt,
        },
        path::{Path, PathBuf},
    },
};

/// Largest buffer [`PortHandle::read`] allocates for a single call.
///
/// A tty read returns only what is already queued, which stays far below this.
pub const MAX_READ_LEN: usize = 64 * 1024;

/// One open serial connection.
///
/// Created only by [`SerialPortBridge::open`](super::SerialPortBridge::open).
/// The descriptor is released by [`close`](Self::close) or when the handle
/// is dropped, whichever comes first, and never twice.
///
/// `read` and `write` take `&self`, so one reader thread and one writer
/// thread may share a handle. Concurrent reads (or concurrent writes) from
/// several threads are not ordered with respect to each other.
#[derive(Debug)]
pub struct PortHandle {
    file: Option<File>,
    path: PathBuf,
    baud: BaudRate,
    requested_baud: u32,
}

impl PortHandle {
    /// Open with the default fallback policy.
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        Self::open_with_policy(path.as_ref(), baud, BaudPolicy::Fallback)
    }

    pub(super) fn open_with_policy(path: &Path, baud: u32, policy: BaudPolicy) -> Result<Self> {
        let speed = policy
            .resolve(baud)
            .inspect_err(|e| error!("Refusing to open {}: {e}", path.display()))?;
        if speed.nominal() != baud {
            warn!(
                "{baud} baud is not supported, opening {} at {speed}",
                path.display()
            );
        }

        // O_NONBLOCK keeps the open itself from waiting on carrier detect.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags((OFlag::O_NOCTTY | OFlag::O_NONBLOCK).bits())
            .open(path)
            .map_err(|e| {
                let errno = errno_of(&e);
                error!("Cannot open {}: {errno}", path.display());
                Error::DeviceOpenFailed {
                    path: path.to_path_buf(),
                    errno,
                }
            })?;

        // From here on every early return drops `file`, closing the fd.
        let mut attrs = termios::tcgetattr(&file).map_err(|errno| {
            error!("tcgetattr() failed on {}: {errno}", path.display());
            Error::AttributeReadFailed {
                path: path.to_path_buf(),
                errno,
            }
        })?;

        let attr_write_failed = |errno: Errno| {
            error!("tcsetattr() failed on {}: {errno}", path.display());
            Error::AttributeWriteFailed {
                path: path.to_path_buf(),
                errno,
            }
        };

        raw::make_raw(&mut attrs, speed).map_err(attr_write_failed)?;
        termios::tcsetattr(&file, SetArg::TCSANOW, &attrs).map_err(attr_write_failed)?;
        raw::clear_nonblocking(&file).map_err(|errno| {
            error!("fcntl() could not clear O_NONBLOCK on {}: {errno}", path.display());
            Error::AttributeWriteFailed {
                path: path.to_path_buf(),
                errno,
            }
        })?;

        debug!("Opened {} at {speed} baud (requested {baud})", path.display());

        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
            baud: speed,
            requested_baud: baud,
        })
    }

    /// Write `data` with a single underlying `write`.
    ///
    /// Returns how many bytes the OS accepted, which may be fewer than
    /// `data.len()`. Sending the rest is up to the caller. Nothing is retried.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut file = self.file()?;
        if data.is_empty() {
            return Ok(0);
        }

        let written = file
            .write(data)
            .map_err(|e| self.io_failed("write", &e))?;
        trace!("Wrote {written}/{} bytes to {}", data.len(), self.path.display());
        Ok(written)
    }

    /// Read up to `max_len` bytes with a single underlying `read`.
    ///
    /// Blocks until at least one byte is available, then returns whatever is
    /// there. **This call may block indefinitely.** An empty vector means the
    /// device hung up (EOF), which is not an error.
    ///
    /// The buffer is capped at [`MAX_READ_LEN`], so any `max_len` is accepted.
    pub fn read(&self, max_len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len.min(MAX_READ_LEN)];
        let n = self.read_into(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Like [`read`](Self::read), filling a caller-provided buffer.
    ///
    /// Returns the byte count; `0` for a non-empty `buf` means EOF.
    pub fn read_into(&self, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.file()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let n = file
            .read(buf)
            .map_err(|e| self.io_failed("read", &e))?;
        if n == 0 {
            debug!("EOF on {}", self.path.display());
        } else {
            trace!("Read {n} bytes from {}", self.path.display());
        }
        Ok(n)
    }

    /// Release the descriptor.
    ///
    /// Calling this on an already closed handle does nothing.
    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            debug!("Closed {}", self.path.display());
        }
    }

    /// Whether the descriptor is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Device path the handle was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Speed applied to the line.
    #[must_use]
    pub fn baud(&self) -> BaudRate {
        self.baud
    }

    /// Speed the caller asked for, before table resolution.
    #[must_use]
    pub fn requested_baud(&self) -> u32 {
        self.requested_baud
    }

    /// Borrow the descriptor, e.g. to `poll` it before a read.
    #[must_use]
    pub fn fd(&self) -> Option<BorrowedFd<'_>> {
        self.file
            .as_ref()
            .map(AsFd::as_fd)
    }

    /// Current terminal attributes as reported by the device.
    pub fn attributes(&self) -> Result<Termios> {
        let file = self.file()?;
        termios::tcgetattr(file).map_err(|errno| Error::AttributeReadFailed {
            path: self.path.clone(),
            errno,
        })
    }

    /// Input and output speeds currently applied to the device.
    pub fn applied_speeds(&self) -> Result<(termios::BaudRate, termios::BaudRate)> {
        let attrs = self.attributes()?;
        Ok((termios::cfgetispeed(&attrs), termios::cfgetospeed(&attrs)))
    }

    fn file(&self) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or(Error::Closed)
    }

    fn io_failed(&self, op: &str, err: &std::io::Error) -> Error {
        let errno = errno_of(err);
        error!("{op} failed on {}: {errno}", self.path.display());
        Error::IoFailed { errno }
    }
}
