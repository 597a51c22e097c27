//! Serial port bridge.
//!
//! Opens a tty device node, puts it into a fixed raw mode and exposes single
//! blocking read/write calls on the resulting descriptor.
//!
//! ## Line discipline
//!
//! The configuration applied by [`SerialPortBridge::open`] is not tunable:
//!
//! ```text
//! +-----------------+---------------------------------------------+
//! | framing         | 8 data bits, no parity, 1 stop bit          |
//! | flow control    | none (CRTSCTS, IXON, IXOFF, IXANY all off)  |
//! | local modes     | raw: no ICANON, ECHO, ISIG                  |
//! | control modes   | CLOCAL | CREAD                              |
//! | read behaviour  | VMIN=1, VTIME=0 (block until >= 1 byte)     |
//! | speed           | same constant for input and output          |
//! +-----------------+---------------------------------------------+
//! ```
//!
//! ## Blocking
//!
//! Every call blocks the calling thread. [`PortHandle::read`] may block
//! indefinitely while the line is idle and cannot be interrupted by closing
//! the handle from another thread; the borrow rules already forbid that,
//! since [`PortHandle::close`] takes `&mut self`. Callers needing
//! cancellation can poll the descriptor returned by [`PortHandle::fd`]
//! before reading.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ttybridge::SerialPortBridge;
//!
//! fn main() -> ttybridge::Result<()> {
//!     let mut port = SerialPortBridge::new().open("/dev/ttyS1", 115200)?;
//!
//!     // ESC @ (printer init)
//!     let written = port.write(&[0x1B, 0x40])?;
//!     assert!(written <= 2);
//!
//!     let status = port.read(16)?;
//!     println!("Received: {status:02X?}");
//!
//!     port.close();
//!     Ok(())
//! }
//! ```

mod handle;
mod raw;

pub use handle::{MAX_READ_LEN, PortHandle};

use {
    crate::{
        baud::{BaudPolicy, BaudRate},
        error::Result,
    },
    std::{fmt, path::Path},
};

/// Opens serial ports with a given baud resolution policy.
///
/// The bridge holds no state besides the policy: it never keeps a reference
/// to the handles it returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortBridge {
    policy: BaudPolicy,
}

impl SerialPortBridge {
    /// Bridge that falls back to 115200 for unknown speeds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            policy: BaudPolicy::Fallback,
        }
    }

    /// Bridge with an explicit baud policy.
    #[must_use]
    pub const fn with_policy(policy: BaudPolicy) -> Self {
        Self { policy }
    }

    /// Baud policy used by [`Self::open`].
    #[must_use]
    pub const fn policy(&self) -> BaudPolicy {
        self.policy
    }

    /// Open `path` in raw mode at `baud`.
    ///
    /// On success the handle is fully configured and ready for blocking
    /// I/O. On failure no descriptor stays open.
    pub fn open(&self, path: impl AsRef<Path>, baud: u32) -> Result<PortHandle> {
        PortHandle::open_with_policy(path.as_ref(), baud, self.policy)
    }
}

/// Description of the fixed line configuration, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    /// Data bits per character.
    pub data_bits: u8,
    /// Parity bit enabled.
    pub parity: bool,
    /// Stop bits per character.
    pub stop_bits: u8,
    /// Hardware (RTS/CTS) flow control enabled.
    pub hardware_flow_control: bool,
    /// Minimum bytes a read waits for.
    pub vmin: u8,
    /// Inter-byte timeout in deciseconds.
    pub vtime: u8,
}

impl LineSettings {
    /// The configuration every port is opened with.
    pub const RAW_8N1: Self = Self {
        data_bits: 8,
        parity: false,
        stop_bits: 1,
        hardware_flow_control: false,
        vmin: 1,
        vtime: 0,
    };
}

impl fmt::Display for LineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}, {} flow control, raw, VMIN={} VTIME={}",
            self.data_bits,
            if self.parity { 'P' } else { 'N' },
            self.stop_bits,
            if self.hardware_flow_control {
                "hardware"
            } else {
                "no"
            },
            self.vmin,
            self.vtime
        )
    }
}

/// Resolve `baud` against the table without opening anything.
///
/// Exposed so callers can show what speed a request would end up at.
pub fn resolve_baud(baud: u32, policy: BaudPolicy) -> Result<BaudRate> {
    policy.resolve(baud)
}
