//! # ttybridge
//!
//! Raw byte-level access to a serial (tty) device, typically a USB-serial or
//! UART-attached receipt or label printer.
//!
//! The crate does four things and nothing else:
//!
//! - open a device node and put it into raw 8N1 mode at a table-resolved speed
//! - write bytes with a single `write` call
//! - read bytes with a single blocking `read` call
//! - close the descriptor (idempotently)
//!
//! It does not parse printer commands, buffer, reframe, or retry. Loops such
//! as "write until everything is sent" belong to the caller.
//!
//! ## Baud rates
//!
//! 9600, 19200, 38400, 57600, 115200 and 230400 are supported. Any other
//! value opens the port at 115200 unless [`BaudPolicy::Strict`] is used.
//!
//! ## Features
//!
//! - `discovery` (default): serial port enumeration via the `serialport` crate
//!
//! ## Example
//!
//! ```rust,no_run
//! use ttybridge::{BaudPolicy, SerialPortBridge};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = SerialPortBridge::with_policy(BaudPolicy::Strict);
//!     let mut port = bridge.open("/dev/ttyUSB0", 19200)?;
//!
//!     let mut job: &[u8] = b"\x1b@Hello\n";
//!     while !job.is_empty() {
//!         let n = port.write(job)?;
//!         job = &job[n..];
//!     }
//!
//!     port.close();
//!     Ok(())
//! }
//! ```

#![cfg(unix)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod baud;
pub mod device;
pub mod error;
pub mod port;

// Re-exports for convenience
#[cfg(feature = "discovery")]
pub use device::discover_ports;
pub use {
    baud::{BaudPolicy, BaudRate, FALLBACK_BAUD},
    device::{DetectedPort, DeviceKind, format_port_list},
    error::{Error, Result},
    port::{LineSettings, MAX_READ_LEN, PortHandle, SerialPortBridge, resolve_baud},
};
