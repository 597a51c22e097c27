//! Baud-rate table and resolution policy.
//!
//! The set of line speeds a port can be opened at is closed: a caller-supplied
//! nominal value either matches one of the [`BaudRate`] variants or is
//! resolved according to a [`BaudPolicy`].

use crate::error::{Error, Result};
use nix::sys::termios;
use std::fmt;

/// Nominal speed used when a requested value is not in the table.
pub const FALLBACK_BAUD: BaudRate = BaudRate::B115200;

/// Supported line speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    /// 9600 bit/s.
    B9600,
    /// 19200 bit/s.
    B19200,
    /// 38400 bit/s.
    B38400,
    /// 57600 bit/s.
    B57600,
    /// 115200 bit/s.
    B115200,
    /// 230400 bit/s.
    B230400,
}

impl BaudRate {
    /// Every supported speed, slowest first.
    pub const ALL: [Self; 6] = [
        Self::B9600,
        Self::B19200,
        Self::B38400,
        Self::B57600,
        Self::B115200,
        Self::B230400,
    ];

    /// Look up a nominal value in the table.
    #[must_use]
    pub fn from_nominal(baud: u32) -> Option<Self> {
        match baud {
            9600 => Some(Self::B9600),
            19200 => Some(Self::B19200),
            38400 => Some(Self::B38400),
            57600 => Some(Self::B57600),
            115200 => Some(Self::B115200),
            230400 => Some(Self::B230400),
            _ => None,
        }
    }

    /// Resolve a nominal value, substituting [`FALLBACK_BAUD`] on a miss.
    #[must_use]
    pub fn resolve(baud: u32) -> Self {
        Self::from_nominal(baud).unwrap_or(FALLBACK_BAUD)
    }

    /// Nominal bit rate.
    #[must_use]
    pub fn nominal(self) -> u32 {
        match self {
            Self::B9600 => 9600,
            Self::B19200 => 19200,
            Self::B38400 => 38400,
            Self::B57600 => 57600,
            Self::B115200 => 115200,
            Self::B230400 => 230400,
        }
    }

    /// Platform line-speed constant.
    #[must_use]
    pub fn to_termios(self) -> termios::BaudRate {
        match self {
            Self::B9600 => termios::BaudRate::B9600,
            Self::B19200 => termios::BaudRate::B19200,
            Self::B38400 => termios::BaudRate::B38400,
            Self::B57600 => termios::BaudRate::B57600,
            Self::B115200 => termios::BaudRate::B115200,
            Self::B230400 => termios::BaudRate::B230400,
        }
    }

    /// Map a platform constant read back from a device into the table.
    #[must_use]
    pub fn from_termios(speed: termios::BaudRate) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.to_termios() == speed)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nominal())
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> Self {
        baud.nominal()
    }
}

/// What to do with a requested speed that is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaudPolicy {
    /// Silently use [`FALLBACK_BAUD`].
    #[default]
    Fallback,
    /// Refuse with [`Error::UnsupportedBaud`].
    Strict,
}

impl BaudPolicy {
    /// Apply this policy to a requested nominal speed.
    pub fn resolve(self, baud: u32) -> Result<BaudRate> {
        match (self, BaudRate::from_nominal(baud)) {
            (_, Some(rate)) => Ok(rate),
            (Self::Fallback, None) => Ok(FALLBACK_BAUD),
            (Self::Strict, None) => Err(Error::UnsupportedBaud(baud)),
        }
    }
}
