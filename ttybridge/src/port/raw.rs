//! termios manipulation for the fixed raw 8N1 line discipline.

use {
    super::LineSettings,
    crate::baud::BaudRate,
    nix::{
        fcntl::{FcntlArg, OFlag, fcntl},
        sys::termios::{self, ControlFlags, InputFlags, SpecialCharacterIndices, Termios},
    },
    std::os::fd::AsRawFd,
};

/// Rewrite `attrs` into raw 8N1 mode at `speed`.
///
/// Only touches the in-memory attribute block; nothing is applied to the
/// device until `tcsetattr`.
pub(super) fn make_raw(attrs: &mut Termios, speed: BaudRate) -> nix::Result<()> {
    let settings = LineSettings::RAW_8N1;

    termios::cfmakeraw(attrs);

    attrs
        .control_flags
        .remove(ControlFlags::CSIZE | ControlFlags::PARENB | ControlFlags::CSTOPB);
    attrs
        .control_flags
        .remove(ControlFlags::CRTSCTS);
    attrs
        .control_flags
        .insert(ControlFlags::CS8 | ControlFlags::CLOCAL | ControlFlags::CREAD);
    // cfmakeraw leaves IXOFF and IXANY alone.
    attrs
        .input_flags
        .remove(InputFlags::IXON | InputFlags::IXOFF | InputFlags::IXANY);

    attrs.control_chars[SpecialCharacterIndices::VMIN as usize] = settings.vmin;
    attrs.control_chars[SpecialCharacterIndices::VTIME as usize] = settings.vtime;

    termios::cfsetispeed(attrs, speed.to_termios())?;
    termios::cfsetospeed(attrs, speed.to_termios())?;

    Ok(())
}

/// Switch an fd opened with `O_NONBLOCK` back to blocking I/O.
pub(super) fn clear_nonblocking(fd: &impl AsRawFd) -> nix::Result<()> {
    let raw = fd.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(raw, FcntlArg::F_GETFL)?);
    fcntl(raw, FcntlArg::F_SETFL(flags.difference(OFlag::O_NONBLOCK)))?;
    Ok(())
}
