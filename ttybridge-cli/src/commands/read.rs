//! Read command implementation.
//!
//! The bridge's `read` blocks until data arrives and cannot be cancelled, so
//! the loop polls the descriptor with a short timeout first and checks for
//! Ctrl-C in between.

use {
    super::hex_preview,
    crate::{Cli, config::Config, interrupted_error, open_port, was_interrupted},
    anyhow::Result,
    log::info,
    nix::{
        errno::Errno,
        poll::{PollFd, PollFlags, PollTimeout, poll},
    },
    std::io::{self, Write},
    ttybridge::PortHandle,
};

const POLL_INTERVAL_MS: u16 = 200;
const READ_CHUNK: usize = 4096;

/// Wait up to [`POLL_INTERVAL_MS`] for the port to become readable.
fn wait_readable(port: &PortHandle) -> Result<bool> {
    let Some(fd) = port.fd() else {
        return Err(ttybridge::Error::Closed.into());
    };

    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
    match poll(&mut fds, PollTimeout::from(POLL_INTERVAL_MS)) {
        Ok(0) | Err(Errno::EINTR) => Ok(false),
        Ok(_) => Ok(true),
        Err(errno) => Err(ttybridge::Error::IoFailed { errno }.into()),
    }
}

/// Dump received bytes to stdout.
pub(crate) fn cmd_read(cli: &Cli, config: &Config, count: Option<usize>, hex: bool) -> Result<()> {
    let mut port = open_port(cli, config)?;
    let mut stdout = io::stdout().lock();
    let mut total = 0usize;

    let result = loop {
        if count.is_some_and(|limit| total >= limit) {
            break Ok(());
        }
        if was_interrupted() {
            break Err(interrupted_error());
        }
        match wait_readable(&port) {
            Ok(true) => {},
            Ok(false) => continue,
            Err(e) => break Err(e),
        }

        let want = count.map_or(READ_CHUNK, |limit| (limit - total).min(READ_CHUNK));
        let chunk = match port.read(want) {
            Ok(chunk) => chunk,
            Err(e) => break Err(e.into()),
        };
        if chunk.is_empty() {
            info!("{} hung up", port.path().display());
            break Ok(());
        }
        total += chunk.len();

        let written = if hex {
            writeln!(stdout, "{}", hex_preview(&chunk, chunk.len()))
        } else {
            stdout.write_all(&chunk)
        };
        if let Err(e) = written.and_then(|()| stdout.flush()) {
            break Err(anyhow::Error::new(e).context("Failed to write to stdout"));
        }
    };

    port.close();
    info!("Received {total} bytes");
    result
}
