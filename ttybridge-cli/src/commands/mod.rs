//! Command implementations.
//!
//! Each subcommand is implemented in its own module for clean separation.

pub(crate) mod bauds;
pub(crate) mod completions;
pub(crate) mod ports;
pub(crate) mod read;
pub(crate) mod send;
pub(crate) mod share;

use {
    crate::{interrupted_error, was_interrupted},
    anyhow::{Result, bail},
    ttybridge::PortHandle,
};

/// Hand `data` to the port until every byte was accepted.
///
/// Each step is a single bridge write of at most `chunk` bytes; `progress`
/// is told how many bytes each step accepted.
pub(crate) fn write_fully(
    port: &PortHandle,
    mut data: &[u8],
    chunk: usize,
    mut progress: impl FnMut(usize),
) -> Result<()> {
    while !data.is_empty() {
        if was_interrupted() {
            return Err(interrupted_error());
        }

        let step = data.len().min(chunk.max(1));
        let written = port.write(&data[..step])?;
        if written == 0 {
            bail!("{} stopped accepting data", port.path().display());
        }
        data = &data[written..];
        progress(written);
    }
    Ok(())
}

/// Space-separated hex of the first `max` bytes.
pub(crate) fn hex_preview(bytes: &[u8], max: usize) -> String {
    let shown = &bytes[..bytes.len().min(max)];
    let mut out = shown
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    if bytes.len() > max {
        out.push_str(" ...");
    }
    out
}
