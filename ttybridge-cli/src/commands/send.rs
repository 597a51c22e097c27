//! Send command implementation.

use {
    super::write_fully,
    crate::{Cli, config::Config, open_port},
    anyhow::{Context, Result},
    console::style,
    indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle},
    log::info,
    std::{
        fs,
        io::{self, IsTerminal, Read},
        path::Path,
    },
};

/// Read the whole job from a file, or from stdin for "-".
fn load_input(input: &Path) -> Result<Vec<u8>> {
    if input == Path::new("-") {
        let mut data = Vec::new();
        io::stdin()
            .read_to_end(&mut data)
            .context("Failed to read stdin")?;
        Ok(data)
    } else {
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))
    }
}

fn progress_bar(cli: &Cli, total: usize) -> ProgressBar {
    if cli.quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total as u64);
    #[allow(clippy::unwrap_used)] // Static template string
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb
}

/// Send a file to the printer.
pub(crate) fn cmd_send(cli: &Cli, config: &Config, input: &Path, chunk: usize) -> Result<()> {
    let data = load_input(input)?;
    let mut port = open_port(cli, config)?;

    let pb = progress_bar(cli, data.len());
    let result = write_fully(&port, &data, chunk, |n| pb.inc(n as u64));
    pb.finish_and_clear();
    port.close();
    result?;

    info!("Sent {} bytes to {}", data.len(), port.path().display());
    if !cli.quiet {
        eprintln!(
            "{} Sent {} bytes",
            style("✓").green(),
            data.len()
        );
    }
    Ok(())
}
