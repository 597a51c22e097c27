//! ttybridge CLI - raw serial printer tool.
//!
//! ## Features
//!
//! - Send files or stdin to a serial printer
//! - Dump bytes received from the printer
//! - Share the printer over raw TCP (port 9100, "JetDirect" style)
//! - List serial ports and supported baud rates
//! - Shell completion generation
//! - Environment variable and config file support

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use ttybridge::{BaudPolicy, PortHandle, SerialPortBridge};

mod commands;
mod config;

use commands::{
    bauds::cmd_bauds, completions::cmd_completions, ports::cmd_list_ports, read::cmd_read,
    send::cmd_send,
    share::{ShareOptions, cmd_share},
};
use config::Config;

/// Set by the Ctrl-C handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// ttybridge - raw serial bridge for receipt and label printers.
///
/// Environment variables:
///   TTYBRIDGE_PORT   - Serial device (default: /dev/ttyS1)
///   TTYBRIDGE_BAUD   - Baud rate (default: 115200)
#[derive(Parser)]
#[command(name = "ttybridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial device node (e.g. /dev/ttyUSB0).
    #[arg(short, long, global = true, env = "TTYBRIDGE_PORT")]
    port: Option<String>,

    /// Baud rate (9600, 19200, 38400, 57600, 115200, 230400).
    #[arg(short, long, global = true, env = "TTYBRIDGE_BAUD")]
    baud: Option<u32>,

    /// Fail on unsupported baud rates instead of using 115200.
    #[arg(long, global = true)]
    strict_baud: bool,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Send a file (or stdin with "-") to the printer.
    Send {
        /// File to send, or "-" for stdin.
        input: PathBuf,

        /// Largest number of bytes handed to a single write.
        #[arg(long, default_value = "4096", value_parser = clap::value_parser!(u32).range(1..))]
        chunk: u32,
    },

    /// Print bytes received from the printer to stdout.
    Read {
        /// Stop after this many bytes.
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Print a hex dump instead of raw bytes.
        #[arg(long)]
        hex: bool,
    },

    /// Share the printer as a raw TCP print server.
    Share {
        /// Address to bind (default: 0.0.0.0).
        #[arg(long)]
        bind: Option<String>,

        /// TCP port to listen on (default: 9100).
        #[arg(long)]
        listen_port: Option<u16>,

        /// Serve a single client, then exit.
        #[arg(long)]
        once: bool,

        /// Announce the share on the local network (mDNS/DNS-SD).
        #[arg(long)]
        advertise: bool,

        /// Service name to announce (implies --advertise).
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Show supported baud rates and the fixed line settings.
    Bauds {
        /// Show what a given baud rate would be opened at.
        #[arg(long)]
        resolve: Option<u32>,

        /// Output as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Errors with a dedicated exit code.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Bad invocation or configuration (exit 2).
    #[error("{0}")]
    Usage(String),
    /// Interrupted by the user (exit 130).
    #[error("{0}")]
    Cancelled(String),
}

/// Map an error chain to the process exit code.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::Usage(_) => 2,
            CliError::Cancelled(_) => 130,
        };
    }
    if let Some(ttybridge::Error::UnsupportedBaud(_)) = err.downcast_ref::<ttybridge::Error>() {
        return 2;
    }
    1
}

/// Whether Ctrl-C was pressed.
pub(crate) fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

/// Error returned when a loop stops because of Ctrl-C.
pub(crate) fn interrupted_error() -> anyhow::Error {
    CliError::Cancelled("Interrupted".to_string()).into()
}

fn install_interrupt_handler() {
    if let Err(e) = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::Relaxed)) {
        debug!("Could not install Ctrl-C handler: {e}");
    }
}

/// Open the configured serial port.
///
/// Priority: `--port`/`--baud` (or env) first, then the config file, then
/// built-in defaults.
pub(crate) fn open_port(cli: &Cli, config: &Config) -> Result<PortHandle> {
    let device = cli
        .port
        .as_deref()
        .unwrap_or_else(|| config.device());
    let baud = cli
        .baud
        .unwrap_or_else(|| config.baud());

    let port = SerialPortBridge::with_policy(baud_policy(cli, config)).open(device, baud)?;
    if !cli.quiet {
        eprintln!(
            "{} Using {} at {} baud",
            style("🔌").cyan(),
            style(device).green(),
            port.baud()
        );
    }
    Ok(port)
}

fn baud_policy(cli: &Cli, config: &Config) -> BaudPolicy {
    if cli.strict_baud || config.serial.strict_baud {
        BaudPolicy::Strict
    } else {
        BaudPolicy::Fallback
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path).map_err(|e| CliError::Usage(format!("{e:#}")))?
    } else {
        Config::load()
    };

    match &cli.command {
        Commands::Send { input, chunk } => cmd_send(cli, &config, input, *chunk as usize),
        Commands::Read { count, hex } => cmd_read(cli, &config, *count, *hex),
        Commands::Share {
            bind,
            listen_port,
            once,
            advertise,
            name,
        } => cmd_share(
            cli,
            &config,
            &ShareOptions {
                bind: bind.as_deref(),
                listen_port: *listen_port,
                once: *once,
                advertise: *advertise || name.is_some(),
                name: name.as_deref(),
            },
        ),
        Commands::ListPorts { json } => cmd_list_ports(*json),
        Commands::Bauds { resolve, json } => cmd_bauds(cli, &config, *resolve, *json),
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            Ok(())
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if std::env::var_os("NO_COLOR").is_some() || !console::Term::stderr().is_term() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    init_logging(&cli);
    install_interrupt_handler();

    debug!(
        "ttybridge v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style("Error:").red().bold());
            ExitCode::from(exit_code_for(&e))
        },
    }
}
