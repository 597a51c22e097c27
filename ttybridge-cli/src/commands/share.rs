//! Raw TCP print share.
//!
//! Listens for raw print jobs (the "port 9100" convention) and forwards each
//! client's bytes to the serial printer. One client is served at a time: the
//! serial port is opened when a client connects and closed when it hangs up.
//!
//! With advertising on, the share is announced over DNS-SD as a
//! `_pdl-datastream._tcp` printer for as long as the server runs.

use {
    super::{hex_preview, write_fully},
    crate::{Cli, config::Config, interrupted_error, open_port, was_interrupted},
    anyhow::{Context, Result},
    log::{debug, info, warn},
    mdns_sd::{ServiceDaemon, ServiceInfo},
    std::{
        collections::HashMap,
        io::{ErrorKind, Read},
        net::{SocketAddr, TcpListener, TcpStream},
        thread,
        time::Duration,
    },
};

const ACCEPT_POLL: Duration = Duration::from_millis(100);
const CLIENT_READ_TIMEOUT: Duration = Duration::from_millis(500);
const FORWARD_CHUNK: usize = 4096;
const PREVIEW_BYTES: usize = 64;

/// DNS-SD type of a raw socket printer.
const SERVICE_TYPE: &str = "_pdl-datastream._tcp.local.";
const DEFAULT_SERVICE_NAME: &str = "ttybridge printer";
const UNREGISTER_TIMEOUT: Duration = Duration::from_secs(1);

/// `share` subcommand flags.
#[derive(Debug, Default)]
pub(crate) struct ShareOptions<'a> {
    pub bind: Option<&'a str>,
    pub listen_port: Option<u16>,
    pub once: bool,
    pub advertise: bool,
    pub name: Option<&'a str>,
}

/// Listen address from flags, then config, then `0.0.0.0:9100`.
fn listen_addr(config: &Config, options: &ShareOptions<'_>) -> String {
    let mut merged = config.clone();
    if let Some(bind) = options.bind {
        merged.share.bind = Some(bind.to_string());
    }
    if options.listen_port.is_some() {
        merged.share.port = options.listen_port;
    }
    merged.share_addr()
}

/// mDNS host name derived from the first label of the system host name.
fn mdns_host(hostname: &str) -> String {
    let label: String = hostname
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    let label = if label.is_empty() { "ttybridge" } else { label.as_str() };
    format!("{label}.local.")
}

/// Service record for a raw print share on `port`.
fn service_info(name: &str, hostname: &str, port: u16) -> Result<ServiceInfo> {
    let properties = HashMap::from([
        ("txtvers".to_string(), "1".to_string()),
        ("qtotal".to_string(), "1".to_string()),
        ("ty".to_string(), name.to_string()),
    ]);
    let info = ServiceInfo::new(SERVICE_TYPE, name, &mdns_host(hostname), "", port, properties)
        .with_context(|| format!("Invalid service name {name:?}"))?
        .enable_addr_auto();
    Ok(info)
}

/// A live DNS-SD registration. Dropping it withdraws the announcement.
struct Advertisement {
    daemon: ServiceDaemon,
    fullname: String,
}

impl Advertisement {
    fn register(info: ServiceInfo) -> Result<Self> {
        let daemon = ServiceDaemon::new().context("Cannot start mDNS responder")?;
        let fullname = info
            .get_fullname()
            .to_string();
        daemon
            .register(info)
            .context("mDNS registration failed")?;
        info!("Advertising {fullname}");
        Ok(Self { daemon, fullname })
    }
}

impl Drop for Advertisement {
    fn drop(&mut self) {
        match self.daemon.unregister(&self.fullname) {
            Ok(status) => match status.recv_timeout(UNREGISTER_TIMEOUT) {
                Ok(_) => info!("Withdrew {}", self.fullname),
                Err(e) => debug!("No unregister confirmation for {}: {e}", self.fullname),
            },
            Err(e) => warn!("mDNS unregistration failed: {e}"),
        }
        if let Err(e) = self.daemon.shutdown() {
            debug!("mDNS responder shutdown: {e}");
        }
    }
}

/// Announce the share, or log why it could not be announced.
fn advertise(config: &Config, options: &ShareOptions<'_>, port: u16) -> Option<Advertisement> {
    let name = options
        .name
        .or(config.share.name.as_deref())
        .unwrap_or(DEFAULT_SERVICE_NAME);
    let hostname = nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default();

    match service_info(name, &hostname, port).and_then(Advertisement::register) {
        Ok(advertisement) => Some(advertisement),
        Err(e) => {
            warn!("Not advertising the share: {e:#}");
            None
        },
    }
}

/// Run the print share until Ctrl-C (or after one client with `once`).
pub(crate) fn cmd_share(cli: &Cli, config: &Config, options: &ShareOptions<'_>) -> Result<()> {
    let addr = listen_addr(config, options);
    let listener = TcpListener::bind(&addr).with_context(|| format!("Failed to listen on {addr}"))?;
    listener.set_nonblocking(true)?;
    let local = listener.local_addr()?;
    info!("Listening on tcp/{local} for raw print jobs");

    let _advertisement = (options.advertise || config.share.advertise)
        .then(|| advertise(config, options, local.port()))
        .flatten();

    loop {
        if was_interrupted() {
            info!("Stopping print share");
            return Ok(());
        }

        match listener.accept() {
            Ok((stream, peer)) => {
                serve_client(cli, config, stream, peer);
                if options.once {
                    return Ok(());
                }
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => warn!("Accept error: {e}"),
        }
    }
}

fn serve_client(cli: &Cli, config: &Config, stream: TcpStream, peer: SocketAddr) {
    info!("New client: {peer}");
    match forward_job(cli, config, stream) {
        Ok(total) => info!("Client {peer} disconnected, forwarded {total} bytes"),
        Err(e) => warn!("Client {peer} session error: {e:#}"),
    }
}

/// Copy one client's job to the printer. Returns the byte count.
fn forward_job(cli: &Cli, config: &Config, mut stream: TcpStream) -> Result<usize> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;

    let mut port = open_port(cli, config)?;
    let mut buf = [0u8; FORWARD_CHUNK];
    let mut total = 0usize;

    let result = loop {
        if was_interrupted() {
            break Err(interrupted_error());
        }

        let n = match stream.read(&mut buf) {
            Ok(0) => break Ok(total),
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                continue;
            },
            Err(e) => break Err(anyhow::Error::new(e).context("Client read failed")),
        };

        if total == 0 {
            info!("Raw data {}", hex_preview(&buf[..n], PREVIEW_BYTES));
        }
        if let Err(e) = write_fully(&port, &buf[..n], n, |_| {}) {
            break Err(e);
        }
        total += n;
    };

    port.close();
    result
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use clap::Parser;
    use nix::{
        fcntl::OFlag,
        pty::{grantpt, posix_openpt, ptsname_r, unlockpt},
    };
    use std::io::Write;

    #[test]
    fn test_listen_addr_priority() {
        let mut config = Config::default();
        let defaults = ShareOptions::default();
        assert_eq!(listen_addr(&config, &defaults), "0.0.0.0:9100");

        config.share.bind = Some("10.0.0.5".to_string());
        config.share.port = Some(9200);
        assert_eq!(listen_addr(&config, &defaults), "10.0.0.5:9200");

        let flags = ShareOptions {
            bind: Some("127.0.0.1"),
            listen_port: Some(9101),
            ..ShareOptions::default()
        };
        assert_eq!(listen_addr(&config, &flags), "127.0.0.1:9101");
    }

    #[test]
    fn test_mdns_host_from_system_name() {
        assert_eq!(mdns_host("till-1"), "till-1.local.");
        assert_eq!(mdns_host("till-1.lan"), "till-1.local.");
        assert_eq!(mdns_host("pos_station 2"), "pos-station-2.local.");
        assert_eq!(mdns_host(""), "ttybridge.local.");
    }

    #[test]
    fn test_service_info_describes_raw_printer() {
        let info = service_info("Front desk printer", "till-1.lan", 9100).unwrap();
        assert_eq!(info.get_type(), "_pdl-datastream._tcp.local.");
        assert_eq!(
            info.get_fullname(),
            "Front desk printer._pdl-datastream._tcp.local."
        );
        assert_eq!(info.get_hostname(), "till-1.local.");
        assert_eq!(info.get_port(), 9100);
        assert_eq!(info.get_property_val_str("ty"), Some("Front desk printer"));
        assert_eq!(info.get_property_val_str("txtvers"), Some("1"));
    }

    #[test]
    fn test_forward_job_copies_client_bytes_to_port() {
        let mut master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).unwrap();
        grantpt(&master).unwrap();
        unlockpt(&master).unwrap();
        let slave = ptsname_r(&master).unwrap();

        let cli = Cli::try_parse_from(["ttybridge", "-q", "-p", slave.as_str(), "share"]).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let job: Vec<u8> = b"\x1b@Total 12.50\n\x00\x1dV\x00".to_vec();
        let sent = job.clone();
        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(&sent).unwrap();
        });

        let (stream, _) = listener.accept().unwrap();
        let total = forward_job(&cli, &Config::default(), stream).unwrap();
        client.join().unwrap();

        assert_eq!(total, job.len());
        let mut received = vec![0u8; job.len()];
        master.read_exact(&mut received).unwrap();
        assert_eq!(received, job);
    }

    #[test]
    fn test_forward_job_reports_open_failure() {
        let cli = Cli::try_parse_from(["ttybridge", "-q", "-p", "/dev/nonexistent0", "share"])
            .unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = thread::spawn(move || TcpStream::connect(addr).map(drop));

        let (stream, _) = listener.accept().unwrap();
        let err = forward_job(&cli, &Config::default(), stream).unwrap_err();
        client
            .join()
            .unwrap()
            .unwrap();

        assert!(matches!(
            err.downcast_ref::<ttybridge::Error>(),
            Some(ttybridge::Error::DeviceOpenFailed { .. })
        ));
    }
}
