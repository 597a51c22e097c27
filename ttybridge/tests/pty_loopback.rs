//! Bridge behavior against a Linux pseudo-terminal pair.

#![cfg(target_os = "linux")]

mod common;

use {
    common::{loopback, read_master},
    nix::{
        fcntl::{FcntlArg, OFlag, fcntl},
        sys::termios::{self, ControlFlags, InputFlags, LocalFlags, SpecialCharacterIndices},
    },
    std::{
        io::Write,
        os::fd::AsRawFd,
        sync::mpsc,
        thread,
        time::Duration,
    },
    ttybridge::{BaudPolicy, BaudRate, Error, PortHandle, SerialPortBridge},
};

#[test]
fn applies_every_table_speed_to_both_directions() {
    for rate in BaudRate::ALL {
        let pair = loopback();
        let port = SerialPortBridge::new()
            .open(&pair.slave_path, rate.nominal())
            .unwrap();

        assert_eq!(port.baud(), rate);
        let (input, output) = port.applied_speeds().unwrap();
        assert_eq!(input, rate.to_termios(), "input speed for {rate}");
        assert_eq!(output, rate.to_termios(), "output speed for {rate}");
    }
}

#[test]
fn unsupported_speed_opens_at_115200() {
    let pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 4800).unwrap();

    assert_eq!(port.baud(), BaudRate::B115200);
    assert_eq!(port.requested_baud(), 4800);
    let (input, output) = port.applied_speeds().unwrap();
    assert_eq!(input, termios::BaudRate::B115200);
    assert_eq!(output, termios::BaudRate::B115200);
}

#[test]
fn strict_policy_refuses_unsupported_speed() {
    let pair = loopback();
    let err = SerialPortBridge::with_policy(BaudPolicy::Strict)
        .open(&pair.slave_path, 4800)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedBaud(4800)));
}

#[test]
fn configures_raw_8n1() {
    let pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 9600).unwrap();
    let attrs = port.attributes().unwrap();

    assert!(
        attrs
            .control_flags
            .contains(ControlFlags::CS8 | ControlFlags::CLOCAL | ControlFlags::CREAD)
    );
    assert!(
        !attrs
            .control_flags
            .intersects(ControlFlags::PARENB | ControlFlags::CSTOPB | ControlFlags::CRTSCTS)
    );
    assert!(
        !attrs
            .local_flags
            .intersects(LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::ISIG)
    );
    assert!(
        !attrs
            .input_flags
            .intersects(InputFlags::IXON | InputFlags::IXOFF | InputFlags::IXANY)
    );
    assert_eq!(attrs.control_chars[SpecialCharacterIndices::VMIN as usize], 1);
    assert_eq!(attrs.control_chars[SpecialCharacterIndices::VTIME as usize], 0);
}

#[test]
fn opened_descriptor_is_blocking() {
    let pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 9600).unwrap();
    let fd = port
        .fd()
        .unwrap();

    let flags = OFlag::from_bits_truncate(fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL).unwrap());
    assert!(!flags.contains(OFlag::O_NONBLOCK));
    assert!(flags.contains(OFlag::O_RDWR));
}

#[test]
fn nonexistent_device_fails_to_open() {
    let err = PortHandle::open("/dev/nonexistent0", 9600).unwrap_err();
    assert!(matches!(err, Error::DeviceOpenFailed { .. }));
    assert!(err.errno().is_some());
}

#[test]
fn write_then_read_on_paired_endpoint() {
    let mut pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 9600).unwrap();

    assert_eq!(port.write(&[0x1B, 0x40]).unwrap(), 2);
    assert_eq!(read_master(&mut pair.master, 2), [0x1B, 0x40]);

    pair.master
        .write_all(&[0x1B, 0x40])
        .unwrap();
    let mut received = Vec::new();
    while received.len() < 2 {
        let chunk = port.read(16).unwrap();
        assert!(!chunk.is_empty());
        received.extend(chunk);
    }
    assert_eq!(received, [0x1B, 0x40]);
}

#[test]
fn round_trip_preserves_bytes_and_order() {
    let mut pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 115200).unwrap();

    // Every byte value, zeros included, plus a run of embedded NULs and CR/LF.
    let mut payload: Vec<u8> = (0..=255u8).collect();
    payload.extend_from_slice(&[0x00, 0x00, b'\r', b'\n', 0x00, 0x11, 0x13, 0x03, 0x1C]);
    payload.extend((0..=255u8).rev());

    let expected = payload.clone();
    let total = payload.len();
    let mut master = pair.master;
    let reader = thread::spawn(move || read_master(&mut master, total));

    let mut rest = payload.as_slice();
    while !rest.is_empty() {
        let n = port.write(rest).unwrap();
        assert!(n > 0 && n <= rest.len());
        rest = &rest[n..];
    }

    assert_eq!(reader.join().unwrap(), expected);
}

#[test]
fn write_count_never_exceeds_request() {
    let pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 230400).unwrap();

    let total = 256 * 1024;
    let payload: Vec<u8> = (0..total)
        .map(|i| (i % 251) as u8)
        .collect();
    let expected = payload.clone();
    let mut master = pair.master;
    let reader = thread::spawn(move || read_master(&mut master, total));

    let mut rest = payload.as_slice();
    while !rest.is_empty() {
        let n = port.write(rest).unwrap();
        assert!(n <= rest.len());
        rest = &rest[n..];
    }

    assert_eq!(reader.join().unwrap(), expected);
}

#[test]
fn read_blocks_until_data_arrives() {
    let mut pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 9600).unwrap();
    let (tx, rx) = mpsc::channel();

    thread::scope(|s| {
        s.spawn(|| {
            tx.send(port.read(16)).unwrap();
        });

        // Nothing pending: the reader must still be parked.
        assert!(
            rx.recv_timeout(Duration::from_millis(300))
                .is_err()
        );

        pair.master
            .write_all(b"\x10\x04\x01")
            .unwrap();
        let got = rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap()
            .unwrap();
        assert!(!got.is_empty());
        assert!(b"\x10\x04\x01".starts_with(&got));
    });
}

#[test]
fn read_accepts_any_max_len() {
    let mut pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 9600).unwrap();

    pair.master
        .write_all(b"\x1b@")
        .unwrap();
    let mut received = Vec::new();
    while received.len() < 2 {
        let chunk = port.read(usize::MAX).unwrap();
        assert!(!chunk.is_empty());
        assert!(chunk.len() <= ttybridge::MAX_READ_LEN);
        received.extend(chunk);
    }
    assert_eq!(received, b"\x1b@");
}

#[test]
fn read_reports_eof_after_hangup() {
    let pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 9600).unwrap();

    drop(pair.master);

    // Zero bytes is end of stream, not an error.
    assert_eq!(port.read(16).unwrap(), Vec::<u8>::new());
}

#[test]
fn reader_and_writer_threads_share_a_handle() {
    let mut pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 57600).unwrap();

    thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut got = Vec::new();
            while got.len() < 4 {
                got.extend(port.read(4 - got.len()).unwrap());
            }
            got
        });
        s.spawn(|| {
            assert_eq!(port.write(b"ping").unwrap(), 4);
        });

        assert_eq!(read_master(&mut pair.master, 4), b"ping");
        pair.master
            .write_all(b"pong")
            .unwrap();
        assert_eq!(reader.join().unwrap(), b"pong");
    });
}

#[test]
fn zero_length_calls_do_not_block() {
    let pair = loopback();
    let port = PortHandle::open(&pair.slave_path, 9600).unwrap();

    assert_eq!(port.write(&[]).unwrap(), 0);
    assert!(
        port.read(0)
            .unwrap()
            .is_empty()
    );
    assert_eq!(port.read_into(&mut []).unwrap(), 0);
}

#[test]
fn close_is_idempotent_and_rejects_further_io() {
    let pair = loopback();
    let mut port = PortHandle::open(&pair.slave_path, 9600).unwrap();
    assert!(port.is_open());
    assert!(port.fd().is_some());

    port.close();
    port.close();

    assert!(!port.is_open());
    assert!(port.fd().is_none());
    assert!(matches!(port.write(b"x"), Err(Error::Closed)));
    assert!(matches!(port.read(1), Err(Error::Closed)));
    assert!(matches!(port.applied_speeds(), Err(Error::Closed)));
    assert_eq!(port.path().to_str(), Some(pair.slave_path.as_str()));
}
