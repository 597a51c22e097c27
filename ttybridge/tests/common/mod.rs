//! Pseudo-terminal loopback pair shared by the integration tests.

#![allow(dead_code)]

use nix::{
    fcntl::OFlag,
    pty::{PtyMaster, grantpt, posix_openpt, ptsname_r, unlockpt},
};
use std::io::Read;

/// Master side of a pty plus the path of its slave node.
///
/// The slave is opened through the bridge like any serial device; the master
/// plays the part of the printer on the other end of the cable.
pub struct Loopback {
    pub master: PtyMaster,
    pub slave_path: String,
}

pub fn loopback() -> Loopback {
    let _ = env_logger::builder()
        .is_test(true)
        .try_init();

    let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).expect("posix_openpt");
    grantpt(&master).expect("grantpt");
    unlockpt(&master).expect("unlockpt");
    let slave_path = ptsname_r(&master).expect("ptsname_r");

    Loopback { master, slave_path }
}

/// Read exactly `len` bytes from the master side.
pub fn read_master(master: &mut PtyMaster, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    master
        .read_exact(&mut buf)
        .expect("read from pty master");
    buf
}

/// Count descriptors currently open in this process.
pub fn open_fd_count() -> usize {
    std::fs::read_dir("/proc/self/fd")
        .expect("list /proc/self/fd")
        .count()
}
