//! Shared fixtures for unit tests.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::protocol::Register;
use crate::protocol::constants::*;
use crate::transport::MockBus;

/// Fresh, empty scratch directory under the system temp dir.
pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "fring-{}-{}-{}",
        tag,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub(crate) fn id_bytes(magic: &[u8; 5]) -> Vec<u8> {
    let mut buf = magic.to_vec();
    buf.push(PROTOCOL_VERSION);
    buf
}

pub(crate) fn boot_info_bytes(flags: u32, version: u32, serial: [u8; SERIAL_LEN]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(BOOT_INFO_RESPONSE_LEN);
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&serial);
    buf
}

pub(crate) fn device_status_bytes(status: u32, errors: u32, light: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(DEVICE_STATUS_RESPONSE_LEN);
    buf.extend_from_slice(&status.to_le_bytes());
    buf.extend_from_slice(&errors.to_le_bytes());
    buf.extend_from_slice(&[light, 30, 31, 32]);
    buf
}

pub(crate) fn battery_bytes(level: u8, temperature: i8, current: i16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(BATTERY_STATUS_RESPONSE_LEN);
    buf.push(level);
    buf.push(temperature as u8);
    buf.extend_from_slice(&current.to_le_bytes());
    for word in [1500u16, 7, 45, 0, 0x00c0] {
        buf.extend_from_slice(&word.to_le_bytes());
    }
    buf
}

pub(crate) fn log_bytes(text: &str) -> Vec<u8> {
    let mut buf = text.as_bytes().to_vec();
    buf.resize(LOG_MESSAGE_LEN, 0);
    buf
}

/// Queue the responses of one successful identification.
pub(crate) fn queue_identity(mock: &MockBus, flags: u32, version: u32, serial: [u8; SERIAL_LEN]) {
    mock.queue_response(Register::Identify, &id_bytes(&FRING_MAGIC));
    mock.queue_response(Register::ReadBootInfo, &boot_info_bytes(flags, version, serial));
    mock.queue_response(Register::ReadBoardRevision, &[3, 1]);
}

pub(crate) fn queue_interrupt(mock: &MockBus, bits: u32) {
    mock.queue_response(Register::ReadInterruptStatus, &bits.to_le_bytes());
}
