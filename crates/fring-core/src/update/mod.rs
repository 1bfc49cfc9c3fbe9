//! Firmware update: image discovery, CRC and the transfer worker.

pub mod crc;
pub mod discovery;
pub mod engine;

pub use discovery::{FirmwareCandidate, find_newer_image};
pub use engine::{ProgressTracker, UpdateError, UpdateHandle, UpdateState};
