//! Bus transport abstraction.
//!
//! Defines the `BusTransport` trait for raw I2C transactions,
//! allowing different implementations (Linux i2c-dev, mock, etc.).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Bus not open")]
    NotOpen,

    #[error("Failed to open bus {bus} at address 0x{address:02X}: {message}")]
    OpenFailed {
        bus: u8,
        address: u16,
        message: String,
    },

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Short transfer: {completed} of {expected} messages")]
    ShortTransfer { completed: u32, expected: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract bus transport.
///
/// One `transfer` is one combined write-then-read transaction addressed to
/// the device given to `open`. Implementations are not required to be
/// re-entrant; callers serialize access.
pub trait BusTransport: Send {
    /// Open the bus and bind the slave address.
    fn open(&mut self, bus: u8, address: u16) -> Result<(), TransportError>;

    /// Whether `open` has succeeded.
    fn is_open(&self) -> bool;

    /// Write `write`, then read exactly `read.len()` bytes into `read`.
    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), TransportError>;
}
