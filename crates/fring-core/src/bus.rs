//! Serialized bus transactions.
//!
//! The interrupt dispatcher and the firmware update worker both talk to the
//! MCU. The transport cannot tolerate interleaved transactions, so every
//! transfer goes through the single mutex held by [`Bus`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{instrument, trace, warn};

use crate::protocol::{ProtocolError, Register, Response, WriteCommand};
use crate::transport::{BusTransport, TransportError};

#[derive(Error, Debug)]
pub enum BusError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("Unexpected response to {0}")]
    UnexpectedResponse(Register),
}

/// Bus transaction wrapper owning the transport.
pub struct Bus<T: BusTransport> {
    transport: Mutex<T>,
}

impl<T: BusTransport> Bus<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the transport unless it already is.
    #[instrument(level = "debug", skip(self))]
    pub fn open(&self, bus: u8, address: u16) -> Result<(), TransportError> {
        let mut transport = self.lock();
        if transport.is_open() {
            return Ok(());
        }
        transport.open(bus, address)
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    /// Perform one write-then-read transaction.
    ///
    /// The MCU link fails intermittently unless every transaction reads at
    /// least one byte back, so an empty `read` is replaced by a one-byte
    /// dummy read within the same transaction.
    pub fn transfer(&self, write: &[u8], read: &mut [u8]) -> Result<(), TransportError> {
        let mut dummy = [0u8; 1];
        let read: &mut [u8] = if read.is_empty() { &mut dummy } else { read };

        let result = self.lock().transfer(write, read);
        match &result {
            Ok(()) => trace!(write = ?write, read = ?read, "Transfer"),
            Err(e) => warn!(error = %e, register = ?write.first(), "Unable to transfer command"),
        }
        result
    }

    /// Send a command that has no response.
    pub fn command(&self, cmd: &WriteCommand) -> Result<(), TransportError> {
        self.transfer(&cmd.encode(), &mut [])
    }

    /// Send a command and decode the response for its register.
    pub fn query(&self, cmd: &WriteCommand) -> Result<Response, BusError> {
        let register = cmd.register();
        let mut buf = vec![0u8; register.response_len()];
        self.transfer(&cmd.encode(), &mut buf)?;
        Ok(Response::decode(register, &buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{InterruptStatus, LedCommand};
    use crate::transport::MockBus;

    fn open_bus() -> (Bus<MockBus>, MockBus) {
        let mock = MockBus::new();
        let bus = Bus::new(mock.clone());
        bus.open(0, 0x42).unwrap();
        (bus, mock)
    }

    #[test]
    fn test_open_is_idempotent() {
        let (bus, mock) = open_bus();
        mock.set_open_fails(true);
        assert!(bus.open(0, 0x42).is_ok());
        assert_eq!(mock.opened_with(), Some((0, 0x42)));
    }

    #[test]
    fn test_write_only_command_reads_dummy_byte() {
        let (bus, mock) = open_bus();
        bus.command(&WriteCommand::SetLed(LedCommand::default()))
            .unwrap();
        let txs = mock.transactions();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].write.len(), 8);
        assert_eq!(txs[0].read_len, 1);
    }

    #[test]
    fn test_query_reads_response_length() {
        let (bus, mock) = open_bus();
        mock.queue_response(Register::ReadInterruptStatus, &0x11u32.to_le_bytes());
        let resp = bus.query(&WriteCommand::ReadInterruptStatus).unwrap();
        assert_eq!(resp, Response::InterruptStatus(InterruptStatus(0x11)));
        assert_eq!(mock.transactions()[0].read_len, 4);
    }

    #[test]
    fn test_transfer_failure_is_reported() {
        let (bus, mock) = open_bus();
        mock.fail_next_transfers(1);
        assert!(bus.command(&WriteCommand::SetWakeupTime { milliseconds: 5 }).is_err());
        assert!(mock.transactions().is_empty());
    }

    #[test]
    fn test_transfer_before_open_fails() {
        let bus = Bus::new(MockBus::new());
        assert!(matches!(
            bus.query(&WriteCommand::ReadBootInfo),
            Err(BusError::Transport(TransportError::NotOpen))
        ));
    }
}
