//! Linux i2c-dev transport.

use i2cdev::core::{I2CMessage, I2CTransfer};
use i2cdev::linux::{LinuxI2CBus, LinuxI2CMessage};
use tracing::{debug, info, instrument};

use super::traits::{BusTransport, TransportError};

/// Transport over `/dev/i2c-N` using combined `I2C_RDWR` transactions.
#[derive(Default)]
pub struct LinuxI2cTransport {
    bus: Option<LinuxI2CBus>,
    address: u16,
}

impl LinuxI2cTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BusTransport for LinuxI2cTransport {
    #[instrument(level = "info", skip(self), fields(address = %format!("0x{:02X}", address)))]
    fn open(&mut self, bus: u8, address: u16) -> Result<(), TransportError> {
        let path = format!("/dev/i2c-{}", bus);
        let handle = LinuxI2CBus::new(&path).map_err(|e| TransportError::OpenFailed {
            bus,
            address,
            message: e.to_string(),
        })?;

        info!(path = %path, "Bus opened");
        self.bus = Some(handle);
        self.address = address;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.bus.is_some()
    }

    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), TransportError> {
        let address = self.address;
        let bus = self.bus.as_mut().ok_or(TransportError::NotOpen)?;
        let read_len = read.len();

        let mut msgs = [
            LinuxI2CMessage::write(write).with_address(address),
            LinuxI2CMessage::read(read).with_address(address),
        ];
        let completed = bus
            .transfer(&mut msgs)
            .map_err(|e| TransportError::TransferFailed(e.to_string()))?;

        if completed != 2 {
            return Err(TransportError::ShortTransfer {
                completed,
                expected: 2,
            });
        }

        debug!(written = write.len(), read = read_len, "Transfer complete");
        Ok(())
    }
}
