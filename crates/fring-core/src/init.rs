//! Identification of the MCU.

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::bus::{Bus, BusError};
use crate::protocol::constants::{PROTOCOL_VERSION, SERIAL_LEN};
use crate::protocol::{BootSlot, Register, Response, WriteCommand};
use crate::transport::{BusTransport, TransportError};

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Unable to open bus: {0}")]
    Open(#[source] TransportError),
    #[error("Invalid ID code {:?}", String::from_utf8_lossy(.0))]
    InvalidMagic([u8; 5]),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("Unable to set device serial: {0}")]
    SetSerial(#[source] TransportError),
}

/// What initialization learned about the MCU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub protocol_version: u8,
    pub firmware_version: u32,
    pub slot: BootSlot,
    pub beta: bool,
    pub serial: [u8; SERIAL_LEN],
    pub board_revision_a: u8,
    pub board_revision_b: u8,
}

impl DeviceIdentity {
    /// Serial number as lowercase hex.
    pub fn serial_hex(&self) -> String {
        hex(&self.serial)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Random serial for an unprogrammed device; never all `0xFF`.
fn random_serial() -> [u8; SERIAL_LEN] {
    loop {
        let serial: [u8; SERIAL_LEN] = rand::random();
        if serial != [0xFF; SERIAL_LEN] {
            return serial;
        }
    }
}

/// Run the identification sequence against the MCU.
///
/// Opens the bus if needed, checks the magic, reads the boot info (assigning
/// a serial to unprogrammed devices) and the board revision.
#[instrument(level = "debug", skip(bus))]
pub fn identify<T: BusTransport>(
    bus: &Bus<T>,
    i2c_bus: u8,
    address: u16,
) -> Result<DeviceIdentity, InitError> {
    bus.open(i2c_bus, address).map_err(InitError::Open)?;

    let cmd = WriteCommand::Identify {
        protocol_version: PROTOCOL_VERSION,
    };
    let Response::Id(id) = bus.query(&cmd)? else {
        return Err(BusError::UnexpectedResponse(Register::Identify).into());
    };
    if !id.is_fring() {
        warn!(magic = ?id.magic, "Invalid ID code");
        return Err(InitError::InvalidMagic(id.magic));
    }

    let Response::BootInfo(boot) = bus.query(&WriteCommand::ReadBootInfo)? else {
        return Err(BusError::UnexpectedResponse(Register::ReadBootInfo).into());
    };

    let mut serial = boot.serial;
    if serial == [0xFF; SERIAL_LEN] {
        serial = random_serial();
        info!(serial = %hex(&serial), "Setting firmware device serial");
        bus.command(&WriteCommand::SetSerial { serial })
            .map_err(InitError::SetSerial)?;
    }

    let Response::BoardRevision(rev) = bus.query(&WriteCommand::ReadBoardRevision)? else {
        return Err(BusError::UnexpectedResponse(Register::ReadBoardRevision).into());
    };

    let identity = DeviceIdentity {
        protocol_version: id.protocol_version,
        firmware_version: boot.version,
        slot: boot.flags.slot(),
        beta: boot.flags.is_beta(),
        serial,
        board_revision_a: rev.a,
        board_revision_b: rev.b,
    };

    info!(
        version = identity.firmware_version,
        slot = %identity.slot,
        beta = identity.beta,
        board_a = identity.board_revision_a,
        board_b = identity.board_revision_b,
        "Successfully initialized"
    );

    Ok(identity)
}
