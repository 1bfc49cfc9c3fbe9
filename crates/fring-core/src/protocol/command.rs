//! Write commands.
//!
//! Each variant has a fixed layout. Only the register byte plus the active
//! variant's payload goes on the wire, never the size of the largest variant.

use byteorder::{ByteOrder, LittleEndian};

use super::constants::*;
use super::register::Register;

/// LED state block of a Set-LED command (7 bytes).
///
/// Layout: `id`, `mode`, then five mode-specific bytes:
/// - On: `r g b`
/// - Flashing: `r g b on off` (100 ms units)
/// - Pulsating: `r g b period` (100 ms units)
///
/// Unused trailing bytes are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedCommand {
    pub id: u8,
    pub mode: u8,
    pub params: [u8; 5],
}

impl LedCommand {
    pub fn to_bytes(&self) -> [u8; LED_STATE_LEN] {
        let mut buf = [0u8; LED_STATE_LEN];
        buf[0] = self.id;
        buf[1] = self.mode;
        buf[2..].copy_from_slice(&self.params);
        buf
    }
}

/// One firmware chunk of a Push-Firmware-Update command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareChunk {
    /// Byte offset of this chunk within the image.
    pub offset: u32,
    /// Number of valid payload bytes, always a multiple of 4.
    pub length: u32,
    /// Running CRC including this chunk.
    pub crc: u32,
    pub payload: [u8; MAX_CHUNK_SIZE],
}

impl FirmwareChunk {
    pub const ENCODED_LEN: usize = FIRMWARE_CHUNK_HEADER_LEN + MAX_CHUNK_SIZE;

    fn write_to(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.offset);
        LittleEndian::write_u32(&mut buf[4..8], self.length);
        LittleEndian::write_u32(&mut buf[8..12], self.crc);
        buf[12..Self::ENCODED_LEN].copy_from_slice(&self.payload);
    }
}

/// A command written to the MCU, selected by its register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCommand {
    Identify { protocol_version: u8 },
    ReadBootInfo,
    SetSerial { serial: [u8; SERIAL_LEN] },
    ReadBoardRevision,
    SetLed(LedCommand),
    ReadDeviceStatus,
    ReadBatteryStatus,
    ReadLogMessage,
    ReadWakeupReason,
    SetWakeupTime { milliseconds: u32 },
    PushFirmwareUpdate(FirmwareChunk),
    ReadFirmwareUpdateResult,
    ReadInterruptStatus,
}

impl WriteCommand {
    pub fn register(&self) -> Register {
        match self {
            Self::Identify { .. } => Register::Identify,
            Self::ReadBootInfo => Register::ReadBootInfo,
            Self::SetSerial { .. } => Register::SetSerial,
            Self::ReadBoardRevision => Register::ReadBoardRevision,
            Self::SetLed(_) => Register::SetLed,
            Self::ReadDeviceStatus => Register::ReadDeviceStatus,
            Self::ReadBatteryStatus => Register::ReadBatteryStatus,
            Self::ReadLogMessage => Register::ReadLogMessage,
            Self::ReadWakeupReason => Register::ReadWakeupReason,
            Self::SetWakeupTime { .. } => Register::SetWakeupTime,
            Self::PushFirmwareUpdate(_) => Register::PushFirmwareUpdate,
            Self::ReadFirmwareUpdateResult => Register::ReadFirmwareUpdateResult,
            Self::ReadInterruptStatus => Register::ReadInterruptStatus,
        }
    }

    /// Size of the payload following the register byte.
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Identify { .. } => 1,
            Self::SetSerial { .. } => SERIAL_LEN,
            Self::SetLed(_) => LED_STATE_LEN,
            Self::SetWakeupTime { .. } => 4,
            Self::PushFirmwareUpdate(_) => FirmwareChunk::ENCODED_LEN,
            _ => 0,
        }
    }

    pub fn encoded_len(&self) -> usize {
        1 + self.payload_len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.encoded_len()];
        buf[0] = self.register().as_u8();
        let payload = &mut buf[1..];

        match self {
            Self::Identify { protocol_version } => payload[0] = *protocol_version,
            Self::SetSerial { serial } => payload.copy_from_slice(serial),
            Self::SetLed(led) => payload.copy_from_slice(&led.to_bytes()),
            Self::SetWakeupTime { milliseconds } => {
                LittleEndian::write_u32(payload, *milliseconds)
            }
            Self::PushFirmwareUpdate(chunk) => chunk.write_to(payload),
            _ => {}
        }

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_commands_are_one_byte() {
        assert_eq!(WriteCommand::ReadInterruptStatus.encode(), vec![0xFF]);
        assert_eq!(WriteCommand::ReadBootInfo.encode(), vec![REG_READ_BOOT_INFO]);
    }

    #[test]
    fn test_identify_layout() {
        let cmd = WriteCommand::Identify {
            protocol_version: PROTOCOL_VERSION,
        };
        assert_eq!(cmd.encode(), vec![REG_ID, 1]);
    }

    #[test]
    fn test_wakeup_time_little_endian() {
        let cmd = WriteCommand::SetWakeupTime {
            milliseconds: 0x0102_0304,
        };
        assert_eq!(
            cmd.encode(),
            vec![REG_SET_WAKEUP_TIME, 0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn test_led_layout() {
        let cmd = WriteCommand::SetLed(LedCommand {
            id: 1,
            mode: LED_MODE_FLASHING,
            params: [255, 128, 0, 5, 10],
        });
        assert_eq!(
            cmd.encode(),
            vec![REG_SET_LED, 1, LED_MODE_FLASHING, 255, 128, 0, 5, 10]
        );
    }

    #[test]
    fn test_firmware_chunk_layout() {
        let mut payload = [0u8; MAX_CHUNK_SIZE];
        payload[0] = 0xAA;
        payload[31] = 0xBB;
        let cmd = WriteCommand::PushFirmwareUpdate(FirmwareChunk {
            offset: 64,
            length: 32,
            crc: 0xDEAD_BEEF,
            payload,
        });
        let bytes = cmd.encode();
        assert_eq!(bytes.len(), 1 + 12 + 32);
        assert_eq!(bytes[0], REG_PUSH_FIRMWARE_UPDATE);
        assert_eq!(&bytes[1..5], &64u32.to_le_bytes());
        assert_eq!(&bytes[5..9], &32u32.to_le_bytes());
        assert_eq!(&bytes[9..13], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(bytes[13], 0xAA);
        assert_eq!(bytes[44], 0xBB);
    }
}
