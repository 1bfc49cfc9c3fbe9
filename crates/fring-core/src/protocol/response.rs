//! Read responses.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use thiserror::Error;

use super::constants::*;
use super::register::Register;
use super::status::{BootFlags, HardwareErrors, InterruptStatus, UpdateResult, WakeupReason};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Buffer too small for {register}: expected {expected}, got {actual}")]
    BufferTooSmall {
        register: Register,
        expected: usize,
        actual: usize,
    },
    #[error("Register {0} has no response")]
    NoResponse(Register),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identify response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdResponse {
    pub magic: [u8; 5],
    pub protocol_version: u8,
}

impl IdResponse {
    pub fn is_fring(&self) -> bool {
        self.magic == FRING_MAGIC
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootInfo {
    pub flags: BootFlags,
    pub version: u32,
    pub serial: [u8; SERIAL_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardRevision {
    pub a: u8,
    pub b: u8,
}

/// Device status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    pub status: u32,
    pub hardware_errors: HardwareErrors,
    pub ambient_light: u8,
    /// Temperatures in degrees Celsius.
    pub temperatures: [i8; 3],
}

impl DeviceStatus {
    pub fn home_button(&self) -> bool {
        self.status & DEVICE_STATUS_HOME_BUTTON != 0
    }

    /// Ambient light normalized to 0..=1.
    pub fn ambient_light_normalized(&self) -> f64 {
        f64::from(self.ambient_light) / 255.0
    }
}

/// Battery status snapshot in raw MCU units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryStatus {
    /// Charge level in percent.
    pub level: u8,
    /// 0.5 °C units.
    pub temperature: i8,
    /// 0.05 A units, negative while discharging.
    pub charge_current: i16,
    /// mAh.
    pub remaining_capacity: u16,
    pub cycle_count: u16,
    /// Minutes.
    pub time_to_full: u16,
    /// Minutes.
    pub time_to_empty: u16,
    pub status: u16,
}

impl BatteryStatus {
    pub fn level_fraction(&self) -> f64 {
        f64::from(self.level) / 100.0
    }

    pub fn current_amps(&self) -> f64 {
        f64::from(self.charge_current) / 20.0
    }

    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.temperature) / 2.0
    }
}

/// A decoded response, one variant per readable register.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Id(IdResponse),
    BootInfo(BootInfo),
    BoardRevision(BoardRevision),
    DeviceStatus(DeviceStatus),
    BatteryStatus(BatteryStatus),
    LogMessage(String),
    WakeupReason(WakeupReason),
    UpdateResult(UpdateResult),
    InterruptStatus(InterruptStatus),
}

impl Response {
    /// Decode the response to a command sent to `register`.
    pub fn decode(register: Register, data: &[u8]) -> Result<Self, ProtocolError> {
        let expected = register.response_len();
        if expected == 0 {
            return Err(ProtocolError::NoResponse(register));
        }
        if data.len() < expected {
            return Err(ProtocolError::BufferTooSmall {
                register,
                expected,
                actual: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let response = match register {
            Register::Identify => {
                let mut magic = [0u8; 5];
                magic.copy_from_slice(&data[..5]);
                Response::Id(IdResponse {
                    magic,
                    protocol_version: data[5],
                })
            }
            Register::ReadBootInfo => {
                let flags = BootFlags(cursor.read_u32::<LittleEndian>()?);
                let version = cursor.read_u32::<LittleEndian>()?;
                let mut serial = [0u8; SERIAL_LEN];
                serial.copy_from_slice(&data[8..8 + SERIAL_LEN]);
                Response::BootInfo(BootInfo {
                    flags,
                    version,
                    serial,
                })
            }
            Register::ReadBoardRevision => Response::BoardRevision(BoardRevision {
                a: data[0],
                b: data[1],
            }),
            Register::ReadDeviceStatus => Response::DeviceStatus(DeviceStatus {
                status: cursor.read_u32::<LittleEndian>()?,
                hardware_errors: HardwareErrors(cursor.read_u32::<LittleEndian>()?),
                ambient_light: cursor.read_u8()?,
                temperatures: [cursor.read_i8()?, cursor.read_i8()?, cursor.read_i8()?],
            }),
            Register::ReadBatteryStatus => Response::BatteryStatus(BatteryStatus {
                level: cursor.read_u8()?,
                temperature: cursor.read_i8()?,
                charge_current: cursor.read_i16::<LittleEndian>()?,
                remaining_capacity: cursor.read_u16::<LittleEndian>()?,
                cycle_count: cursor.read_u16::<LittleEndian>()?,
                time_to_full: cursor.read_u16::<LittleEndian>()?,
                time_to_empty: cursor.read_u16::<LittleEndian>()?,
                status: cursor.read_u16::<LittleEndian>()?,
            }),
            Register::ReadLogMessage => {
                let raw = &data[..LOG_MESSAGE_LEN];
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                Response::LogMessage(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
            Register::ReadWakeupReason => {
                Response::WakeupReason(WakeupReason::from_u8(cursor.read_u8()?))
            }
            Register::ReadFirmwareUpdateResult => Response::UpdateResult(
                UpdateResult::from_u32(cursor.read_u32::<LittleEndian>()?),
            ),
            Register::ReadInterruptStatus => Response::InterruptStatus(InterruptStatus(
                cursor.read_u32::<LittleEndian>()?,
            )),
            Register::SetSerial
            | Register::SetLed
            | Register::SetWakeupTime
            | Register::PushFirmwareUpdate => return Err(ProtocolError::NoResponse(register)),
        };

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_identify() {
        let resp = Response::decode(Register::Identify, b"Fring\x01").unwrap();
        match resp {
            Response::Id(id) => {
                assert!(id.is_fring());
                assert_eq!(id.protocol_version, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_boot_info() {
        let mut data = vec![];
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&17u32.to_le_bytes());
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let Response::BootInfo(info) = Response::decode(Register::ReadBootInfo, &data).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(info.version, 17);
        assert!(info.flags.is_beta());
        assert_eq!(info.serial, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_decode_battery_status() {
        let data = [
            80, 50, // level, temp (25 °C)
            0xEC, 0xFF, // -20 -> -1.0 A
            0xD0, 0x07, // 2000 mAh
            12, 0, // cycles
            30, 0, // to full
            240, 0, // to empty
            0x34, 0x12, // status
        ];
        let Response::BatteryStatus(bat) =
            Response::decode(Register::ReadBatteryStatus, &data).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(bat.level, 80);
        assert_eq!(bat.temperature_celsius(), 25.0);
        assert_eq!(bat.current_amps(), -1.0);
        assert_eq!(bat.remaining_capacity, 2000);
        assert_eq!(bat.time_to_empty, 240);
        assert_eq!(bat.status, 0x1234);
    }

    #[test]
    fn test_decode_log_message_stops_at_nul() {
        let mut data = [0u8; 16];
        data[..5].copy_from_slice(b"hello");
        let resp = Response::decode(Register::ReadLogMessage, &data).unwrap();
        assert_eq!(resp, Response::LogMessage("hello".into()));

        let full = *b"0123456789abcdef";
        let resp = Response::decode(Register::ReadLogMessage, &full).unwrap();
        assert_eq!(resp, Response::LogMessage("0123456789abcdef".into()));
    }

    #[test]
    fn test_decode_short_buffer() {
        let err = Response::decode(Register::ReadDeviceStatus, &[0u8; 4]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::BufferTooSmall {
                expected: 12,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_write_only_register() {
        assert!(matches!(
            Response::decode(Register::SetLed, &[0u8; 8]),
            Err(ProtocolError::NoResponse(Register::SetLed))
        ));
    }
}
