//! Register identifiers.

use std::fmt;

use super::constants::*;

/// Selects which fixed-layout command/response a transaction carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    Identify = REG_ID,
    ReadBootInfo = REG_READ_BOOT_INFO,
    SetSerial = REG_SET_SERIAL,
    ReadBoardRevision = REG_READ_BOARD_REVISION,
    SetLed = REG_SET_LED,
    ReadDeviceStatus = REG_READ_DEVICE_STATUS,
    ReadBatteryStatus = REG_READ_BATTERY_STATUS,
    ReadLogMessage = REG_READ_LOG_MESSAGE,
    ReadWakeupReason = REG_READ_WAKEUP_REASON,
    SetWakeupTime = REG_SET_WAKEUP_TIME,
    PushFirmwareUpdate = REG_PUSH_FIRMWARE_UPDATE,
    ReadFirmwareUpdateResult = REG_READ_FIRMWARE_UPDATE_RESULT,
    ReadInterruptStatus = REG_READ_INTERRUPT_STATUS,
}

impl Register {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            REG_ID => Self::Identify,
            REG_READ_BOOT_INFO => Self::ReadBootInfo,
            REG_SET_SERIAL => Self::SetSerial,
            REG_READ_BOARD_REVISION => Self::ReadBoardRevision,
            REG_SET_LED => Self::SetLed,
            REG_READ_DEVICE_STATUS => Self::ReadDeviceStatus,
            REG_READ_BATTERY_STATUS => Self::ReadBatteryStatus,
            REG_READ_LOG_MESSAGE => Self::ReadLogMessage,
            REG_READ_WAKEUP_REASON => Self::ReadWakeupReason,
            REG_SET_WAKEUP_TIME => Self::SetWakeupTime,
            REG_PUSH_FIRMWARE_UPDATE => Self::PushFirmwareUpdate,
            REG_READ_FIRMWARE_UPDATE_RESULT => Self::ReadFirmwareUpdateResult,
            REG_READ_INTERRUPT_STATUS => Self::ReadInterruptStatus,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Size of the response the MCU returns for this register.
    ///
    /// Zero for write-only registers.
    pub fn response_len(self) -> usize {
        match self {
            Self::Identify => ID_RESPONSE_LEN,
            Self::ReadBootInfo => BOOT_INFO_RESPONSE_LEN,
            Self::ReadBoardRevision => BOARD_REVISION_RESPONSE_LEN,
            Self::ReadDeviceStatus => DEVICE_STATUS_RESPONSE_LEN,
            Self::ReadBatteryStatus => BATTERY_STATUS_RESPONSE_LEN,
            Self::ReadLogMessage => LOG_MESSAGE_LEN,
            Self::ReadWakeupReason => WAKEUP_REASON_RESPONSE_LEN,
            Self::ReadFirmwareUpdateResult => UPDATE_RESULT_RESPONSE_LEN,
            Self::ReadInterruptStatus => INTERRUPT_STATUS_RESPONSE_LEN,
            Self::SetSerial | Self::SetLed | Self::SetWakeupTime | Self::PushFirmwareUpdate => 0,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identify => "ID",
            Self::ReadBootInfo => "READ_BOOT_INFO",
            Self::SetSerial => "SET_SERIAL",
            Self::ReadBoardRevision => "READ_BOARD_REVISION",
            Self::SetLed => "SET_LED",
            Self::ReadDeviceStatus => "READ_DEVICE_STATUS",
            Self::ReadBatteryStatus => "READ_BATTERY_STATUS",
            Self::ReadLogMessage => "READ_LOG_MESSAGE",
            Self::ReadWakeupReason => "READ_WAKEUP_REASON",
            Self::SetWakeupTime => "SET_WAKEUP_TIME",
            Self::PushFirmwareUpdate => "PUSH_FIRMWARE_UPDATE",
            Self::ReadFirmwareUpdateResult => "READ_FIRMWARE_UPDATE_RESULT",
            Self::ReadInterruptStatus => "READ_INTERRUPT_STATUS",
        };
        write!(f, "{}(0x{:02X})", name, self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_from_u8() {
        assert_eq!(Register::from_u8(0x00), Some(Register::Identify));
        assert_eq!(
            Register::from_u8(0xFF),
            Some(Register::ReadInterruptStatus)
        );
        assert_eq!(Register::from_u8(0x77), None);
    }

    #[test]
    fn test_write_only_registers_have_no_response() {
        assert_eq!(Register::SetLed.response_len(), 0);
        assert_eq!(Register::PushFirmwareUpdate.response_len(), 0);
        assert_eq!(Register::ReadLogMessage.response_len(), 16);
    }

    #[test]
    fn test_display() {
        assert_eq!(Register::SetLed.to_string(), "SET_LED(0x10)");
    }
}
