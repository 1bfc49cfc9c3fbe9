//! Status words and result codes carried in responses.

use std::fmt;

use super::constants::*;

/// Firmware bank the MCU can boot from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSlot {
    A,
    B,
}

impl BootSlot {
    /// The bank an update has to be written to.
    pub fn inactive(self) -> Self {
        match self {
            BootSlot::A => BootSlot::B,
            BootSlot::B => BootSlot::A,
        }
    }

    /// File suffix of firmware images built for this bank.
    pub fn image_suffix(self) -> &'static str {
        match self {
            BootSlot::A => "bin-a",
            BootSlot::B => "bin-b",
        }
    }
}

impl fmt::Display for BootSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootSlot::A => write!(f, "A"),
            BootSlot::B => write!(f, "B"),
        }
    }
}

/// Flags reported by the boot info register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootFlags(pub u32);

impl BootFlags {
    pub fn slot(self) -> BootSlot {
        if self.0 & BOOT_STATUS_FIRMWARE_B != 0 {
            BootSlot::B
        } else {
            BootSlot::A
        }
    }

    pub fn is_beta(self) -> bool {
        self.0 & BOOT_STATUS_BETA != 0
    }
}

/// Hardware fault bitmask from the device status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareErrors(pub u32);

impl HardwareErrors {
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn battery_present(self) -> bool {
        self.0 & (HWERR_BATTERY_NOT_RESPONDING | HWERR_BATTERY_INIT_ERROR) == 0
    }
}

impl fmt::Display for HardwareErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Pending interrupt sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptStatus(pub u32);

impl InterruptStatus {
    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

/// Outcome the MCU reports for the most recent firmware chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    Ok,
    CrcMismatch,
    BadOffset,
    FlashError,
    Unknown(u32),
}

impl UpdateResult {
    pub fn from_u32(code: u32) -> Self {
        match code {
            UPDATE_RESULT_OK => Self::Ok,
            UPDATE_RESULT_CRC_MISMATCH => Self::CrcMismatch,
            UPDATE_RESULT_BAD_OFFSET => Self::BadOffset,
            UPDATE_RESULT_FLASH_ERROR => Self::FlashError,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Ok => UPDATE_RESULT_OK,
            Self::CrcMismatch => UPDATE_RESULT_CRC_MISMATCH,
            Self::BadOffset => UPDATE_RESULT_BAD_OFFSET,
            Self::FlashError => UPDATE_RESULT_FLASH_ERROR,
            Self::Unknown(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::CrcMismatch => write!(f, "CRC mismatch"),
            Self::BadOffset => write!(f, "bad offset"),
            Self::FlashError => write!(f, "flash error"),
            Self::Unknown(code) => write!(f, "unknown result {}", code),
        }
    }
}

/// Why the MCU last woke the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeupReason {
    None,
    HomeButton,
    Timer,
    Charger,
    Other(u8),
}

impl WakeupReason {
    pub fn from_u8(reason: u8) -> Self {
        match reason {
            WAKEUP_REASON_NONE => Self::None,
            WAKEUP_REASON_HOME_BUTTON => Self::HomeButton,
            WAKEUP_REASON_TIMER => Self::Timer,
            WAKEUP_REASON_CHARGER => Self::Charger,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for WakeupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::HomeButton => write!(f, "home button"),
            Self::Timer => write!(f, "timer"),
            Self::Charger => write!(f, "charger"),
            Self::Other(n) => write!(f, "reason {}", n),
        }
    }
}
