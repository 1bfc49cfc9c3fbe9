//! Wire constants for the Fring companion MCU.
//!
//! All multi-byte fields on the bus are little-endian.

/// I2C bus the MCU is wired to.
pub const I2C_BUS: u8 = 0;
/// Fixed 7-bit slave address of the MCU.
pub const I2C_ADDRESS: u16 = 0x42;
/// GPIO carrying the MCU interrupt line (active low).
pub const INTERRUPT_GPIO: u32 = 8;

/// Magic returned by the Identify register.
pub const FRING_MAGIC: [u8; 5] = *b"Fring";
/// Protocol version announced in the Identify command.
pub const PROTOCOL_VERSION: u8 = 1;

// Register identifiers
pub const REG_ID: u8 = 0x00;
pub const REG_READ_BOOT_INFO: u8 = 0x01;
pub const REG_SET_SERIAL: u8 = 0x02;
pub const REG_READ_BOARD_REVISION: u8 = 0x03;
pub const REG_SET_LED: u8 = 0x10;
pub const REG_READ_DEVICE_STATUS: u8 = 0x20;
pub const REG_READ_BATTERY_STATUS: u8 = 0x21;
pub const REG_READ_LOG_MESSAGE: u8 = 0x22;
pub const REG_READ_WAKEUP_REASON: u8 = 0x23;
pub const REG_SET_WAKEUP_TIME: u8 = 0x24;
pub const REG_PUSH_FIRMWARE_UPDATE: u8 = 0xF0;
pub const REG_READ_FIRMWARE_UPDATE_RESULT: u8 = 0xF1;
pub const REG_READ_INTERRUPT_STATUS: u8 = 0xFF;

// Boot info flags
pub const BOOT_STATUS_FIRMWARE_B: u32 = 1 << 0;
pub const BOOT_STATUS_BETA: u32 = 1 << 1;

// Device status bits
pub const DEVICE_STATUS_HOME_BUTTON: u32 = 1 << 0;

// Hardware error bits
pub const HWERR_BATTERY_NOT_RESPONDING: u32 = 1 << 0;
pub const HWERR_BATTERY_INIT_ERROR: u32 = 1 << 1;

// Interrupt status bits
pub const INTERRUPT_DEVICE_STATUS: u32 = 1 << 0;
pub const INTERRUPT_BATTERY_STATUS: u32 = 1 << 1;
pub const INTERRUPT_LOG_MESSAGE: u32 = 1 << 2;
pub const INTERRUPT_FIRMWARE_UPDATE: u32 = 1 << 3;
pub const INTERRUPT_WAKEUP: u32 = 1 << 4;

// LED modes
pub const LED_MODE_OFF: u8 = 0;
pub const LED_MODE_ON: u8 = 1;
pub const LED_MODE_FLASHING: u8 = 2;
pub const LED_MODE_PULSATING: u8 = 3;

// Firmware update result codes
pub const UPDATE_RESULT_OK: u32 = 0;
pub const UPDATE_RESULT_CRC_MISMATCH: u32 = 1;
pub const UPDATE_RESULT_BAD_OFFSET: u32 = 2;
pub const UPDATE_RESULT_FLASH_ERROR: u32 = 3;

// Wakeup reasons
pub const WAKEUP_REASON_NONE: u8 = 0;
pub const WAKEUP_REASON_HOME_BUTTON: u8 = 1;
pub const WAKEUP_REASON_TIMER: u8 = 2;
pub const WAKEUP_REASON_CHARGER: u8 = 3;

/// Length of the serial number carried in boot info and Set-Serial.
pub const SERIAL_LEN: usize = 8;
/// Length of the LED state block inside Set-LED.
pub const LED_STATE_LEN: usize = 7;
/// Length of a log message buffer.
pub const LOG_MESSAGE_LEN: usize = 16;
/// Largest firmware payload carried by one Push-Firmware-Update.
pub const MAX_CHUNK_SIZE: usize = 32;
/// Push-Firmware-Update header: offset, length, crc.
pub const FIRMWARE_CHUNK_HEADER_LEN: usize = 12;

// Response sizes
pub const ID_RESPONSE_LEN: usize = 6;
pub const BOOT_INFO_RESPONSE_LEN: usize = 16;
pub const BOARD_REVISION_RESPONSE_LEN: usize = 2;
pub const DEVICE_STATUS_RESPONSE_LEN: usize = 12;
pub const BATTERY_STATUS_RESPONSE_LEN: usize = 14;
pub const WAKEUP_REASON_RESPONSE_LEN: usize = 1;
pub const UPDATE_RESULT_RESPONSE_LEN: usize = 4;
pub const INTERRUPT_STATUS_RESPONSE_LEN: usize = 4;
