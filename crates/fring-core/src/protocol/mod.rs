//! Fring wire protocol.
//!
//! Every transaction is one write (register byte plus a fixed payload) followed
//! by a read of the fixed-size response for that register.

pub mod command;
pub mod constants;
pub mod register;
pub mod response;
pub mod status;

pub use command::{FirmwareChunk, LedCommand, WriteCommand};
pub use register::Register;
pub use response::{
    BatteryStatus, BoardRevision, BootInfo, DeviceStatus, IdResponse, ProtocolError, Response,
};
pub use status::{
    BootFlags, BootSlot, HardwareErrors, InterruptStatus, UpdateResult, WakeupReason,
};
