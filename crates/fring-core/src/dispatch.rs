//! Interrupt status bits and the order they are serviced in.

use std::fmt;

use crate::protocol::InterruptStatus;
use crate::protocol::constants::*;

/// Sub-system behind one interrupt status bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptKind {
    DeviceStatus,
    BatteryStatus,
    LogMessage,
    FirmwareUpdate,
    WakeupReason,
}

impl InterruptKind {
    /// Service order. Handlers are independent; a failing one does not
    /// stop the rest.
    pub const ORDER: [InterruptKind; 5] = [
        InterruptKind::DeviceStatus,
        InterruptKind::BatteryStatus,
        InterruptKind::LogMessage,
        InterruptKind::FirmwareUpdate,
        InterruptKind::WakeupReason,
    ];

    pub fn bit(self) -> u32 {
        match self {
            InterruptKind::DeviceStatus => INTERRUPT_DEVICE_STATUS,
            InterruptKind::BatteryStatus => INTERRUPT_BATTERY_STATUS,
            InterruptKind::LogMessage => INTERRUPT_LOG_MESSAGE,
            InterruptKind::FirmwareUpdate => INTERRUPT_FIRMWARE_UPDATE,
            InterruptKind::WakeupReason => INTERRUPT_WAKEUP,
        }
    }
}

impl fmt::Display for InterruptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptKind::DeviceStatus => write!(f, "DEVICE_STATUS"),
            InterruptKind::BatteryStatus => write!(f, "BATTERY_STATUS"),
            InterruptKind::LogMessage => write!(f, "LOG_MESSAGE"),
            InterruptKind::FirmwareUpdate => write!(f, "FIRMWARE_UPDATE"),
            InterruptKind::WakeupReason => write!(f, "WAKEUP_REASON"),
        }
    }
}

/// Pending sub-systems in service order. Unknown bits are ignored.
pub fn pending(status: InterruptStatus) -> impl Iterator<Item = InterruptKind> {
    InterruptKind::ORDER
        .into_iter()
        .filter(move |kind| status.contains(kind.bit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_in_fixed_order() {
        let status = InterruptStatus(
            INTERRUPT_WAKEUP | INTERRUPT_DEVICE_STATUS | INTERRUPT_FIRMWARE_UPDATE,
        );
        let kinds: Vec<_> = pending(status).collect();
        assert_eq!(
            kinds,
            vec![
                InterruptKind::DeviceStatus,
                InterruptKind::FirmwareUpdate,
                InterruptKind::WakeupReason,
            ]
        );
    }

    #[test]
    fn test_unknown_bits_ignored() {
        assert_eq!(pending(InterruptStatus(1 << 31)).count(), 0);
        assert_eq!(pending(InterruptStatus(0)).count(), 0);
    }

    #[test]
    fn test_bits_are_distinct() {
        let all = InterruptKind::ORDER.iter().fold(0u32, |acc, k| {
            assert_eq!(acc & k.bit(), 0);
            acc | k.bit()
        });
        assert_eq!(all.count_ones(), 5);
    }
}
