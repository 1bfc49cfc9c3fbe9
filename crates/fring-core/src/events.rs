//! Event system for decoupling the driver from its consumers.
//!
//! The daemon, a D-Bus bridge or a test can subscribe to driver events
//! without tight coupling to the protocol logic.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::protocol::{BootSlot, HardwareErrors, WakeupReason};

/// Events emitted by the driver and the firmware update worker.
#[derive(Debug, Clone, PartialEq)]
pub enum FringEvent {
    /// Initialization identified the MCU.
    DeviceIdentified {
        firmware_version: u32,
        slot: BootSlot,
        beta: bool,
        serial: String,
    },
    HomeButtonChanged { pressed: bool },
    /// Ambient light, 0..=1.
    AmbientLightChanged { value: f64 },
    HardwareErrorsChanged {
        errors: HardwareErrors,
        battery_present: bool,
    },
    BatteryStateChanged {
        /// 0..=1.
        level: f64,
        /// Amperes, negative while discharging.
        current: f64,
        /// Degrees Celsius.
        temperature: f64,
        minutes_to_empty: u16,
        minutes_to_full: u16,
    },
    LogMessageReceived { message: String },
    WakeupReasonChanged { reason: WakeupReason },
    /// Fraction of the image acknowledged, 0..=1 in 1% steps.
    FirmwareUpdateProgress { fraction: f64 },
    FirmwareUpdateSucceeded,
    FirmwareUpdateFailed { reason: String },
}

/// Observer trait for receiving driver events.
///
/// Called from the controlling thread and from the update worker.
pub trait FringObserver: Send + Sync {
    fn on_event(&self, event: &FringEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl FringObserver for NullObserver {
    fn on_event(&self, _event: &FringEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl FringObserver for TracingObserver {
    fn on_event(&self, event: &FringEvent) {
        match event {
            FringEvent::DeviceIdentified {
                firmware_version,
                slot,
                beta,
                serial,
            } => {
                tracing::info!(version = firmware_version, slot = %slot, beta, serial = %serial, "Device identified");
            }
            FringEvent::HomeButtonChanged { pressed } => {
                tracing::info!(pressed, "Home button changed");
            }
            FringEvent::AmbientLightChanged { value } => {
                tracing::debug!(value = %format!("{:.3}", value), "Ambient light changed");
            }
            FringEvent::HardwareErrorsChanged {
                errors,
                battery_present,
            } => {
                if errors.is_empty() {
                    tracing::info!("Hardware errors cleared");
                } else {
                    tracing::warn!(errors = %errors, battery_present, "Hardware errors changed");
                }
            }
            FringEvent::BatteryStateChanged {
                level,
                current,
                temperature,
                minutes_to_empty,
                minutes_to_full,
            } => {
                tracing::info!(
                    level = %format!("{:.0}%", level * 100.0),
                    current = %format!("{:.2} A", current),
                    temperature = %format!("{:.1} °C", temperature),
                    to_empty = minutes_to_empty,
                    to_full = minutes_to_full,
                    "Battery state changed"
                );
            }
            FringEvent::LogMessageReceived { message } => {
                tracing::info!(target: "fring::mcu", "{}", message);
            }
            FringEvent::WakeupReasonChanged { reason } => {
                tracing::info!(reason = %reason, "Wakeup reason");
            }
            FringEvent::FirmwareUpdateProgress { fraction } => {
                tracing::info!(progress = %format!("{:.0}%", fraction * 100.0), "Update progress");
            }
            FringEvent::FirmwareUpdateSucceeded => {
                tracing::info!("Firmware update succeeded");
            }
            FringEvent::FirmwareUpdateFailed { reason } => {
                tracing::error!(reason = %reason, "Firmware update failed");
            }
        }
    }
}

/// Observer that keeps the most recent events for later inspection.
pub struct RecordingObserver {
    events: Mutex<VecDeque<FringEvent>>,
    capacity: usize,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn drain_events(&self) -> Vec<FringEvent> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.drain(..).collect()
    }

    pub fn snapshot(&self) -> Vec<FringEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.iter().cloned().collect()
    }
}

impl Default for RecordingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl FringObserver for RecordingObserver {
    fn on_event(&self, event: &FringEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_drops_oldest() {
        let obs = RecordingObserver::with_capacity(2);
        for pressed in [true, false, true] {
            obs.on_event(&FringEvent::HomeButtonChanged { pressed });
        }
        let events = obs.drain_events();
        assert_eq!(
            events,
            vec![
                FringEvent::HomeButtonChanged { pressed: false },
                FringEvent::HomeButtonChanged { pressed: true },
            ]
        );
        assert!(obs.drain_events().is_empty());
    }
}
