//! Last-known device state and change detection.

use crate::events::FringEvent;
use crate::init::DeviceIdentity;
use crate::protocol::{BatteryStatus, DeviceStatus};

use super::led::LedCache;

/// Snapshots of everything the driver has read from the MCU.
///
/// Owned by the controlling context; the `apply_*` methods return only the
/// events for fields that actually changed.
#[derive(Debug, Default)]
pub struct DeviceStateCache {
    identity: Option<DeviceIdentity>,
    device: Option<DeviceStatus>,
    battery: Option<BatteryStatus>,
    pub(crate) leds: LedCache,
}

impl DeviceStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    pub fn set_identity(&mut self, identity: Option<DeviceIdentity>) {
        self.identity = identity;
    }

    pub fn device_status(&self) -> Option<&DeviceStatus> {
        self.device.as_ref()
    }

    pub fn battery_status(&self) -> Option<&BatteryStatus> {
        self.battery.as_ref()
    }

    /// Unknown until the first device status has been read.
    pub fn battery_present(&self) -> Option<bool> {
        self.device.map(|d| d.hardware_errors.battery_present())
    }

    /// Store a device status snapshot.
    ///
    /// Home button and ambient light are reported on the first snapshot;
    /// hardware errors only once they differ from "no errors".
    pub fn apply_device_status(&mut self, new: DeviceStatus) -> Vec<FringEvent> {
        let mut events = Vec::new();
        let prev = self.device.replace(new);

        if prev.is_none_or(|p| p.home_button() != new.home_button()) {
            events.push(FringEvent::HomeButtonChanged {
                pressed: new.home_button(),
            });
        }

        if prev.is_none_or(|p| p.ambient_light != new.ambient_light) {
            events.push(FringEvent::AmbientLightChanged {
                value: new.ambient_light_normalized(),
            });
        }

        let prev_errors = prev.map(|p| p.hardware_errors).unwrap_or_default();
        if prev_errors != new.hardware_errors {
            events.push(FringEvent::HardwareErrorsChanged {
                errors: new.hardware_errors,
                battery_present: new.hardware_errors.battery_present(),
            });
        }

        events
    }

    /// Store a battery snapshot.
    ///
    /// Capacity, cycle count and status word do not count as a change.
    pub fn apply_battery_status(&mut self, new: BatteryStatus) -> Option<FringEvent> {
        let prev = self.battery.replace(new);

        let changed = prev.is_none_or(|p| {
            p.level != new.level
                || p.charge_current != new.charge_current
                || p.temperature != new.temperature
                || p.time_to_empty != new.time_to_empty
                || p.time_to_full != new.time_to_full
        });

        changed.then(|| FringEvent::BatteryStateChanged {
            level: new.level_fraction(),
            current: new.current_amps(),
            temperature: new.temperature_celsius(),
            minutes_to_empty: new.time_to_empty,
            minutes_to_full: new.time_to_full,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HardwareErrors;
    use crate::protocol::constants::*;

    fn device(home: bool, light: u8, errors: u32) -> DeviceStatus {
        DeviceStatus {
            status: if home { DEVICE_STATUS_HOME_BUTTON } else { 0 },
            hardware_errors: HardwareErrors(errors),
            ambient_light: light,
            temperatures: [30, 31, 32],
        }
    }

    fn battery(level: u8) -> BatteryStatus {
        BatteryStatus {
            level,
            temperature: 50,
            charge_current: 10,
            remaining_capacity: 1500,
            cycle_count: 3,
            time_to_full: 60,
            time_to_empty: 0,
            status: 0x80,
        }
    }

    #[test]
    fn test_first_device_status_reports_button_and_light() {
        let mut cache = DeviceStateCache::new();
        let events = cache.apply_device_status(device(false, 255, 0));
        assert_eq!(
            events,
            vec![
                FringEvent::HomeButtonChanged { pressed: false },
                FringEvent::AmbientLightChanged { value: 1.0 },
            ]
        );
        assert_eq!(cache.battery_present(), Some(true));
    }

    #[test]
    fn test_identical_device_status_is_silent() {
        let mut cache = DeviceStateCache::new();
        cache.apply_device_status(device(true, 10, 0));
        assert!(cache.apply_device_status(device(true, 10, 0)).is_empty());
        assert!(cache.apply_device_status(device(true, 10, 0)).is_empty());
    }

    #[test]
    fn test_temperature_only_change_is_silent() {
        let mut cache = DeviceStateCache::new();
        cache.apply_device_status(device(true, 10, 0));
        let mut warmer = device(true, 10, 0);
        warmer.temperatures = [40, 40, 40];
        assert!(cache.apply_device_status(warmer).is_empty());
    }

    #[test]
    fn test_hardware_error_change() {
        let mut cache = DeviceStateCache::new();
        cache.apply_device_status(device(false, 0, 0));
        let events =
            cache.apply_device_status(device(false, 0, HWERR_BATTERY_NOT_RESPONDING));
        assert_eq!(
            events,
            vec![FringEvent::HardwareErrorsChanged {
                errors: HardwareErrors(HWERR_BATTERY_NOT_RESPONDING),
                battery_present: false,
            }]
        );
        assert_eq!(cache.battery_present(), Some(false));
    }

    #[test]
    fn test_battery_change_detection() {
        let mut cache = DeviceStateCache::new();
        assert!(cache.apply_battery_status(battery(50)).is_some());
        assert!(cache.apply_battery_status(battery(50)).is_none());

        let mut untracked = battery(50);
        untracked.remaining_capacity = 1400;
        untracked.cycle_count = 4;
        untracked.status = 0x81;
        assert!(cache.apply_battery_status(untracked).is_none());

        let event = cache.apply_battery_status(battery(51)).unwrap();
        assert_eq!(
            event,
            FringEvent::BatteryStateChanged {
                level: 0.51,
                current: 0.5,
                temperature: 25.0,
                minutes_to_empty: 0,
                minutes_to_full: 60,
            }
        );
    }
}
