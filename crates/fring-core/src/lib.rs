//! Fring-Core: host-side driver for the Fring companion MCU.
//!
//! The MCU sits on an I2C bus and owns the indicator LEDs, battery
//! monitoring and its own A/B-banked firmware. It signals pending work on a
//! GPIO interrupt line.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Register map, command encoding, response decoding
//! - **Transport**: Bus abstraction (Linux i2c-dev, mock)
//! - **Bus**: Serialized transactions shared by the driver and update worker
//! - **State**: Cached device snapshots and LED states
//! - **Events**: Observer pattern for consumers of driver events
//! - **Update**: Image discovery, CRC and the chunked transfer worker
//! - **Driver**: Identification, interrupt dispatch and commands
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use fring_core::{DriverConfig, Fring, LinuxI2cTransport, SysfsGpio};
//!
//! let config = DriverConfig::default();
//! let mut gpio = SysfsGpio::open(config.interrupt_gpio).expect("GPIO");
//! let mut fring = Fring::new(LinuxI2cTransport::default(), config);
//! fring.initialize().expect("Fring not found");
//! fring.run(&mut gpio, &AtomicBool::new(false)).expect("interrupt loop");
//! ```

pub mod bus;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod events;
pub mod init;
pub mod interrupt;
pub mod protocol;
pub mod state;
pub mod telemetry;
pub mod transport;
pub mod update;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use bus::{Bus, BusError};
pub use config::DriverConfig;
pub use driver::{Fring, LedWrite};
pub use events::{FringEvent, FringObserver, NullObserver, RecordingObserver, TracingObserver};
pub use init::{DeviceIdentity, InitError};
pub use interrupt::{InterruptError, InterruptSource, SysfsGpio};
pub use protocol::{BootSlot, UpdateResult, WakeupReason};
pub use state::{Color, LedId, LedState};
pub use transport::{BusTransport, LinuxI2cTransport, MockBus, TransportError};
pub use update::{UpdateError, UpdateState};
