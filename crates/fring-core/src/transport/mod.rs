//! Transport layer module.

pub mod i2c;
pub mod mock;
pub mod traits;

pub use i2c::LinuxI2cTransport;
pub use mock::MockBus;
pub use traits::{BusTransport, TransportError};
