//! Driver-side state: cached device snapshots and LED states.

pub mod cache;
pub mod led;

pub use cache::DeviceStateCache;
pub use led::{Color, LedCache, LedId, LedState};
