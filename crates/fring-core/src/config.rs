//! Driver configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::protocol::constants::{I2C_ADDRESS, I2C_BUS, INTERRUPT_GPIO};

/// Environment variable naming the battery telemetry directory.
pub const BATTERY_LOG_DIR_ENV: &str = "FRING_BATTERY_LOG_DIR";

/// Configuration for a [`Fring`](crate::Fring) driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// I2C bus number (`/dev/i2c-N`).
    pub i2c_bus: u8,
    /// 7-bit address of the MCU.
    pub i2c_address: u16,
    /// Sysfs GPIO number of the interrupt line.
    pub interrupt_gpio: u32,
    /// Directory scanned for `<version>.bin-a` / `<version>.bin-b` images.
    pub firmware_dir: PathBuf,
    /// Check for and flash newer firmware during initialization.
    pub firmware_updates: bool,
    /// Battery telemetry directory; disabled when unset.
    pub battery_log_dir: Option<PathBuf>,
    /// Delay before re-identifying after a successful update.
    pub update_settle_ms: u64,
    /// Per-chunk acknowledgment timeout; 0 waits forever.
    pub ack_timeout_ms: u64,
    /// Upper bound on one interrupt wait in the run loop.
    pub poll_interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            i2c_bus: I2C_BUS,
            i2c_address: I2C_ADDRESS,
            interrupt_gpio: INTERRUPT_GPIO,
            firmware_dir: PathBuf::from("/app/firmware/fring"),
            firmware_updates: true,
            battery_log_dir: None,
            update_settle_ms: 10_000,
            ack_timeout_ms: 5_000,
            poll_interval_ms: 1_000,
        }
    }
}

impl DriverConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DriverConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(BATTERY_LOG_DIR_ENV).filter(|d| !d.is_empty()) {
            self.battery_log_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn update_settle(&self) -> Duration {
        Duration::from_millis(self.update_settle_ms)
    }

    pub fn ack_timeout(&self) -> Option<Duration> {
        (self.ack_timeout_ms > 0).then(|| Duration::from_millis(self.ack_timeout_ms))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scratch_dir;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.i2c_bus, 0);
        assert_eq!(config.i2c_address, 0x42);
        assert_eq!(config.interrupt_gpio, 8);
        assert_eq!(config.update_settle(), Duration::from_secs(10));
        assert_eq!(config.ack_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_file_round_trip() {
        let path = scratch_dir("config").join("fring.toml");
        let config = DriverConfig {
            battery_log_dir: Some(PathBuf::from("/var/log/fring")),
            ack_timeout_ms: 0,
            firmware_updates: false,
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = DriverConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.ack_timeout(), None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DriverConfig = toml::from_str("i2c_bus = 2\n").unwrap();
        assert_eq!(config.i2c_bus, 2);
        assert_eq!(config.i2c_address, 0x42);
        assert!(config.firmware_updates);
    }

    #[test]
    fn test_env_override() {
        let mut config = DriverConfig::default();
        config.apply_env_from(|_| Some(String::new()));
        assert_eq!(config.battery_log_dir, None);

        config.apply_env_from(|key| {
            (key == BATTERY_LOG_DIR_ENV).then(|| "/tmp/batlogs".to_string())
        });
        assert_eq!(config.battery_log_dir, Some(PathBuf::from("/tmp/batlogs")));
    }
}
