//! Interrupt line from the MCU.
//!
//! The MCU pulls a GPIO low whenever it has pending interrupt bits. On the
//! target the line is a sysfs GPIO configured for falling edges and armed as
//! a wakeup source.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum InterruptError {
    #[error("Unable to configure {}: {source}", .path.display())]
    Setup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Poll failed: {0}")]
    Poll(#[from] Errno),
    #[error("Unable to read GPIO value: {0}")]
    Read(#[source] io::Error),
}

/// Something that signals "the MCU has pending interrupts".
pub trait InterruptSource {
    /// Block until an edge arrives or `timeout` passes.
    ///
    /// Returns true on an edge, false on timeout. `None` waits forever.
    fn wait_edge(&mut self, timeout: Option<Duration>) -> Result<bool, InterruptError>;
}

/// Sysfs GPIO interrupt input.
pub struct SysfsGpio {
    gpio: u32,
    value: File,
}

const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

impl SysfsGpio {
    /// Export `gpio` as a falling-edge, wake-capable input.
    pub fn open(gpio: u32) -> Result<Self, InterruptError> {
        Self::open_at(Path::new(SYSFS_GPIO_ROOT), gpio)
    }

    fn open_at(root: &Path, gpio: u32) -> Result<Self, InterruptError> {
        let dir = root.join(format!("gpio{}", gpio));
        if !dir.exists() {
            write_attr(&root.join("export"), &gpio.to_string())?;
        }
        write_attr(&dir.join("direction"), "in")?;
        write_attr(&dir.join("edge"), "falling")?;
        if let Err(e) = write_attr(&dir.join("power/wakeup"), "enabled") {
            warn!(gpio, error = %e, "Unable to enable GPIO wakeup");
        }

        let path = dir.join("value");
        let value = File::open(&path).map_err(|source| InterruptError::Setup { path, source })?;
        let mut gpio_line = Self { gpio, value };
        // Consume the current level so the first poll waits for a fresh edge.
        gpio_line.read_value()?;

        info!(gpio, "Interrupt GPIO configured");
        Ok(gpio_line)
    }

    fn read_value(&mut self) -> Result<u8, InterruptError> {
        let mut buf = [0u8; 2];
        self.value
            .seek(SeekFrom::Start(0))
            .map_err(InterruptError::Read)?;
        self.value.read(&mut buf).map_err(InterruptError::Read)?;
        Ok(buf[0])
    }
}

fn write_attr(path: &Path, value: &str) -> Result<(), InterruptError> {
    fs::write(path, value).map_err(|source| InterruptError::Setup {
        path: path.to_path_buf(),
        source,
    })
}

impl InterruptSource for SysfsGpio {
    fn wait_edge(&mut self, timeout: Option<Duration>) -> Result<bool, InterruptError> {
        let millis = match timeout {
            Some(t) => i32::try_from(t.as_millis()).unwrap_or(i32::MAX),
            None => -1,
        };
        let timeout = PollTimeout::try_from(millis).unwrap_or(PollTimeout::NONE);

        let ready = {
            let mut fds = [PollFd::new(
                self.value.as_fd(),
                PollFlags::POLLPRI | PollFlags::POLLERR,
            )];
            match poll(&mut fds, timeout) {
                Ok(0) => return Ok(false),
                Ok(_) => fds[0]
                    .revents()
                    .is_some_and(|r| r.intersects(PollFlags::POLLPRI | PollFlags::POLLERR)),
                Err(Errno::EINTR) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        };

        if ready {
            let level = self.read_value()?;
            debug!(gpio = self.gpio, level = %char::from(level), "Interrupt edge");
        }
        Ok(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scratch_dir;

    fn fake_sysfs(gpio: u32, exported: bool) -> PathBuf {
        let root = scratch_dir("gpio");
        fs::write(root.join("export"), "").unwrap();
        if exported {
            let dir = root.join(format!("gpio{}", gpio));
            fs::create_dir_all(dir.join("power")).unwrap();
            fs::write(dir.join("value"), "1\n").unwrap();
        }
        root
    }

    #[test]
    fn test_configures_exported_line() {
        let root = fake_sysfs(8, true);
        let gpio = SysfsGpio::open_at(&root, 8).unwrap();
        assert_eq!(gpio.gpio, 8);

        let dir = root.join("gpio8");
        assert_eq!(fs::read_to_string(dir.join("direction")).unwrap(), "in");
        assert_eq!(fs::read_to_string(dir.join("edge")).unwrap(), "falling");
        assert_eq!(fs::read_to_string(dir.join("power/wakeup")).unwrap(), "enabled");
        // Already exported: export is left alone.
        assert_eq!(fs::read_to_string(root.join("export")).unwrap(), "");
    }

    #[test]
    fn test_unexported_line_is_exported() {
        let root = fake_sysfs(8, false);
        // The fake export file does not create the directory, so setup fails
        // right after writing the export request.
        let err = SysfsGpio::open_at(&root, 8).err().unwrap();
        assert!(matches!(err, InterruptError::Setup { .. }));
        assert_eq!(fs::read_to_string(root.join("export")).unwrap(), "8");
    }
}
