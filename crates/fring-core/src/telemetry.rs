//! Battery telemetry log.
//!
//! One semicolon-separated line per battery status read:
//! `elapsed-ms;current-A;level;temp-raw;capacity;ttf;tte;status-hex`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::protocol::BatteryStatus;

pub struct BatteryLog {
    path: PathBuf,
    started: Option<Instant>,
}

impl BatteryLog {
    /// Create the first `batterylog-N.log` in `dir` that does not exist yet.
    pub fn create_in(dir: &Path) -> io::Result<Self> {
        let mut n = 1u32;
        loop {
            let path = dir.join(format!("batterylog-{}.log", n));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    info!(path = %path.display(), "Using battery log");
                    return Ok(Self {
                        path,
                        started: None,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Elapsed time counts from the first record.
    pub fn append(&mut self, status: &BatteryStatus) {
        let started = *self.started.get_or_insert_with(Instant::now);
        let line = format_record(started.elapsed().as_millis(), status);
        if let Err(e) = self.write_line(&line) {
            warn!(path = %self.path.display(), error = %e, "Unable to write battery log");
        }
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut file: File = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

fn format_record(elapsed_ms: u128, s: &BatteryStatus) -> String {
    format!(
        "{};{};{};{};{};{};{};{:x}",
        elapsed_ms,
        s.current_amps(),
        s.level,
        s.temperature,
        s.remaining_capacity,
        s.time_to_full,
        s.time_to_empty,
        s.status
    )
}
