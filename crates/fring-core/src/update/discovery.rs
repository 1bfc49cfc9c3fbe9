//! Locating firmware images on the host.
//!
//! Images are named `<version>.<suffix>`, where the suffix names the bank
//! the image was linked for (`bin-a` / `bin-b`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::protocol::BootSlot;

/// An image file found in the firmware directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareCandidate {
    pub version: u32,
    pub path: PathBuf,
}

/// Parse `<version>.<suffix>` and return the version if the suffix matches.
fn parse_image_name(name: &str, suffix: &str) -> Option<u32> {
    let mut parts = name.split('.');
    let version = parts.next()?;
    let last = parts.last()?;
    if last != suffix {
        return None;
    }
    version.parse().ok()
}

/// Find the newest image for the bank the MCU is *not* running from.
///
/// Only versions strictly newer than `running_version` qualify.
pub fn find_newer_image(
    dir: &Path,
    running_version: u32,
    running_slot: BootSlot,
) -> io::Result<Option<FirmwareCandidate>> {
    let suffix = running_slot.inactive().image_suffix();
    let mut best: Option<FirmwareCandidate> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(version) = name.to_str().and_then(|n| parse_image_name(n, suffix)) else {
            continue;
        };
        debug!(file = ?name, version, "Found firmware image");

        if version > running_version && best.as_ref().is_none_or(|b| version > b.version) {
            best = Some(FirmwareCandidate {
                version,
                path: entry.path(),
            });
        }
    }

    Ok(best)
}
