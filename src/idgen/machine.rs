/// Machine tag derivation
///
/// The 48-bit machine tag distinguishes minting processes. It is resolved
/// once at startup and fixed for the process lifetime: an explicit
/// configuration value wins, then the first non-loopback hardware network
/// address, then a random tag.
use crate::error::{WaypointError, WaypointResult};
use crate::idgen::codec::MACHINE_TAG_BITS;
use tracing::{info, warn};

const MACHINE_TAG_MASK: u64 = (1 << MACHINE_TAG_BITS) - 1;

/// A validated 48-bit machine tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineTag(u64);

impl MachineTag {
    /// Wrap an explicit tag value, checking the 48-bit bound
    pub fn new(value: u64) -> WaypointResult<Self> {
        if value > MACHINE_TAG_MASK {
            return Err(WaypointError::Validation(
                "Machine tag must fit in 48 bits".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Resolve the process-wide tag: explicit config, then hardware
    /// address, then random.
    pub fn derive(explicit: Option<u64>) -> WaypointResult<Self> {
        if let Some(value) = explicit {
            let tag = Self::new(value)?;
            info!(tag = %tag, "Machine tag set from configuration");
            return Ok(tag);
        }

        if let Some(value) = Self::from_hardware() {
            let tag = Self(value & MACHINE_TAG_MASK);
            info!(tag = %tag, "Machine tag derived from hardware address");
            return Ok(tag);
        }

        let tag = Self(rand::random::<u64>() & MACHINE_TAG_MASK);
        warn!(tag = %tag, "No hardware address available; using random machine tag");
        Ok(tag)
    }

    /// Tag value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// First non-loopback MAC address, read from sysfs
    #[cfg(target_os = "linux")]
    fn from_hardware() -> Option<u64> {
        let entries = std::fs::read_dir("/sys/class/net").ok()?;
        for entry in entries.flatten() {
            if entry.file_name() == "lo" {
                continue;
            }
            let Ok(raw) = std::fs::read_to_string(entry.path().join("address")) else {
                continue;
            };
            let digits: String = raw.trim().split(':').collect();
            if let Ok(value) = u64::from_str_radix(&digits, 16) {
                if value != 0 {
                    return Some(value);
                }
            }
        }
        None
    }

    #[cfg(not(target_os = "linux"))]
    fn from_hardware() -> Option<u64> {
        None
    }
}

impl std::fmt::Display for MachineTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}
