//! Counter source reader.
//!
//! A [`Sampler`] reads one snapshot of raw counter lines per call, either from
//! the combined `/proc/diskstats` listing or from a per-device
//! `/sys/block/<dev>/stat` file, and stamps each retained line with the
//! capture time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::collector::procfs::{parse_diskstats, parse_sys_block_stat};
use crate::collector::traits::FileSystem;
use crate::config::ConfigError;
use crate::models::RawSample;
use crate::util::KernelVersion;

/// Error type for a failed capture tick.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading a counter source.
    Io(std::io::Error),
    /// Parse error in a counter source.
    Parse(String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

// ============ Device selection ============

/// Device families that are never captured: loop devices, optical drives
/// and floppies.
pub const EXCLUDED_PREFIXES: &[&str] = &["loop", "sr", "fd"];

/// Returns true for `loopN`, `srN` and `fdN` devices.
pub fn is_excluded(device: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|prefix| {
        device
            .strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
}

/// Which devices a run captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSet {
    /// Every non-excluded device and partition.
    All,
    /// One device.
    Single(String),
    /// Several devices (comma-separated on the command line).
    List(Vec<String>),
}

impl DeviceSet {
    /// Parses `all`, `sda` or `sda,sdb`.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Err(ConfigError::InvalidDevice("no device given".to_string()));
        }
        if input == "all" {
            return Ok(DeviceSet::All);
        }

        let mut names: Vec<String> = Vec::new();
        for name in input.split(',').map(str::trim) {
            if name.is_empty() {
                return Err(ConfigError::InvalidDevice(format!(
                    "empty entry in '{}'",
                    input
                )));
            }
            if name.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidDevice(format!(
                    "'{}' is not a device name",
                    name
                )));
            }
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        Ok(match names.len() {
            1 => DeviceSet::Single(names.remove(0)),
            _ => DeviceSet::List(names),
        })
    }

    /// All and List modes also write the aggregate file.
    pub fn is_multi(&self) -> bool {
        !matches!(self, DeviceSet::Single(_))
    }

    /// Returns true if a line for `device` should be captured.
    pub fn matches(&self, device: &str) -> bool {
        if is_excluded(device) {
            return false;
        }
        match self {
            DeviceSet::All => true,
            DeviceSet::Single(name) => name == device,
            DeviceSet::List(names) => names.iter().any(|n| n == device),
        }
    }
}

impl std::fmt::Display for DeviceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSet::All => f.write_str("all"),
            DeviceSet::Single(name) => f.write_str(name),
            DeviceSet::List(names) => f.write_str(&names.join(",")),
        }
    }
}

// ============ Sources ============

/// The kernel-exposed listing a sampler reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// `/proc/diskstats`, filtered by device name.
    Combined { path: PathBuf },
    /// `/sys/block/<dev>/stat` (or `/sys/class/block/<dev>/stat`).
    PerDevice { device: String, path: PathBuf },
}

impl Source {
    pub fn path(&self) -> &Path {
        match self {
            Source::Combined { path } | Source::PerDevice { path, .. } => path,
        }
    }
}

/// Reads raw counter snapshots for a device set.
pub struct Sampler<F: FileSystem> {
    fs: F,
    devices: DeviceSet,
    source: Source,
}

impl<F: FileSystem> Sampler<F> {
    /// Selects the source for `devices`.
    ///
    /// A single device uses its per-device stat file when the kernel provides
    /// one; everything else reads the combined listing.
    pub fn new(
        fs: F,
        proc_path: &Path,
        sys_path: &Path,
        devices: DeviceSet,
        kernel: KernelVersion,
    ) -> Self {
        let combined = Source::Combined {
            path: proc_path.join("diskstats"),
        };

        let source = match &devices {
            DeviceSet::Single(device) if kernel.has_sys_block_stat() => {
                let candidates = [
                    sys_path.join("block").join(device).join("stat"),
                    sys_path.join("class/block").join(device).join("stat"),
                ];
                match candidates.into_iter().find(|p| fs.exists(p)) {
                    Some(path) => Source::PerDevice {
                        device: device.clone(),
                        path,
                    },
                    None => {
                        debug!("no per-device stat file for {}, using combined listing", device);
                        combined
                    }
                }
            }
            _ => combined,
        };

        info!("Capturing from {}", source.path().display());

        Self {
            fs,
            devices,
            source,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Reads the source once and stamps every retained line with `now`.
    ///
    /// The file is opened fresh on every call.
    pub fn sample(&self, now: DateTime<Utc>) -> Result<Vec<RawSample>, CollectError> {
        let content = self.fs.read_to_string(self.source.path())?;

        match &self.source {
            Source::Combined { .. } => Ok(parse_diskstats(&content)
                .into_iter()
                .filter(|line| self.devices.matches(&line.device))
                .map(|line| RawSample::new(now, line.device, line.tokens))
                .collect()),
            Source::PerDevice { device, .. } => {
                let tokens =
                    parse_sys_block_stat(&content).map_err(|e| CollectError::Parse(e.message))?;
                Ok(vec![RawSample::new(now, device.clone(), tokens)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    fn sampler(fs: &MockFs, devices: DeviceSet, kernel: KernelVersion) -> Sampler<&MockFs> {
        Sampler::new(fs, Path::new("/proc"), Path::new("/sys"), devices, kernel)
    }

    #[test]
    fn test_is_excluded() {
        assert!(is_excluded("loop0"));
        assert!(is_excluded("loop12"));
        assert!(is_excluded("sr0"));
        assert!(is_excluded("fd0"));
        assert!(!is_excluded("sda"));
        assert!(!is_excluded("loop"));
        assert!(!is_excluded("srv1"));
        assert!(!is_excluded("fda"));
        assert!(!is_excluded("nvme0n1"));
    }

    #[test]
    fn test_device_set_parse() {
        assert_eq!(DeviceSet::parse("all").unwrap(), DeviceSet::All);
        assert_eq!(DeviceSet::parse("ALL").unwrap(), DeviceSet::All);
        assert_eq!(
            DeviceSet::parse("SDC").unwrap(),
            DeviceSet::Single("sdc".to_string())
        );
        assert_eq!(
            DeviceSet::parse("sdc,sdb").unwrap(),
            DeviceSet::List(vec!["sdc".to_string(), "sdb".to_string()])
        );
        assert_eq!(
            DeviceSet::parse("sdc, sdc").unwrap(),
            DeviceSet::Single("sdc".to_string())
        );
        assert!(DeviceSet::parse("").is_err());
        assert!(DeviceSet::parse("sda,,sdb").is_err());
        assert!(DeviceSet::parse("sda,").is_err());
    }

    #[test]
    fn test_device_set_matches() {
        let list = DeviceSet::parse("sda,sdb").unwrap();
        assert!(list.is_multi());
        assert!(list.matches("sda"));
        assert!(!list.matches("sda1"));
        assert!(!DeviceSet::All.matches("loop3"));
        assert!(DeviceSet::All.matches("sda1"));
        assert!(!DeviceSet::Single("sda".into()).is_multi());
        assert_eq!(list.to_string(), "sda,sdb");
    }

    #[test]
    fn test_all_reads_combined_and_filters_excluded() {
        let fs = MockFs::typical_host();
        let s = sampler(&fs, DeviceSet::All, KernelVersion::new(5, 15));
        assert_eq!(
            s.source(),
            &Source::Combined {
                path: PathBuf::from("/proc/diskstats")
            }
        );

        let batch = s.sample(now()).unwrap();
        let devices: Vec<&str> = batch.iter().map(|r| r.device.as_str()).collect();
        assert_eq!(devices, vec!["sda", "sda1", "sdb"]);
        assert!(batch.iter().all(|r| r.field_count() == 16));
        assert!(batch.iter().all(|r| r.captured_at == now()));
    }

    #[test]
    fn test_list_filters_by_exact_name() {
        let fs = MockFs::typical_host();
        let s = sampler(
            &fs,
            DeviceSet::parse("sdb,sda").unwrap(),
            KernelVersion::new(5, 15),
        );
        let batch = s.sample(now()).unwrap();
        let devices: Vec<&str> = batch.iter().map(|r| r.device.as_str()).collect();
        assert_eq!(devices, vec!["sda", "sdb"]);
    }

    #[test]
    fn test_single_prefers_sys_block() {
        let fs = MockFs::typical_host();
        let s = sampler(&fs, DeviceSet::Single("sda".into()), KernelVersion::new(5, 15));
        assert_eq!(
            s.source(),
            &Source::PerDevice {
                device: "sda".to_string(),
                path: PathBuf::from("/sys/block/sda/stat")
            }
        );

        let batch = s.sample(now()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].device, "sda");
        // extended columns trimmed to the classic eleven
        assert_eq!(batch[0].field_count(), 13);
        assert_eq!(batch[0].fields[2], "1000");
    }

    #[test]
    fn test_single_partition_uses_class_block() {
        let fs = MockFs::typical_host();
        let s = sampler(&fs, DeviceSet::Single("sda1".into()), KernelVersion::new(5, 15));
        assert_eq!(s.source().path(), Path::new("/sys/class/block/sda1/stat"));
    }

    #[test]
    fn test_four_counter_partition_stat_is_classified() {
        let fs = MockFs::typical_host();
        fs.add_file("/sys/class/block/sda1/stat", "900 7200 450 3600\n");
        let s = sampler(&fs, DeviceSet::Single("sda1".into()), KernelVersion::new(2, 6));

        let batch = s.sample(now()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].field_count(), 6);

        let c = crate::schema::classify(&batch[0]).unwrap();
        assert_eq!(c.variant, crate::schema::SchemaVariant::SysBlockPartition);
        assert_eq!(c.counters.sectors_written, 3600);
    }

    #[test]
    fn test_single_falls_back_to_combined_on_old_kernel() {
        let fs = MockFs::typical_host();
        let s = sampler(&fs, DeviceSet::Single("sdb".into()), KernelVersion::new(2, 4));
        assert!(matches!(s.source(), Source::Combined { .. }));

        let batch = s.sample(now()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].device, "sdb");
    }

    #[test]
    fn test_single_falls_back_when_stat_missing() {
        let fs = MockFs::typical_host();
        let s = sampler(&fs, DeviceSet::Single("sdz".into()), KernelVersion::new(5, 15));
        assert!(matches!(s.source(), Source::Combined { .. }));
        assert!(s.sample(now()).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_source_is_an_error() {
        let fs = MockFs::typical_host();
        let s = sampler(&fs, DeviceSet::All, KernelVersion::new(5, 15));
        fs.remove_file("/proc/diskstats");
        assert!(matches!(s.sample(now()), Err(CollectError::Io(_))));
    }

    #[test]
    fn test_source_is_reread_every_tick() {
        let fs = MockFs::typical_host();
        let s = sampler(&fs, DeviceSet::Single("sdb".into()), KernelVersion::new(2, 4));
        let first = s.sample(now()).unwrap();
        fs.advance_typical_host(5);
        let second = s.sample(now()).unwrap();
        assert_ne!(first[0].fields, second[0].fields);
    }
}
