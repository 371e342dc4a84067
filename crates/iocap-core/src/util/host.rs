//! Host identity: kernel version and hostname.
//!
//! Both are read through the [`FileSystem`] abstraction from
//! `<proc>/sys/kernel/*` so they can be mocked.

use std::path::Path;

use tracing::debug;

use crate::collector::CollectError;
use crate::collector::FileSystem;
use crate::collector::procfs::parser::{parse_hostname, parse_kernel_release};

/// Kernel `major.minor` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
}

impl KernelVersion {
    /// Oldest kernel with `/proc/diskstats` and `/sys/block/<dev>/stat`.
    pub const MIN_SUPPORTED: KernelVersion = KernelVersion::new(2, 6);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns true if the kernel exposes per-device stat files.
    pub fn has_sys_block_stat(&self) -> bool {
        *self >= Self::MIN_SUPPORTED
    }
}

impl std::fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Reads the running kernel version from `<proc>/sys/kernel/osrelease`.
pub fn read_kernel_version<F: FileSystem>(
    fs: &F,
    proc_path: &Path,
) -> Result<KernelVersion, CollectError> {
    let content = fs.read_to_string(&proc_path.join("sys/kernel/osrelease"))?;
    parse_kernel_release(&content).map_err(|e| CollectError::Parse(e.message))
}

/// Reads the hostname from `<proc>/sys/kernel/hostname`, falling back to `localhost`.
pub fn read_hostname<F: FileSystem>(fs: &F, proc_path: &Path) -> String {
    let path = proc_path.join("sys/kernel/hostname");
    match fs.read_to_string(&path) {
        Ok(content) => parse_hostname(&content).unwrap_or_else(|| "localhost".to_string()),
        Err(e) => {
            debug!("hostname unavailable ({}): {}", path.display(), e);
            "localhost".to_string()
        }
    }
}
