//! In-memory mock filesystem for testing collectors without real `/proc` and `/sys`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.
//! Counter files can be replaced between reads to simulate advancing counters.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// In-memory filesystem for testing.
///
/// Files live behind a lock so a test can rewrite `/proc/diskstats` while a
/// sampler holds a shared reference.
#[derive(Debug, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: RwLock<HashMap<PathBuf, String>>,
    /// Set of directories.
    directories: RwLock<HashSet<PathBuf>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();

        let mut directories = self.directories.write().unwrap_or_else(|e| e.into_inner());
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
        drop(directories);

        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path, content.into());
    }

    /// Removes a file, simulating a device that disappeared.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path.as_ref());
    }

    /// Adds a block device under `/sys/block/<name>`.
    ///
    /// # Arguments
    /// * `name` - Device name (sda, nvme0n1, ...)
    /// * `stat` - Content of `/sys/block/<name>/stat`
    /// * `sector_size` - Content of `queue/hw_sector_size`, `None` to omit the file
    pub fn add_block_device(&self, name: &str, stat: &str, sector_size: Option<u32>) {
        let base = PathBuf::from(format!("/sys/block/{}", name));
        self.add_file(base.join("stat"), stat);
        if let Some(size) = sector_size {
            self.add_file(base.join("queue/hw_sector_size"), format!("{}\n", size));
        }
    }

    /// Replaces `/proc/diskstats`.
    pub fn set_diskstats(&self, content: impl Into<String>) {
        self.add_file("/proc/diskstats", content);
    }

    /// Sets the kernel release reported by `/proc/sys/kernel/osrelease`.
    pub fn set_kernel_release(&self, release: &str) {
        self.add_file("/proc/sys/kernel/osrelease", format!("{}\n", release));
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file not found: {:?}", path),
                )
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
            || self
                .directories
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .contains(path)
    }
}
