//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states for a small
//! host with a couple of disks, a partition and the usual noise devices.

use super::filesystem::MockFs;

/// Builds a `/proc/diskstats` line in the 14-token layout of 2.6–4.17 kernels.
///
/// Merge and timing columns get fixed small values so tests can check that
/// they are carried through untouched.
pub fn diskstats_line(
    major: u32,
    minor: u32,
    name: &str,
    reads: u64,
    read_sectors: u64,
    writes: u64,
    write_sectors: u64,
) -> String {
    format!(
        "{:4} {:7} {} {} 3 {} 11 {} 4 {} 22 0 33 44\n",
        major, minor, name, reads, read_sectors, writes, write_sectors
    )
}

/// Builds a `/sys/block/<dev>/stat` line with the discard and flush columns
/// of 5.5+ kernels (17 counters).
pub fn sys_block_stat(reads: u64, read_sectors: u64, writes: u64, write_sectors: u64) -> String {
    format!(
        "{:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8} {:8}\n",
        reads, 3, read_sectors, 11, writes, 4, write_sectors, 22, 0, 33, 44, 0, 0, 0, 0, 7, 8
    )
}

impl MockFs {
    /// Creates a typical host: kernel 5.15, two SCSI disks (one 4K-sector),
    /// a partition, an NVMe namespace, plus loop and optical devices.
    pub fn typical_host() -> Self {
        let fs = Self::new();

        fs.set_kernel_release("5.15.0-91-generic");
        fs.add_file("/proc/sys/kernel/hostname", "db01\n");

        fs.set_diskstats(typical_diskstats(0));

        fs.add_block_device("sda", &sys_block_stat(1000, 8000, 500, 4000), Some(512));
        fs.add_block_device("sdb", &sys_block_stat(200, 1600, 100, 800), Some(4096));
        fs.add_block_device("nvme0n1", &sys_block_stat(9999, 123456, 8888, 654321), None);
        fs.add_file(
            "/sys/class/block/sda1/stat",
            sys_block_stat(900, 7200, 450, 3600),
        );

        fs
    }

    /// Advances every counter of [`MockFs::typical_host`] by `step` units.
    pub fn advance_typical_host(&self, step: u64) {
        self.set_diskstats(typical_diskstats(step));
        self.add_block_device(
            "sda",
            &sys_block_stat(1000 + step, 8000 + 8 * step, 500 + step, 4000 + 8 * step),
            Some(512),
        );
    }
}

fn typical_diskstats(step: u64) -> String {
    let mut content = String::new();
    content.push_str(&diskstats_line(7, 0, "loop0", 50, 400, 0, 0));
    content.push_str(&diskstats_line(11, 0, "sr0", 5, 40, 0, 0));
    content.push_str(&diskstats_line(
        8,
        0,
        "sda",
        1000 + step,
        8000 + 8 * step,
        500 + step,
        4000 + 8 * step,
    ));
    content.push_str(&diskstats_line(
        8,
        1,
        "sda1",
        900 + step,
        7200 + 8 * step,
        450 + step,
        3600 + 8 * step,
    ));
    content.push_str(&diskstats_line(
        8,
        16,
        "sdb",
        200 + 2 * step,
        1600 + 16 * step,
        100 + 2 * step,
        800 + 16 * step,
    ));
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn test_diskstats_line_token_count() {
        let line = diskstats_line(8, 0, "sda", 1, 2, 3, 4);
        assert_eq!(line.split_whitespace().count(), 14);
    }

    #[test]
    fn test_sys_block_stat_token_count() {
        let line = sys_block_stat(1, 2, 3, 4);
        assert_eq!(line.split_whitespace().count(), 17);
    }

    #[test]
    fn test_typical_host_advances() {
        let fs = MockFs::typical_host();
        let before = fs.read_to_string(Path::new("/proc/diskstats")).unwrap();
        fs.advance_typical_host(10);
        let after = fs.read_to_string(Path::new("/proc/diskstats")).unwrap();
        assert_ne!(before, after);
        assert!(after.contains(" sda 1010 "));
    }
}
