//! Semicolon-delimited log files: one per device, plus an aggregate file
//! with a trailing sector size column in multi-device mode.

use crate::fmt::{format_mb, format_opt};
use crate::models::IntervalRecord;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Header of per-device files. Downstream consumers depend on it verbatim.
pub const DEVICE_HEADER: &str = "date;time UTC;device;time (ms);delta time (ms);delta reads;delta writes;delta IOPS;delta Bytes read;delta Bytes written;delta Bytes;delta MBytes read;delta MBytes written;total MBytes;reads;writes;reads merged;writes merged;sector read;sector written;read time (ms);write time (ms);i/o in progress;time spent doing i/o (ms);weighted time spent doing i/o (ms)";

/// Header of the aggregate file: device columns plus sector size.
pub const AGGREGATE_HEADER: &str = "date;time UTC;device;time (ms);delta time (ms);delta reads;delta writes;delta IOPS;delta Bytes read;delta Bytes written;delta Bytes;delta MBytes read;delta MBytes written;total MBytes;reads;writes;reads merged;writes merged;sector read;sector written;read time (ms);write time (ms);i/o in progress;time spent doing i/o (ms);weighted time spent doing i/o (ms);sector size";

/// Run timestamp used in file names (`2026-10-19_08-15-00`).
pub fn run_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Formats one per-device row (no trailing newline).
///
/// The time cell is prefixed with `'` so spreadsheets keep the milliseconds.
pub fn format_row(r: &IntervalRecord) -> String {
    let cells = [
        r.date.clone(),
        format!("'{}", r.time),
        r.device.clone(),
        r.total_time_ms.to_string(),
        r.delta_time_ms.to_string(),
        r.delta_reads.to_string(),
        r.delta_writes.to_string(),
        r.delta_iops.to_string(),
        r.read_bytes.to_string(),
        r.write_bytes.to_string(),
        r.total_bytes.to_string(),
        format_mb(r.read_mb),
        format_mb(r.write_mb),
        format_mb(r.total_mb),
        r.reads.to_string(),
        r.writes.to_string(),
        format_opt(r.reads_merged),
        format_opt(r.writes_merged),
        r.sectors_read.to_string(),
        r.sectors_written.to_string(),
        format_opt(r.read_time_ms),
        format_opt(r.write_time_ms),
        format_opt(r.io_in_progress),
        format_opt(r.io_time_ms),
        format_opt(r.weighted_io_time_ms),
    ];
    cells.join(";")
}

/// Output directory, hostname and run stamp that make up file names.
#[derive(Debug, Clone)]
pub struct OutputNaming {
    pub dir: PathBuf,
    pub hostname: String,
    pub stamp: String,
}

impl OutputNaming {
    pub fn new(
        dir: impl Into<PathBuf>,
        hostname: impl Into<String>,
        stamp: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            hostname: hostname.into(),
            stamp: stamp.into(),
        }
    }

    /// `<host>_<device>_<stamp>_<sectorsize>.log`
    pub fn device_path(&self, device: &str, sector_size: u32) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}_{}.log",
            self.hostname,
            device.replace('/', "!"),
            self.stamp,
            sector_size
        ))
    }

    /// `<host>_all_<stamp>.log`
    pub fn aggregate_path(&self) -> PathBuf {
        self.dir.join(format!("{}_all_{}.log", self.hostname, self.stamp))
    }
}

/// Appends interval records to per-device files and, in multi-device mode,
/// to one aggregate file.
///
/// Device files are created on the first record for that device. All files
/// are buffered; call [`LogWriter::flush`] periodically and
/// [`LogWriter::finish`] at the end.
pub struct LogWriter {
    naming: OutputNaming,
    streams: HashMap<String, BufWriter<File>>,
    aggregate: Option<BufWriter<File>>,
    /// Devices whose file could not be created; their rows are discarded.
    failed: HashSet<String>,
    files: Vec<PathBuf>,
    rows_written: u64,
}

impl LogWriter {
    /// Creates the output directory and, when `multi_device`, the aggregate file.
    pub fn new(naming: OutputNaming, multi_device: bool) -> io::Result<Self> {
        std::fs::create_dir_all(&naming.dir)?;

        let mut files = Vec::new();
        let aggregate = if multi_device {
            let path = naming.aggregate_path();
            let stream = create_with_header(&path, AGGREGATE_HEADER)?;
            debug!("aggregate output: {}", path.display());
            files.push(path);
            Some(stream)
        } else {
            None
        };

        Ok(Self {
            naming,
            streams: HashMap::new(),
            aggregate,
            failed: HashSet::new(),
            files,
            rows_written: 0,
        })
    }

    /// Opens the device file if it is not open yet. Idempotent.
    pub fn open_device(&mut self, device: &str, sector_size: u32) -> io::Result<()> {
        if self.streams.contains_key(device) {
            return Ok(());
        }
        let path = self.naming.device_path(device, sector_size);
        match create_with_header(&path, DEVICE_HEADER) {
            Ok(stream) => {
                debug!("device output: {}", path.display());
                self.streams.insert(device.to_string(), stream);
                self.files.push(path);
                Ok(())
            }
            Err(e) => {
                self.failed.insert(device.to_string());
                Err(e)
            }
        }
    }

    /// Appends one record.
    ///
    /// A device whose file failed to open is reported once and then skipped.
    pub fn write(&mut self, record: &IntervalRecord) -> io::Result<()> {
        if self.failed.contains(&record.device) {
            return Ok(());
        }
        self.open_device(&record.device, record.sector_size)?;

        let row = format_row(record);
        if let Some(stream) = self.streams.get_mut(&record.device) {
            writeln!(stream, "{}", row)?;
        }
        if let Some(aggregate) = self.aggregate.as_mut() {
            writeln!(aggregate, "{};{}", row, record.sector_size)?;
        }
        self.rows_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for stream in self.streams.values_mut() {
            stream.flush()?;
        }
        if let Some(aggregate) = self.aggregate.as_mut() {
            aggregate.flush()?;
        }
        Ok(())
    }

    /// Flushes and closes every file, returning the paths written.
    pub fn finish(mut self) -> io::Result<Vec<PathBuf>> {
        if let Err(e) = self.flush() {
            error!("failed to flush output files: {}", e);
            return Err(e);
        }
        Ok(self.files)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

}

fn create_with_header(path: &Path, header: &str) -> io::Result<BufWriter<File>> {
    let mut stream = BufWriter::new(File::create(path)?);
    writeln!(stream, "{}", header)?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(device: &str, sector_size: u32) -> IntervalRecord {
        IntervalRecord {
            date: "2026-10-19".to_string(),
            time: "08:15:00.025".to_string(),
            device: device.to_string(),
            total_time_ms: 29_700_025,
            delta_time_ms: 25,
            delta_reads: 50,
            delta_writes: 30,
            delta_iops: 80,
            read_bytes: 409_600,
            write_bytes: 204_800,
            total_bytes: 614_400,
            read_mb: 0.39,
            write_mb: 0.2,
            total_mb: 0.59,
            reads: 150,
            writes: 80,
            reads_merged: Some(3),
            writes_merged: Some(4),
            sectors_read: 1600,
            sectors_written: 800,
            read_time_ms: Some(11),
            write_time_ms: Some(22),
            io_in_progress: Some(0),
            io_time_ms: Some(33),
            weighted_io_time_ms: Some(44),
            sector_size,
        }
    }

    fn naming(dir: &Path) -> OutputNaming {
        OutputNaming::new(dir, "db01", "2026-10-19_08-15-00")
    }

    #[test]
    fn test_header_column_counts() {
        assert_eq!(DEVICE_HEADER.split(';').count(), 25);
        assert_eq!(AGGREGATE_HEADER.split(';').count(), 26);
        assert!(AGGREGATE_HEADER.starts_with(DEVICE_HEADER));
    }

    #[test]
    fn test_run_stamp() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 0).unwrap();
        assert_eq!(run_stamp(now), "2026-10-19_08-15-00");
    }

    #[test]
    fn test_format_row() {
        let row = format_row(&record("sda", 512));
        assert_eq!(
            row,
            "2026-10-19;'08:15:00.025;sda;29700025;25;50;30;80;409600;204800;614400;0.39;0.20;0.59;150;80;3;4;1600;800;11;22;0;33;44"
        );
        assert_eq!(row.split(';').count(), 25);
    }

    #[test]
    fn test_format_row_unavailable_counters_are_empty() {
        let mut r = record("sda1", 512);
        r.reads_merged = None;
        r.writes_merged = None;
        r.read_time_ms = None;
        r.write_time_ms = None;
        r.io_in_progress = None;
        r.io_time_ms = None;
        r.weighted_io_time_ms = None;
        let row = format_row(&r);
        assert!(row.ends_with(";150;80;;;1600;800;;;;;"));
        assert_eq!(row.split(';').count(), 25);
    }

    #[test]
    fn test_output_naming() {
        let n = naming(Path::new("/tmp/out"));
        assert_eq!(
            n.device_path("sdb", 4096),
            PathBuf::from("/tmp/out/db01_sdb_2026-10-19_08-15-00_4096.log")
        );
        assert_eq!(
            n.device_path("cciss/c0d0", 512),
            PathBuf::from("/tmp/out/db01_cciss!c0d0_2026-10-19_08-15-00_512.log")
        );
        assert_eq!(
            n.aggregate_path(),
            PathBuf::from("/tmp/out/db01_all_2026-10-19_08-15-00.log")
        );
    }

    #[test]
    fn test_multi_device_writes_aggregate_and_device_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = LogWriter::new(naming(dir.path()), true).unwrap();
        assert!(naming(dir.path()).aggregate_path().exists());

        writer.write(&record("sda", 512)).unwrap();
        writer.write(&record("sdb", 4096)).unwrap();
        writer.write(&record("sda", 512)).unwrap();
        assert_eq!(writer.rows_written(), 3);

        let files = writer.finish().unwrap();
        assert_eq!(files.len(), 3);

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 3);

        let sda = std::fs::read_to_string(naming(dir.path()).device_path("sda", 512)).unwrap();
        let lines: Vec<&str> = sda.lines().collect();
        assert_eq!(lines[0], DEVICE_HEADER);
        assert_eq!(lines.len(), 3);

        let sdb = std::fs::read_to_string(naming(dir.path()).device_path("sdb", 4096)).unwrap();
        assert_eq!(sdb.lines().next(), Some(DEVICE_HEADER));
        assert_eq!(sdb.lines().count(), 2);

        let all = std::fs::read_to_string(naming(dir.path()).aggregate_path()).unwrap();
        let lines: Vec<&str> = all.lines().collect();
        assert_eq!(lines[0], AGGREGATE_HEADER);
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains(";sdb;"));
        assert!(lines[2].ends_with(";44;4096"));
    }

    #[test]
    fn test_single_device_has_no_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = LogWriter::new(naming(dir.path()), false).unwrap();
        writer.write(&record("sda", 512)).unwrap();
        let files = writer.finish().unwrap();

        assert_eq!(files.len(), 1);
        assert!(!naming(dir.path()).aggregate_path().exists());
    }

    #[test]
    fn test_open_device_failure_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut n = naming(dir.path());
        let mut writer = LogWriter::new(n.clone(), false).unwrap();
        // Point later device files at a directory that does not exist.
        n.dir = dir.path().join("missing");
        writer.naming = n;

        assert!(writer.write(&record("sda", 512)).is_err());
        assert!(writer.write(&record("sda", 512)).is_ok());
        assert_eq!(writer.rows_written(), 0);
    }
}
