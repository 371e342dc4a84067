//! Classification → delta → output wiring.
//!
//! [`Processor`] owns the delta state, the per-device sector size cache and
//! the log writer. Samples are fed in capture order, either one tick at a
//! time (streaming) or from a buffer after the capture window.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::collector::{CollectError, FileSystem};
use crate::collector::procfs::parse_sector_size;
use crate::fmt::DEFAULT_SECTOR_SIZE;
use crate::models::RawSample;
use crate::rates::{DeltaState, update_interval};
use crate::schema::{SchemaError, classify};
use crate::storage::LogWriter;

/// Reads `queue/hw_sector_size` for a device.
///
/// Tries `<sys>/block/<dev>` first, then `<sys>/class/block/<dev>`.
pub fn read_sector_size<F: FileSystem>(
    fs: &F,
    sys_path: &Path,
    device: &str,
) -> Result<u32, CollectError> {
    let candidates = [
        sys_path.join("block").join(device).join("queue/hw_sector_size"),
        sys_path.join("class/block").join(device).join("queue/hw_sector_size"),
    ];

    let mut last_err = None;
    for path in &candidates {
        match fs.read_to_string(path) {
            Ok(content) => {
                return parse_sector_size(&content).map_err(|e| CollectError::Parse(e.message));
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(CollectError::Io(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "no sector size attribute")
    })))
}

/// Per-device sector sizes, resolved once per run.
pub struct SectorSizes<F: FileSystem> {
    fs: F,
    sys_path: PathBuf,
    cache: HashMap<String, u32>,
}

impl<F: FileSystem> SectorSizes<F> {
    pub fn new(fs: F, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            sys_path: sys_path.into(),
            cache: HashMap::new(),
        }
    }

    /// Returns the device's sector size, reading it on first use.
    ///
    /// Falls back to 512 bytes when the attribute is missing or invalid.
    pub fn resolve(&mut self, device: &str) -> u32 {
        if let Some(&size) = self.cache.get(device) {
            return size;
        }
        let size = match read_sector_size(&self.fs, &self.sys_path, device) {
            Ok(size) => size,
            Err(e) => {
                debug!(
                    "sector size for {} unavailable ({}), using {}",
                    device, e, DEFAULT_SECTOR_SIZE
                );
                DEFAULT_SECTOR_SIZE
            }
        };
        self.cache.insert(device.to_string(), size);
        size
    }
}

/// Counters describing what happened to the processed samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessStats {
    /// Samples fed in.
    pub samples: u64,
    /// Records written.
    pub records: u64,
    /// Samples skipped because their layout was not recognized.
    pub unclassified: u64,
    /// Intervals dropped by the validity gate.
    pub rejected: u64,
    /// Records lost to output errors.
    pub write_errors: u64,
}

/// Turns raw samples into written interval records.
pub struct Processor<F: FileSystem> {
    state: DeltaState,
    sectors: SectorSizes<F>,
    writer: LogWriter,
    stats: ProcessStats,
    /// (device, field count) pairs already reported as unclassifiable.
    reported: HashSet<(String, usize)>,
}

impl<F: FileSystem> Processor<F> {
    pub fn new(writer: LogWriter, sectors: SectorSizes<F>) -> Self {
        Self {
            state: DeltaState::default(),
            sectors,
            writer,
            stats: ProcessStats::default(),
            reported: HashSet::new(),
        }
    }

    /// Processes one sample.
    pub fn process(&mut self, sample: &RawSample) {
        self.stats.samples += 1;

        let classified = match classify(sample) {
            Ok(c) => c,
            Err(e) => {
                self.stats.unclassified += 1;
                self.report_schema_error(&e);
                return;
            }
        };

        let sector_size = self.sectors.resolve(&sample.device);
        let Some(record) = update_interval(&mut self.state, &classified, sector_size) else {
            self.stats.rejected = self.state.rejected;
            return;
        };

        match self.writer.write(&record) {
            Ok(()) => self.stats.records = self.writer.rows_written(),
            Err(e) => {
                self.stats.write_errors += 1;
                error!("failed to write record for {}: {}", record.device, e);
            }
        }
    }

    /// Processes one tick's batch and flushes the output files.
    pub fn process_batch(&mut self, batch: &[RawSample]) {
        for sample in batch {
            self.process(sample);
        }
        if let Err(e) = self.writer.flush() {
            error!("failed to flush output files: {}", e);
        }
    }

    pub fn stats(&self) -> ProcessStats {
        self.stats
    }

    /// Flushes and closes the output, returning final stats and files written.
    pub fn finish(self) -> io::Result<(ProcessStats, Vec<PathBuf>)> {
        debug!("{} device(s) tracked", self.state.device_count());
        let stats = self.stats;
        let files = self.writer.finish()?;
        Ok((stats, files))
    }

    fn report_schema_error(&mut self, e: &SchemaError) {
        let key = match e {
            SchemaError::UnknownLayout {
                device,
                field_count,
            } => (device.clone(), *field_count),
            SchemaError::InvalidCounter { device, .. } => (device.clone(), 0),
        };
        if self.reported.insert(key) {
            warn!("skipping sample: {}", e);
        } else {
            debug!("skipping sample: {}", e);
        }
    }
}
