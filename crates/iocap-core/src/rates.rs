//! Per-device delta computation over cumulative disk counters.
//!
//! Each device moves from "unseen" to "baseline established" on its first
//! classified sample, which yields a record with every delta forced to zero.
//! Later samples are subtracted from the retained baseline; the baseline is
//! then replaced unconditionally, even when the interval is rejected, so a
//! single bad interval never poisons the next one.
//!
//! Counter wraparound is not corrected. A wrapped sector counter shows up as
//! a negative delta and the interval is dropped by the validity gate.
//!
//! Interval time is the capture time of day in UTC, so it restarts at
//! midnight. The first interval after midnight is negative and dropped; the
//! next accepted record then carries a `total_time_ms` smaller than the last
//! one before midnight. Records are non-decreasing in time only within a UTC
//! day.

use std::collections::HashMap;

use tracing::trace;

use crate::fmt::ByteDeltas;
use crate::models::IntervalRecord;
use crate::schema::{ClassifiedSample, Counters};

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Signed difference of two cumulative counters.
///
/// A counter that went backwards (device reset) yields a negative value.
pub fn delta(curr: u64, prev: u64) -> i64 {
    curr.wrapping_sub(prev) as i64
}

/// Validity gate for a computed interval.
pub fn is_valid_interval(
    delta_time_ms: i64,
    delta_read_sectors: i64,
    delta_write_sectors: i64,
) -> bool {
    delta_time_ms >= 0 && delta_read_sectors.saturating_add(delta_write_sectors) >= 0
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Last observed absolute counters of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceBaseline {
    pub previous_total_time_ms: i64,
    pub previous_reads: u64,
    pub previous_writes: u64,
    pub previous_read_sectors: u64,
    pub previous_write_sectors: u64,
}

impl DeviceBaseline {
    fn from_counters(total_time_ms: i64, c: &Counters) -> Self {
        Self {
            previous_total_time_ms: total_time_ms,
            previous_reads: c.reads,
            previous_writes: c.writes,
            previous_read_sectors: c.sectors_read,
            previous_write_sectors: c.sectors_written,
        }
    }
}

/// Baselines for every device seen in this run.
#[derive(Debug, Default)]
pub struct DeltaState {
    pub baselines: HashMap<String, DeviceBaseline>,
    /// Intervals dropped by the validity gate.
    pub rejected: u64,
}

impl DeltaState {
    pub fn device_count(&self) -> usize {
        self.baselines.len()
    }

    pub fn baseline(&self, device: &str) -> Option<&DeviceBaseline> {
        self.baselines.get(device)
    }
}

// ---------------------------------------------------------------------------
// Interval computation
// ---------------------------------------------------------------------------

/// Feeds one classified sample into the state.
///
/// Returns the interval record to emit, or `None` when the interval fails the
/// validity gate. The first sample of a device always returns a zero-delta
/// record.
pub fn update_interval(
    state: &mut DeltaState,
    classified: &ClassifiedSample<'_>,
    sector_size: u32,
) -> Option<IntervalRecord> {
    let sample = classified.sample;
    let counters = &classified.counters;
    let total_time_ms = sample.time_of_day_ms();
    let current = DeviceBaseline::from_counters(total_time_ms, counters);

    let Some(prev) = state.baselines.insert(sample.device.clone(), current) else {
        return Some(build_record(
            classified,
            total_time_ms,
            Deltas::default(),
            sector_size,
        ));
    };

    let deltas = Deltas {
        time_ms: total_time_ms - prev.previous_total_time_ms,
        reads: delta(counters.reads, prev.previous_reads),
        writes: delta(counters.writes, prev.previous_writes),
        read_sectors: delta(counters.sectors_read, prev.previous_read_sectors),
        write_sectors: delta(counters.sectors_written, prev.previous_write_sectors),
    };

    if !is_valid_interval(deltas.time_ms, deltas.read_sectors, deltas.write_sectors) {
        state.rejected += 1;
        trace!(
            device = %sample.device,
            layout = %classified.variant,
            delta_time_ms = deltas.time_ms,
            delta_sectors = deltas.read_sectors.saturating_add(deltas.write_sectors),
            "interval dropped"
        );
        return None;
    }

    Some(build_record(classified, total_time_ms, deltas, sector_size))
}

#[derive(Debug, Clone, Copy, Default)]
struct Deltas {
    time_ms: i64,
    reads: i64,
    writes: i64,
    read_sectors: i64,
    write_sectors: i64,
}

fn build_record(
    classified: &ClassifiedSample<'_>,
    total_time_ms: i64,
    d: Deltas,
    sector_size: u32,
) -> IntervalRecord {
    let sample = classified.sample;
    let c = &classified.counters;
    let bytes = ByteDeltas::from_sectors(d.read_sectors, d.write_sectors, sector_size);

    IntervalRecord {
        date: sample.date().to_string(),
        time: sample.time().to_string(),
        device: sample.device.clone(),
        total_time_ms,
        delta_time_ms: d.time_ms,
        delta_reads: d.reads,
        delta_writes: d.writes,
        delta_iops: d.reads.saturating_add(d.writes),
        read_bytes: bytes.read_bytes,
        write_bytes: bytes.write_bytes,
        total_bytes: bytes.total_bytes,
        read_mb: bytes.read_mb,
        write_mb: bytes.write_mb,
        total_mb: bytes.total_mb,
        reads: c.reads,
        writes: c.writes,
        reads_merged: c.reads_merged,
        writes_merged: c.writes_merged,
        sectors_read: c.sectors_read,
        sectors_written: c.sectors_written,
        read_time_ms: c.read_time_ms,
        write_time_ms: c.write_time_ms,
        io_in_progress: c.io_in_progress,
        io_time_ms: c.io_time_ms,
        weighted_io_time_ms: c.weighted_io_time_ms,
        sector_size,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
