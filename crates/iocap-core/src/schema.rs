//! Classification of raw counter lines by field count.
//!
//! Each source/kernel combination produces a different number of fields per
//! captured record (two timestamp tokens plus the source tokens). The field
//! count selects a [`Layout`] which maps counter names to positions.
//! Combined-source listings carry major/minor/name columns that per-device
//! listings omit, which is why the same counter lives at different indices.

use crate::models::RawSample;

/// Known record layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVariant {
    /// 9 fields: 2.6 `/proc/diskstats` partition line (4 counters).
    PartitionLegacy,
    /// 15 fields: legacy whole-device line.
    DeviceLegacy,
    /// 14 or 17 fields: whole-device line.
    DeviceModern,
    /// 16, 20 or 22 fields: `/proc/diskstats` line.
    CombinedSource,
    /// 13 fields: `/sys/block/<dev>/stat` (11 counters).
    SysBlock,
    /// 7 fields: partition line with name and 4 counters.
    PartitionModern,
    /// 6 fields: `/sys/class/block/<part>/stat` on kernels that expose only
    /// 4 partition counters.
    SysBlockPartition,
}

impl SchemaVariant {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaVariant::PartitionLegacy => "partition-legacy",
            SchemaVariant::DeviceLegacy => "device-legacy",
            SchemaVariant::DeviceModern => "device-modern",
            SchemaVariant::CombinedSource => "combined-source",
            SchemaVariant::SysBlock => "sys-block",
            SchemaVariant::PartitionModern => "partition-modern",
            SchemaVariant::SysBlockPartition => "sys-block-partition",
        }
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Field positions of every counter for one layout.
///
/// The four counters used for deltas are always present; the rest are `None`
/// when the layout does not expose them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub variant: SchemaVariant,
    pub field_count: usize,
    pub reads: usize,
    pub reads_merged: Option<usize>,
    pub sectors_read: usize,
    pub read_time_ms: Option<usize>,
    pub writes: usize,
    pub writes_merged: Option<usize>,
    pub sectors_written: usize,
    pub write_time_ms: Option<usize>,
    pub io_in_progress: Option<usize>,
    pub io_time_ms: Option<usize>,
    pub weighted_io_time_ms: Option<usize>,
}

const fn partition(variant: SchemaVariant, field_count: usize, first: usize) -> Layout {
    Layout {
        variant,
        field_count,
        reads: first,
        reads_merged: None,
        sectors_read: first + 1,
        read_time_ms: None,
        writes: first + 2,
        writes_merged: None,
        sectors_written: first + 3,
        write_time_ms: None,
        io_in_progress: None,
        io_time_ms: None,
        weighted_io_time_ms: None,
    }
}

/// Full eleven-counter layout starting at `first`, truncated to `field_count`.
const fn full(variant: SchemaVariant, field_count: usize, first: usize) -> Layout {
    const fn within(idx: usize, field_count: usize) -> Option<usize> {
        if idx < field_count { Some(idx) } else { None }
    }

    Layout {
        variant,
        field_count,
        reads: first,
        reads_merged: within(first + 1, field_count),
        sectors_read: first + 2,
        read_time_ms: within(first + 3, field_count),
        writes: first + 4,
        writes_merged: within(first + 5, field_count),
        sectors_written: first + 6,
        write_time_ms: within(first + 7, field_count),
        io_in_progress: within(first + 8, field_count),
        io_time_ms: within(first + 9, field_count),
        weighted_io_time_ms: within(first + 10, field_count),
    }
}

/// Layout table keyed by field count.
///
/// Index 0/1 are the capture date/time. Per-device stat records start their
/// counters at 2; records with major/minor/name columns start at 5.
pub const LAYOUTS: &[Layout] = &[
    partition(SchemaVariant::SysBlockPartition, 6, 2),
    partition(SchemaVariant::PartitionModern, 7, 3),
    partition(SchemaVariant::PartitionLegacy, 9, 5),
    full(SchemaVariant::SysBlock, 13, 2),
    full(SchemaVariant::DeviceModern, 14, 5),
    full(SchemaVariant::DeviceLegacy, 15, 5),
    full(SchemaVariant::CombinedSource, 16, 5),
    full(SchemaVariant::DeviceModern, 17, 5),
    full(SchemaVariant::CombinedSource, 20, 5),
    full(SchemaVariant::CombinedSource, 22, 5),
];

/// Looks up the layout for a record with `field_count` fields.
pub fn layout_for(field_count: usize) -> Option<&'static Layout> {
    LAYOUTS.iter().find(|l| l.field_count == field_count)
}

/// Counters extracted from one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub reads: u64,
    pub reads_merged: Option<u64>,
    pub sectors_read: u64,
    pub read_time_ms: Option<u64>,
    pub writes: u64,
    pub writes_merged: Option<u64>,
    pub sectors_written: u64,
    pub write_time_ms: Option<u64>,
    pub io_in_progress: Option<u64>,
    pub io_time_ms: Option<u64>,
    pub weighted_io_time_ms: Option<u64>,
}

/// A raw sample tagged with its layout and decoded counters.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedSample<'a> {
    pub sample: &'a RawSample,
    pub variant: SchemaVariant,
    pub counters: Counters,
}

/// Classification failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No layout is known for this field count.
    UnknownLayout { device: String, field_count: usize },
    /// A counter token is not an unsigned integer.
    InvalidCounter {
        device: String,
        index: usize,
        value: String,
    },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::UnknownLayout {
                device,
                field_count,
            } => write!(
                f,
                "unrecognized counter layout for {}: {} fields",
                device, field_count
            ),
            SchemaError::InvalidCounter {
                device,
                index,
                value,
            } => write!(
                f,
                "invalid counter for {} at field {}: '{}'",
                device, index, value
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Classifies a sample and decodes its counters.
pub fn classify(sample: &RawSample) -> Result<ClassifiedSample<'_>, SchemaError> {
    let layout = layout_for(sample.field_count()).ok_or_else(|| SchemaError::UnknownLayout {
        device: sample.device.clone(),
        field_count: sample.field_count(),
    })?;

    let get = |idx: usize| -> Result<u64, SchemaError> {
        let value = &sample.fields[idx];
        value.parse().map_err(|_| SchemaError::InvalidCounter {
            device: sample.device.clone(),
            index: idx,
            value: value.clone(),
        })
    };
    let opt =
        |idx: Option<usize>| -> Result<Option<u64>, SchemaError> { idx.map(&get).transpose() };

    let counters = Counters {
        reads: get(layout.reads)?,
        reads_merged: opt(layout.reads_merged)?,
        sectors_read: get(layout.sectors_read)?,
        read_time_ms: opt(layout.read_time_ms)?,
        writes: get(layout.writes)?,
        writes_merged: opt(layout.writes_merged)?,
        sectors_written: get(layout.sectors_written)?,
        write_time_ms: opt(layout.write_time_ms)?,
        io_in_progress: opt(layout.io_in_progress)?,
        io_time_ms: opt(layout.io_time_ms)?,
        weighted_io_time_ms: opt(layout.weighted_io_time_ms)?,
    };

    Ok(ClassifiedSample {
        sample,
        variant: layout.variant,
        counters,
    })
}
