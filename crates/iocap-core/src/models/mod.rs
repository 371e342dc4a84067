//! Data models shared between the sampler, delta engine and emitter.

use chrono::{DateTime, Timelike, Utc};

/// Date format of the leading capture token.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time-of-day format of the second capture token (millisecond precision).
pub const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// One raw counter line captured at a point in time.
///
/// `fields` holds the whole captured record: the capture date and time tokens
/// followed by the source line's tokens. Layout field counts always include
/// the two leading tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Capture time, truncated to milliseconds.
    pub captured_at: DateTime<Utc>,
    /// Device the line belongs to.
    pub device: String,
    /// `[date, time, source tokens...]`
    pub fields: Vec<String>,
}

impl RawSample {
    /// Stamps source tokens with the capture time.
    pub fn new(captured_at: DateTime<Utc>, device: impl Into<String>, tokens: Vec<String>) -> Self {
        let captured_at = truncate_to_millis(captured_at);
        let mut fields = Vec::with_capacity(tokens.len() + 2);
        fields.push(captured_at.format(DATE_FORMAT).to_string());
        fields.push(captured_at.format(TIME_FORMAT).to_string());
        fields.extend(tokens);

        Self {
            captured_at,
            device: device.into(),
            fields,
        }
    }

    /// Number of fields, including the date and time tokens.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Capture date token (`YYYY-MM-DD`).
    pub fn date(&self) -> &str {
        &self.fields[0]
    }

    /// Capture time token (`HH:MM:SS.mmm`).
    pub fn time(&self) -> &str {
        &self.fields[1]
    }

    /// Milliseconds since midnight (UTC) of the capture time.
    ///
    /// Wraps back to zero at midnight.
    pub fn time_of_day_ms(&self) -> i64 {
        let t = self.captured_at.time();
        t.hour() as i64 * 3_600_000
            + t.minute() as i64 * 60_000
            + t.second() as i64 * 1_000
            + (t.nanosecond() / 1_000_000) as i64
    }
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = ts.nanosecond();
    ts.with_nanosecond(nanos - nanos % 1_000_000).unwrap_or(ts)
}

/// Per-interval metrics for one device, emitted as one output row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntervalRecord {
    pub date: String,
    pub time: String,
    pub device: String,
    /// Capture time of day in milliseconds.
    pub total_time_ms: i64,
    pub delta_time_ms: i64,
    pub delta_reads: i64,
    pub delta_writes: i64,
    /// `delta_reads + delta_writes`
    pub delta_iops: i64,
    pub read_bytes: i64,
    pub write_bytes: i64,
    pub total_bytes: i64,
    pub read_mb: f64,
    pub write_mb: f64,
    pub total_mb: f64,
    /// Absolute counters as read from the source.
    pub reads: u64,
    pub writes: u64,
    pub reads_merged: Option<u64>,
    pub writes_merged: Option<u64>,
    pub sectors_read: u64,
    pub sectors_written: u64,
    pub read_time_ms: Option<u64>,
    pub write_time_ms: Option<u64>,
    pub io_in_progress: Option<u64>,
    pub io_time_ms: Option<u64>,
    pub weighted_io_time_ms: Option<u64>,
    pub sector_size: u32,
}
