//! Sector, byte and megabyte conversion plus small formatting helpers.

/// Default logical sector size when the device attribute is unavailable.
pub const DEFAULT_SECTOR_SIZE: u32 = 512;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Rounds to two decimal places, ties to even. Never returns negative zero.
///
/// Byte counts divided by 2^20 are exact binary fractions, so a 128 KiB
/// multiple lands exactly on a half hundredth.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0 + 0.0
}

/// Converts a sector count (or delta) into bytes.
pub fn sectors_to_bytes(sectors: i64, sector_size: u32) -> i64 {
    sectors.saturating_mul(sector_size as i64)
}

/// Converts bytes into megabytes (2^20), rounded to two decimals.
pub fn bytes_to_mb(bytes: i64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MB)
}

/// Byte and megabyte fields derived from one interval's sector deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ByteDeltas {
    pub read_bytes: i64,
    pub write_bytes: i64,
    pub total_bytes: i64,
    pub read_mb: f64,
    pub write_mb: f64,
    pub total_mb: f64,
}

impl ByteDeltas {
    pub fn from_sectors(read_sectors: i64, write_sectors: i64, sector_size: u32) -> Self {
        let read_bytes = sectors_to_bytes(read_sectors, sector_size);
        let write_bytes = sectors_to_bytes(write_sectors, sector_size);
        let read_mb = bytes_to_mb(read_bytes);
        let write_mb = bytes_to_mb(write_bytes);

        Self {
            read_bytes,
            write_bytes,
            total_bytes: read_bytes.saturating_add(write_bytes),
            read_mb,
            write_mb,
            total_mb: round2(read_mb + write_mb),
        }
    }
}

/// Formats a megabyte value with two decimals (`0.20`).
pub fn format_mb(value: f64) -> String {
    format!("{:.2}", value)
}

/// Formats an optional counter; unavailable counters render as an empty cell.
pub fn format_opt(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Format byte count as human-readable size (`"1.5G"`, `"100.3M"`, `"512B"`).
pub fn format_bytes(bytes: u64) -> String {
    let f = bytes as f64;
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}G", f / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}M", f / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}K", f / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.390625), 0.39);
        assert_eq!(round2(0.1953125), 0.2);
        assert_eq!(round2(1.005), 1.0); // binary representation of 1.005 is below 1.005
        assert_eq!(round2(-0.001).to_string(), "0");
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.875), 0.88);
    }

    #[test]
    fn test_byte_deltas_half_megabyte_hundredths_round_to_even() {
        // 128 KiB and 640 KiB
        let d = ByteDeltas::from_sectors(256, 1280, 512);
        assert_eq!(d.read_bytes, 131_072);
        assert_eq!(d.write_bytes, 655_360);
        assert_eq!(d.read_mb, 0.12);
        assert_eq!(d.write_mb, 0.62);
        assert_eq!(d.total_mb, 0.74);
        assert_eq!(format_mb(d.read_mb), "0.12");
    }

    #[test]
    fn test_byte_deltas_from_sectors() {
        let d = ByteDeltas::from_sectors(800, 400, 512);
        assert_eq!(d.read_bytes, 409_600);
        assert_eq!(d.write_bytes, 204_800);
        assert_eq!(d.total_bytes, 614_400);
        assert_eq!(d.read_mb, 0.39);
        assert_eq!(d.write_mb, 0.2);
        assert_eq!(d.total_mb, 0.59);
    }

    #[test]
    fn test_byte_deltas_large_sectors() {
        let d = ByteDeltas::from_sectors(256, 0, 4096);
        assert_eq!(d.read_bytes, 1_048_576);
        assert_eq!(d.read_mb, 1.0);
        assert_eq!(d.write_mb, 0.0);
        assert_eq!(d.total_mb, 1.0);
    }

    #[test]
    fn test_byte_deltas_zero() {
        assert_eq!(ByteDeltas::from_sectors(0, 0, 512), ByteDeltas::default());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_mb(0.2), "0.20");
        assert_eq!(format_mb(12.0), "12.00");
        assert_eq!(format_opt(Some(7)), "7");
        assert_eq!(format_opt(None), "");
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(1536), "1.5K");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0M");
    }
}
