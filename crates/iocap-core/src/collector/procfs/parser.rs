//! Parsers for `/proc` and `/sys` block device files.
//!
//! These are pure functions that parse the content of counter and attribute
//! files. They are designed to be easily testable with string inputs.

use crate::util::KernelVersion;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

// ============ Disk Stats Parser ============

/// Number of classic counters in a per-device stat file.
///
/// Kernels 4.18+ append four discard columns and 5.5+ two flush columns.
pub const SYS_BLOCK_CLASSIC_FIELDS: usize = 11;

/// One tokenized line of `/proc/diskstats`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskstatsLine {
    /// Device name (third column).
    pub device: String,
    /// All whitespace-separated tokens, including major/minor and name.
    pub tokens: Vec<String>,
}

/// Tokenizes `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged w_sectors w_time io_pending io_time w_io_time [discards ...] [flushes ...]
///
/// Counter columns are not interpreted here; the token count decides the
/// layout later. Lines with fewer than three tokens carry no device name and
/// are skipped.
pub fn parse_diskstats(content: &str) -> Vec<DiskstatsLine> {
    content
        .lines()
        .filter_map(|line| {
            let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            let device = tokens.get(2)?.clone();
            Some(DiskstatsLine { device, tokens })
        })
        .collect()
}

/// Tokenizes a `/sys/block/<dev>/stat` file, keeping the eleven classic counters.
///
/// Older partition stat files expose only four counters (reads, read sectors,
/// writes, write sectors); they are returned as-is.
pub fn parse_sys_block_stat(content: &str) -> Result<Vec<String>, ParseError> {
    let line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ParseError::new("empty stat file"))?;

    Ok(line
        .split_whitespace()
        .take(SYS_BLOCK_CLASSIC_FIELDS)
        .map(str::to_string)
        .collect())
}

// ============ Block Device Attributes ============

/// Parses `/sys/block/<dev>/queue/hw_sector_size`.
pub fn parse_sector_size(content: &str) -> Result<u32, ParseError> {
    let value: u32 = content
        .trim()
        .parse()
        .map_err(|_| ParseError::new(format!("invalid sector size '{}'", content.trim())))?;
    if value == 0 {
        return Err(ParseError::new("sector size is zero"));
    }
    Ok(value)
}

// ============ Kernel Attributes ============

/// Parses `/proc/sys/kernel/osrelease` (e.g. `5.15.0-91-generic`).
///
/// Only the major and minor components matter.
pub fn parse_kernel_release(content: &str) -> Result<KernelVersion, ParseError> {
    let release = content.trim().replace('"', "");
    let mut parts = release.split('.');

    let major = parts
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| ParseError::new(format!("invalid kernel release '{}'", release)))?;
    let minor = parts
        .next()
        .map(|s| s.chars().take_while(|c| c.is_ascii_digit()).collect::<String>())
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| ParseError::new(format!("invalid kernel release '{}'", release)))?;

    Ok(KernelVersion::new(major, minor))
}

/// Parses `/proc/sys/kernel/hostname`. Returns `None` for an empty file.
pub fn parse_hostname(content: &str) -> Option<String> {
    let name = content.trim();
    (!name.is_empty()).then(|| name.to_string())
}
