//! Run configuration and validation.

use std::path::PathBuf;
use std::time::Duration;

use crate::collector::DeviceSet;

/// Capture window when none is given, in minutes.
pub const DEFAULT_TIME_TO_RUN_MIN: u64 = 2;
/// Longest accepted capture window, in minutes.
pub const HARD_LIMIT_TIME_TO_RUN_MIN: u64 = 120;
/// Sampling interval when none is given, in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 0.025;
/// Shortest usable interval (sleep granularity), in seconds.
pub const MIN_INTERVAL_SECS: f64 = 0.001;

/// Configuration error, reported before any capture begins.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidDevice(String),
    InvalidTimeToRun(String),
    TimeToRunTooLong(u64),
    InvalidInterval(String),
    UnsupportedKernel(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidDevice(msg) => write!(f, "invalid device: {}", msg),
            ConfigError::InvalidTimeToRun(s) => write!(
                f,
                "invalid time to run '{}': use hours (e.g. 1H) or minutes (e.g. 10M)",
                s
            ),
            ConfigError::TimeToRunTooLong(m) => write!(
                f,
                "time to run of {} minutes exceeds the limit of {} minutes",
                m, HARD_LIMIT_TIME_TO_RUN_MIN
            ),
            ConfigError::InvalidInterval(s) => write!(
                f,
                "invalid interval '{}': expected seconds >= {}",
                s, MIN_INTERVAL_SECS
            ),
            ConfigError::UnsupportedKernel(v) => {
                write!(f, "kernel version {} is not supported (2.6 or newer required)", v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parses a time to run such as `10M` or `1H` into minutes.
pub fn parse_time_to_run(s: &str) -> Result<u64, ConfigError> {
    let s = s.trim();
    let err = || ConfigError::InvalidTimeToRun(s.to_string());

    let (num, multiplier) = if let Some(num) = s.strip_suffix(['H', 'h']) {
        (num, 60)
    } else if let Some(num) = s.strip_suffix(['M', 'm']) {
        (num, 1)
    } else {
        return Err(err());
    };

    let minutes = num
        .trim()
        .parse::<u64>()
        .map_err(|_| err())?
        .checked_mul(multiplier)
        .ok_or_else(err)?;

    if minutes == 0 {
        return Err(err());
    }
    if minutes > HARD_LIMIT_TIME_TO_RUN_MIN {
        return Err(ConfigError::TimeToRunTooLong(minutes));
    }
    Ok(minutes)
}

/// Parses and validates a sampling interval in (fractional) seconds.
pub fn parse_interval(s: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidInterval(s.to_string()))?;
    validate_interval(secs)
}

/// Validates a sampling interval in seconds.
pub fn validate_interval(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs < MIN_INTERVAL_SECS {
        return Err(ConfigError::InvalidInterval(secs.to_string()));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// How captured samples reach the delta engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Each tick's batch is processed right away.
    #[default]
    Streaming,
    /// All batches are buffered and processed after the capture window.
    Buffered,
}

/// Everything needed for one capture run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub devices: DeviceSet,
    pub time_to_run: Duration,
    pub interval: Duration,
    pub output_dir: PathBuf,
    pub proc_path: PathBuf,
    pub sys_path: PathBuf,
    pub capture_mode: CaptureMode,
}

impl RunConfig {
    /// Creates a configuration with default paths and streaming capture.
    pub fn new(devices: DeviceSet, time_to_run_min: u64, interval: Duration) -> Self {
        Self {
            devices,
            time_to_run: Duration::from_secs(time_to_run_min * 60),
            interval,
            output_dir: PathBuf::from("."),
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
            capture_mode: CaptureMode::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_proc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.proc_path = path.into();
        self
    }

    pub fn with_sys_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sys_path = path.into();
        self
    }

    pub fn with_capture_mode(mut self, mode: CaptureMode) -> Self {
        self.capture_mode = mode;
        self
    }

    /// Number of sampling ticks in the window, both ends included.
    pub fn tick_count(&self) -> u64 {
        let interval = self.interval.as_nanos().max(1);
        (self.time_to_run.as_nanos() / interval) as u64 + 1
    }
}
