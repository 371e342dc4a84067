//! iocap - high resolution block device I/O statistics.
//!
//! Samples `/proc/diskstats` or `/sys/block/<dev>/stat` at a fixed interval
//! for a bounded window and writes per-interval deltas as semicolon-delimited
//! log files, one per device plus an aggregate file in multi-device mode.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod progress;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use iocap_core::collector::{DeviceSet, RealFs, Sampler, capture};
use iocap_core::config::{CaptureMode, ConfigError, RunConfig, parse_interval, parse_time_to_run};
use iocap_core::fmt::format_bytes;
use iocap_core::models::RawSample;
use iocap_core::pipeline::{ProcessStats, Processor, SectorSizes};
use iocap_core::storage::{LogWriter, OutputNaming, run_stamp};
use iocap_core::util::{KernelVersion, read_hostname, read_kernel_version};

use progress::ProgressBar;

/// Collect I/O statistics from devices or partitions on Linux systems.
#[derive(Parser)]
#[command(
    name = "iocap",
    version,
    about = "Collect high resolution I/O statistics from block devices",
    after_help = "Examples:\n  \
        iocap -d sdc -t 10M -i 0.025   device sdc for 10 minutes at a 25ms interval\n  \
        iocap -d all -t 1H -i 1        all disks for 1 hour at a 1 second interval\n  \
        iocap -d sdc,sdb -t 15M        sdc and sdb for 15 minutes at the default interval"
)]
struct Args {
    /// Device(s) to capture: a name, a comma-separated list, or "all".
    #[arg(short, long, value_parser = DeviceSet::parse)]
    device: DeviceSet,

    /// Time to run in hours (H) or minutes (M), at most 120 minutes.
    #[arg(short, long = "timetorun", default_value = "2M", value_parser = parse_time_to_run)]
    time_to_run: u64,

    /// Sampling interval in seconds (fractional allowed).
    #[arg(short, long, default_value = "0.025", value_parser = parse_interval)]
    interval: Duration,

    /// Directory for the output log files.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to /sys filesystem (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: PathBuf,

    /// Keep every sample in memory and process after the capture window.
    #[arg(long)]
    buffered: bool,

    /// Do not draw progress bars.
    #[arg(long)]
    no_progress: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["iocap", "iocap_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn describe_interval(interval: Duration) -> String {
    if interval < Duration::from_secs(1) {
        format!("{} milliseconds", interval.as_millis())
    } else {
        format!("{} second(s)", interval.as_secs_f64())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = RunConfig::new(args.device, args.time_to_run, args.interval)
        .with_output_dir(args.output_dir)
        .with_proc_path(args.proc_path)
        .with_sys_path(args.sys_path)
        .with_capture_mode(if args.buffered {
            CaptureMode::Buffered
        } else {
            CaptureMode::Streaming
        });
    let show_progress = !args.no_progress && !args.quiet;

    let fs = RealFs::new();

    let kernel = match read_kernel_version(&fs, &config.proc_path) {
        Ok(v) => v,
        Err(e) => {
            error!("Cannot determine kernel version: {}", e);
            return ExitCode::from(1);
        }
    };
    if kernel < KernelVersion::MIN_SUPPORTED {
        error!("{}", ConfigError::UnsupportedKernel(kernel.to_string()));
        return ExitCode::from(1);
    }

    let hostname = read_hostname(&fs, &config.proc_path);

    info!("iocap {} - kernel {}", env!("CARGO_PKG_VERSION"), kernel);
    info!(
        "Capturing I/O metrics for device(s): {}. Estimated duration: {} minute(s), interval: {}.",
        config.devices,
        args.time_to_run,
        describe_interval(config.interval)
    );
    match config.capture_mode {
        CaptureMode::Buffered => {
            warn!("Samples are kept in memory until the capture ends; a killed run writes nothing.")
        }
        CaptureMode::Streaming => info!("Records are written as they are captured."),
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let naming = OutputNaming::new(&config.output_dir, hostname, run_stamp(Utc::now()));
    let writer = match LogWriter::new(naming, config.devices.is_multi()) {
        Ok(w) => w,
        Err(e) => {
            error!("Cannot create output in {}: {}", config.output_dir.display(), e);
            return ExitCode::from(1);
        }
    };

    let sampler = Sampler::new(
        fs,
        &config.proc_path,
        &config.sys_path,
        config.devices.clone(),
        kernel,
    );
    let mut processor = Processor::new(writer, SectorSizes::new(fs, &config.sys_path));

    let ticks = config.tick_count();
    let mut capture_bar = ProgressBar::new(" Capture", ticks, show_progress);

    let summary = match config.capture_mode {
        CaptureMode::Streaming => {
            let summary = capture::run(&sampler, ticks, config.interval, &running, |tick, batch| {
                processor.process_batch(&batch);
                capture_bar.update(tick + 1);
            });
            capture_bar.finish();
            summary
        }
        CaptureMode::Buffered => {
            let mut buffer: Vec<RawSample> = Vec::new();
            let summary = capture::run(&sampler, ticks, config.interval, &running, |tick, batch| {
                buffer.extend(batch);
                capture_bar.update(tick + 1);
            });
            capture_bar.finish();

            info!("Processing I/O statistics and flushing to file: {} samples.", buffer.len());
            let mut process_bar =
                ProgressBar::new(" Completion", buffer.len() as u64, show_progress);
            for (i, sample) in buffer.iter().enumerate() {
                processor.process(sample);
                process_bar.update(i as u64 + 1);
            }
            process_bar.finish();
            summary
        }
    };

    if summary.interrupted {
        warn!("Capture interrupted after {} of {} ticks", summary.ticks, ticks);
    }
    if summary.failed_ticks > 0 {
        warn!("{} tick(s) lost to unreadable sources", summary.failed_ticks);
    }

    match processor.finish() {
        Ok((stats, files)) => {
            report(&stats, &files);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to close output files: {}", e);
            ExitCode::from(1)
        }
    }
}

fn report(stats: &ProcessStats, files: &[PathBuf]) {
    info!(
        "Process completed: {} samples, {} records, {} dropped intervals, {} unrecognized samples",
        stats.samples, stats.records, stats.rejected, stats.unclassified
    );
    if stats.write_errors > 0 {
        warn!("{} record(s) could not be written", stats.write_errors);
    }
    for file in files {
        let size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        info!("  {} ({})", file.display(), format_bytes(size));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_defaults() {
        let args = Args::try_parse_from(["iocap", "-d", "sda"]).unwrap();
        assert_eq!(args.device, DeviceSet::Single("sda".to_string()));
        assert_eq!(args.time_to_run, 2);
        assert_eq!(args.interval, Duration::from_millis(25));
        assert!(!args.buffered);
    }

    #[test]
    fn parses_multi_device_run() {
        let args =
            Args::try_parse_from(["iocap", "-d", "sdc,sdb", "-t", "1H", "-i", "1", "--buffered"])
                .unwrap();
        assert!(args.device.is_multi());
        assert_eq!(args.time_to_run, 60);
        assert_eq!(args.interval, Duration::from_secs(1));
        assert!(args.buffered);
    }

    #[test]
    fn rejects_invalid_arguments() {
        assert!(Args::try_parse_from(["iocap"]).is_err());
        assert!(Args::try_parse_from(["iocap", "-d", "sda", "-t", "3H"]).is_err());
        assert!(Args::try_parse_from(["iocap", "-d", "sda", "-t", "10"]).is_err());
        assert!(Args::try_parse_from(["iocap", "-d", "sda", "-i", "0"]).is_err());
        assert!(Args::try_parse_from(["iocap", "-d", "sda,,sdb"]).is_err());
    }

    #[test]
    fn describes_interval() {
        assert_eq!(describe_interval(Duration::from_millis(25)), "25 milliseconds");
        assert_eq!(describe_interval(Duration::from_secs(2)), "2 second(s)");
    }
}
