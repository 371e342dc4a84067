//! Fixed-interval capture loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::collector::sampler::Sampler;
use crate::collector::traits::FileSystem;
use crate::models::RawSample;

/// Longest single sleep between checks of the run flag.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Outcome of a capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureSummary {
    /// Ticks attempted.
    pub ticks: u64,
    /// Raw samples handed to the callback.
    pub samples: u64,
    /// Ticks lost to an unreadable source.
    pub failed_ticks: u64,
    /// The run flag was cleared before the window ended.
    pub interrupted: bool,
}

/// Samples `ticks` times, `interval` apart, handing each batch to `on_batch`.
///
/// A tick whose source cannot be read is logged and skipped. Clearing
/// `running` stops the loop before the next tick.
pub fn run<F, C>(
    sampler: &Sampler<F>,
    ticks: u64,
    interval: Duration,
    running: &AtomicBool,
    mut on_batch: C,
) -> CaptureSummary
where
    F: FileSystem,
    C: FnMut(u64, Vec<RawSample>),
{
    let mut summary = CaptureSummary::default();

    for tick in 0..ticks {
        if !running.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }

        summary.ticks += 1;
        match sampler.sample(Utc::now()) {
            Ok(batch) => {
                summary.samples += batch.len() as u64;
                on_batch(tick, batch);
            }
            Err(e) => {
                summary.failed_ticks += 1;
                warn!("tick {} lost: {}", tick, e);
            }
        }

        if tick + 1 < ticks {
            sleep_while_running(interval, running);
        }
    }

    summary
}

/// Sleeps for `duration` in short slices, returning early once `running` is cleared.
pub fn sleep_while_running(duration: Duration, running: &AtomicBool) {
    let mut remaining = duration;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let sleep_time = remaining.min(SLEEP_SLICE);
        std::thread::sleep(sleep_time);
        remaining = remaining.saturating_sub(sleep_time);
    }
}
