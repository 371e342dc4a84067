//! Block device counter collection for Linux.
//!
//! This module reads cumulative I/O counters from the kernel, with support
//! for mocking so tests run without a real `/proc` or `/sys`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    capture::run                          │
//! │   ticks × (sample → on_batch → sleep interval)           │
//! │                         │                                │
//! │                  ┌──────▼──────┐                         │
//! │                  │   Sampler   │                         │
//! │                  │ - Combined  │ /proc/diskstats         │
//! │                  │ - PerDevice │ /sys/block/<dev>/stat   │
//! │                  └──────┬──────┘                         │
//! │                  ┌──────▼──────┐                         │
//! │                  │  FileSystem │ (trait)                 │
//! │                  └──────┬──────┘                         │
//! └─────────────────────────┼────────────────────────────────┘
//!                ┌──────────┴──────────┐
//!         ┌──────▼──────┐       ┌──────▼──────┐
//!         │   RealFs    │       │   MockFs    │
//!         │  (Linux)    │       │  (Testing)  │
//!         └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::path::Path;
//! use chrono::Utc;
//! use iocap_core::collector::{DeviceSet, MockFs, Sampler};
//! use iocap_core::util::KernelVersion;
//!
//! let fs = MockFs::typical_host();
//! let sampler = Sampler::new(
//!     &fs,
//!     Path::new("/proc"),
//!     Path::new("/sys"),
//!     DeviceSet::All,
//!     KernelVersion::new(5, 15),
//! );
//! let batch = sampler.sample(Utc::now()).unwrap();
//! assert!(!batch.is_empty());
//! ```

pub mod capture;
pub mod mock;
pub mod procfs;
pub mod sampler;
pub mod traits;

pub use capture::CaptureSummary;
pub use mock::MockFs;
pub use sampler::{CollectError, DeviceSet, Sampler, Source, is_excluded};
pub use traits::{FileSystem, RealFs};
