//! iocap-core, block device I/O sampling library.
//!
//! Provides:
//! - `collector`: counter source readers (`/proc/diskstats`, `/sys/block/*/stat`)
//!   and the fixed-interval capture loop
//! - `schema`: field-count based classification of raw counter lines
//! - `rates`: per-device delta engine
//! - `fmt`: sector/byte/megabyte conversion
//! - `storage`: semicolon-delimited per-device and aggregate log files
//! - `pipeline`: classification → delta → output wiring
//! - `config`: run configuration and validation
//! - `models`: raw samples and interval records
//! - `util`: kernel version and hostname helpers

pub mod collector;
pub mod config;
pub mod fmt;
pub mod models;
pub mod pipeline;
pub mod rates;
pub mod schema;
pub mod storage;
pub mod util;
