//! Mock filesystem and fixtures for collector tests.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::{diskstats_line, sys_block_stat};
