//! Parsers for the Linux `/proc` and `/sys` block device files.

pub mod parser;

pub use parser::{ParseError, parse_diskstats, parse_sector_size, parse_sys_block_stat};
