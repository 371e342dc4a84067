//! Output of interval records as semicolon-delimited log files.

mod writer;

pub use writer::{
    AGGREGATE_HEADER, DEVICE_HEADER, LogWriter, OutputNaming, format_row, run_stamp,
};
