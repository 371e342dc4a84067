//! Utility helpers for iocap.

mod host;

pub use host::{KernelVersion, read_hostname, read_kernel_version};
