//! Shared utilities for the testbed.

pub mod logging;
pub mod shutdown;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use shutdown::ShutdownController;
pub use time::{format_duration, unix_now_nanos, unix_now_secs};
