//! Shared utilities for roster.

pub mod logging;
pub mod time;

pub use logging::{init_logging, init_test_tracing, LogFormat, LogFormatError};
pub use time::{Clock, SystemClock};
