//! Append-only plain-text log files.
//!
//! A [`LogTarget`] names the file entries go to. Every append opens the file,
//! writes one line and closes it again; no handle outlives the call.

mod entry;
mod error;
mod paths;
mod target;

pub use entry::{LogClock, LogEntry, TIMESTAMP_FORMAT};
pub use error::SinkError;
pub use paths::{with_default_extension, DEFAULT_EXTENSION};
pub use target::{append_line, LogTarget};
