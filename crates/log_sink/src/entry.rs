use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::SinkError;

/// `YYYY-MM-DD HH:MM:SS`, the bracketed prefix of every log line.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Wall clock pinned to the UTC offset captured at construction.
///
/// The local offset can only be read reliably while the process is still
/// single-threaded, so callers build the clock once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogClock {
    offset: UtcOffset,
}

impl LogClock {
    /// Uses the local offset, falling back to UTC when it is indeterminate.
    #[must_use]
    pub fn local_or_utc() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }

    #[must_use]
    pub fn fixed(offset: UtcOffset) -> Self {
        Self { offset }
    }

    #[must_use]
    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    /// Stamps `text` with the current time.
    #[must_use]
    pub fn entry(&self, text: impl Into<String>) -> LogEntry {
        LogEntry::new(self.now(), text)
    }
}

impl Default for LogClock {
    fn default() -> Self {
        Self::fixed(UtcOffset::UTC)
    }
}

/// One timestamped log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    timestamp: OffsetDateTime,
    text: String,
}

impl LogEntry {
    #[must_use]
    pub fn new(timestamp: OffsetDateTime, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Renders `[YYYY-MM-DD HH:MM:SS] text` without a trailing newline.
    pub fn line(&self) -> Result<String, SinkError> {
        let stamp = self
            .timestamp
            .format(TIMESTAMP_FORMAT)
            .map_err(SinkError::ClockFormat)?;
        Ok(format!("[{stamp}] {}", self.text))
    }
}
