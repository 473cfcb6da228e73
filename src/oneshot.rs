//! Single-note pipeline used by `--note`.

use log_sink::LogClock;
use style_provider::CancelSignal;

use crate::error::UpdateError;
use crate::session::Session;
use crate::transformer::StyleTransformer;

/// Validates, transforms and appends one note. Returns the line written.
///
/// The target is checked before the provider is contacted.
pub fn log_once(
    transformer: &StyleTransformer,
    session: &Session,
    clock: &LogClock,
    note: &str,
    cancel: CancelSignal,
) -> Result<String, UpdateError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(UpdateError::EmptyInput);
    }

    let target = session.target().ok_or(UpdateError::NoFileSelected)?;
    let text = transformer.transform(note, cancel)?;
    let line = clock.entry(text).line()?;
    target.append(&line)?;

    tracing::info!(path = %target.path().display(), "log entry appended");
    Ok(line)
}
