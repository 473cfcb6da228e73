use std::path::Path;

use log_sink::{LogTarget, SinkError};

/// The currently selected log file, if any.
///
/// Starts empty and only changes through [`Session::create_target`],
/// [`Session::open_target`] or [`Session::select`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    target: Option<LogTarget>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_target(target: LogTarget) -> Self {
        Self {
            target: Some(target),
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<&LogTarget> {
        self.target.as_ref()
    }

    pub fn select(&mut self, target: LogTarget) -> &LogTarget {
        self.target.insert(target)
    }

    /// Creates a new file and selects it. The previous selection survives a failure.
    pub fn create_target(&mut self, path: impl AsRef<Path>) -> Result<&LogTarget, SinkError> {
        let target = LogTarget::create(path)?;
        Ok(self.select(target))
    }

    /// Selects an existing file. The previous selection survives a failure.
    pub fn open_target(&mut self, path: impl AsRef<Path>) -> Result<&LogTarget, SinkError> {
        let target = LogTarget::open(path)?;
        Ok(self.select(target))
    }

    /// `Current File: <path>` or `Current File: None`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.target {
            Some(target) => format!("Current File: {}", target.path().display()),
            None => "Current File: None".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Session;

    #[test]
    fn new_session_has_no_target() {
        let session = Session::new();

        assert!(session.target().is_none());
        assert_eq!(session.label(), "Current File: None");
    }

    #[test]
    fn failed_selection_keeps_previous_target() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let mut session = Session::new();
        let created = session
            .create_target(dir.path().join("work"))
            .expect("create should succeed")
            .clone();

        session
            .open_target(dir.path().join("missing.txt"))
            .expect_err("missing file should fail");

        assert_eq!(session.target(), Some(&created));
        assert_eq!(
            session.label(),
            format!("Current File: {}", dir.path().join("work.txt").display())
        );
    }
}
