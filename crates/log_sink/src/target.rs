use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::SinkError;
use crate::paths::with_default_extension;

/// A file that log lines are appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    path: PathBuf,
}

impl LogTarget {
    /// Creates a new, empty log file.
    ///
    /// A name without an extension gets `.txt`. Fails when the file already
    /// exists so an earlier log is never truncated.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = non_empty(path.as_ref())?;
        let path = with_default_extension(path);

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| match source.kind() {
                ErrorKind::AlreadyExists => SinkError::AlreadyExists { path: path.clone() },
                _ => SinkError::io("creating log file", &path, source),
            })?;

        Ok(Self { path })
    }

    /// Selects an existing regular file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = non_empty(path.as_ref())?.to_path_buf();

        let metadata = fs::metadata(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => SinkError::NotFound { path: path.clone() },
            _ => SinkError::io("inspecting log file", &path, source),
        })?;
        if !metadata.is_file() {
            return Err(SinkError::NotAFile { path });
        }

        Ok(Self { path })
    }

    /// Appends `line` plus a newline.
    pub fn append(&self, line: &str) -> Result<(), SinkError> {
        append_line(&self.path, line)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Opens `path` for append (creating it when missing), writes `line` and a
/// newline, then closes the file.
pub fn append_line(path: &Path, line: &str) -> Result<(), SinkError> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| SinkError::io("opening log file for append", path, source))?;

    file.write_all(format!("{line}\n").as_bytes())
        .map_err(|source| SinkError::io("appending log line", path, source))?;
    file.flush()
        .map_err(|source| SinkError::io("flushing log file", path, source))
}

fn non_empty(path: &Path) -> Result<&Path, SinkError> {
    if path.as_os_str().is_empty() {
        Err(SinkError::EmptyPath)
    } else {
        Ok(path)
    }
}
