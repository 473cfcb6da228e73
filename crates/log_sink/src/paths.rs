use std::path::{Path, PathBuf};

/// Extension given to new log files named without one.
pub const DEFAULT_EXTENSION: &str = "txt";

#[must_use]
pub fn with_default_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(extension) if !extension.is_empty() => path.to_path_buf(),
        _ => path.with_extension(DEFAULT_EXTENSION),
    }
}
