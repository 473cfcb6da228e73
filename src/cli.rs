use std::path::PathBuf;

use clap::Parser;

/// Rephrase status notes with Gemini and append them to a work log.
#[derive(Debug, Clone, Parser)]
#[command(name = "workload-logger", version, about)]
pub struct Cli {
    /// Existing log file to append to.
    #[arg(short, long, value_name = "PATH", conflicts_with = "new_file")]
    pub file: Option<PathBuf>,

    /// Create a new log file (".txt" is added when the name has no extension).
    #[arg(long, value_name = "PATH")]
    pub new_file: Option<PathBuf>,

    /// Provider id: gemini or mock.
    #[arg(long, value_name = "ID")]
    pub provider: Option<String>,

    /// Model id, or a comma-separated list cycled with /model.
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Log a single note and exit instead of starting the console.
    #[arg(short, long, value_name = "TEXT")]
    pub note: Option<String>,
}
