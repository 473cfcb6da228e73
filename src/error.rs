use log_sink::SinkError;
use thiserror::Error;

/// Why one "update log" attempt wrote nothing.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Please enter text to log.")]
    EmptyInput,

    #[error("Save a new file or select an existing file")]
    NoFileSelected,

    #[error("Transformation failed: {0}")]
    Transform(String),

    #[error("The model returned an empty reply")]
    EmptyReply,

    #[error("Transformation cancelled")]
    Cancelled,

    #[error("Failed to update log file: {0}")]
    Write(#[from] SinkError),
}
