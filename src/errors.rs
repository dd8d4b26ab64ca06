use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for dataset loading, robot-pattern retrieval, training, and persistence failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Filesystem failure reading inputs or writing artifacts.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A dataset or structure file is not valid JSON of the expected shape.
    #[error("failed parsing '{}': {source}", .path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Robot patterns could not be fetched, decoded, or compiled.
    #[error("robot pattern retrieval failed: {reason}")]
    RobotPatterns {
        /// What went wrong.
        reason: String,
    },
    /// Structure validation, training, or persistence failed.
    #[error("model '{model}' failed: {details}")]
    Model {
        /// Model name or structure path.
        model: String,
        /// What went wrong.
        details: String,
    },
    /// Invalid build configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
