//! Failures while starting processes

use std::path::PathBuf;
use thiserror::Error;

/// Error returned by launchers and process handles
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to spawn a process
    #[error("failed to spawn process: {reason}")]
    SpawnFailed {
        /// The reason for the spawn failure
        reason: String,
    },

    /// Command not found
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The command that was not found
        command: String,
    },

    /// The null device used to silence a detached process could not be opened
    #[error("failed to open null device {}", path.display())]
    NullDevice {
        /// Path of the null device
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }

    /// Classify an I/O error returned while spawning `program`
    pub(crate) fn from_spawn(program: &std::ffi::OsStr, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::CommandNotFound {
                command: program.to_string_lossy().into_owned(),
            }
        } else {
            Self::spawn_failed(format!("{}: {err}", program.to_string_lossy()))
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
