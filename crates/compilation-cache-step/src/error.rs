//! Error types for the compilation cache step
//!
//! Every stage has its own error type. [`Error`] wraps them with the stage
//! that failed so the caller can report which part of the run broke.

use crate::step::Stage;
use command_executor::ExitStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for step operations
pub type Result<T> = std::result::Result<T, Error>;

/// A failed run
#[derive(Error, Debug)]
pub enum Error {
    /// Step inputs could not be parsed
    #[error("invalid step input")]
    Config(#[from] ConfigError),

    /// Checking out the proxy sources failed
    #[error("failed to fetch proxy sources")]
    Fetch(#[from] FetchError),

    /// Compiling the proxy failed
    #[error("failed to compile proxy")]
    Build(#[from] BuildError),

    /// Starting the proxy failed
    #[error("failed to start proxy")]
    Launch(#[from] LaunchError),

    /// Writing an output variable failed
    #[error("failed to export {key}")]
    Export {
        /// Stage the export would have completed
        stage: Stage,
        /// Name of the variable
        key: &'static str,
        /// Why the store refused it
        #[source]
        source: ExportError,
    },
}

impl Error {
    /// The stage the run was trying to reach when it failed
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_) => Stage::Init,
            Error::Fetch(_) => Stage::Fetched,
            Error::Build(_) => Stage::Built,
            Error::Launch(_) => Stage::Launched,
            Error::Export { stage, .. } => *stage,
        }
    }
}

/// Invalid or missing step input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input is unset or empty
    #[error("required input {key} is not set")]
    Missing {
        /// Input name
        key: &'static str,
    },

    /// A boolean input holds something else
    #[error("input {key} must be a boolean, got {value:?}")]
    InvalidBool {
        /// Input name
        key: &'static str,
        /// Offending value
        value: String,
    },
}

/// Checkout failure
#[derive(Error, Debug)]
pub enum FetchError {
    /// The fetch configuration violates its constraints
    #[error("invalid fetch configuration: {0}")]
    InvalidConfig(String),

    /// The clone target already holds files
    #[error("checkout directory {} is not empty", path.display())]
    TargetNotEmpty {
        /// Clone target
        path: PathBuf,
    },

    /// git could not be run
    #[error("failed to run git")]
    Spawn(#[source] command_executor::Error),

    /// git ran and failed
    #[error("git {operation} failed with {status}: {output}")]
    GitFailed {
        /// Which git invocation failed
        operation: &'static str,
        /// Exit status of git
        status: ExitStatus,
        /// What git printed
        output: String,
    },

    /// Filesystem error around the checkout directory
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Compilation failure
#[derive(Error, Debug)]
pub enum BuildError {
    /// The project root does not exist
    #[error("project root {} does not exist", path.display())]
    MissingProject {
        /// Expected project root
        path: PathBuf,
    },

    /// The module to compile is not inside the project root
    #[error("module {} does not exist", path.display())]
    MissingModule {
        /// Expected module directory
        path: PathBuf,
    },

    /// The toolchain could not be started
    #[error("failed to invoke toolchain")]
    Invocation(#[source] command_executor::Error),

    /// The toolchain ran and reported failure
    #[error("toolchain failed with {status}: {diagnostics}")]
    ToolchainFailed {
        /// Exit status of the toolchain
        status: ExitStatus,
        /// What the toolchain wrote to stderr
        diagnostics: String,
    },

    /// The toolchain succeeded but left no runnable artifact behind
    #[error("build artifact {} is not an executable file", path.display())]
    MissingArtifact {
        /// Expected artifact path
        path: PathBuf,
    },

    /// Filesystem error while resolving paths
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Detached launch failure
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The binary is missing or not executable
    #[error("{} is not an executable file", path.display())]
    NotExecutable {
        /// Path that was to be launched
        path: PathBuf,
    },

    /// The null sink for the child's stdio could not be opened
    #[error("failed to redirect proxy output")]
    NullDevice(#[source] command_executor::Error),

    /// The process could not be started
    #[error("failed to spawn proxy process")]
    Spawn(#[source] command_executor::Error),
}

impl From<command_executor::Error> for LaunchError {
    fn from(err: command_executor::Error) -> Self {
        match err {
            err @ command_executor::Error::NullDevice { .. } => LaunchError::NullDevice(err),
            err => LaunchError::Spawn(err),
        }
    }
}

/// Output store refused a write
#[derive(Error, Debug)]
pub enum ExportError {
    /// envman could not be run
    #[error("failed to run envman")]
    Spawn(#[source] command_executor::Error),

    /// envman ran and failed
    #[error("envman failed with {status}: {output}")]
    Rejected {
        /// Exit status of envman
        status: ExitStatus,
        /// What envman printed
        output: String,
    },

    /// The store is not reachable
    #[error("output store unavailable: {0}")]
    Unavailable(String),
}
