//! # Xcode compilation cache step
//!
//! A pipeline step that fetches the compilation cache proxy sources, compiles
//! the proxy, starts it as a detached background process and exports the
//! variables later Xcode steps need to talk to it.
//!
//! The stages run strictly in order and the first failure stops the run:
//!
//! 1. [`RepositoryFetcher::checkout`] the proxy sources
//! 2. [`BinaryBuilder::build`] the proxy binary
//! 3. [`ProcessLauncher::launch_detached`] the proxy
//! 4. [`EnvironmentExporter::export`] the pid, the enabled flag, the cache
//!    flags and the merged additional xcodebuild arguments
//!
//! [`Step`] wires the stages together.

#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod args;
pub mod build;
pub mod config;
pub mod env;
pub mod error;
pub mod export;
pub mod fetch;
pub mod input;
pub mod launch;
pub mod logging;
pub mod step;

pub use args::{compilation_cache_args, merge_additional_args};
pub use build::{BinaryBuilder, BuildResult, GoBinaryBuilder};
pub use config::ProxySource;
pub use env::{EnvRepository, MapEnvRepository, OsEnvRepository};
pub use error::{BuildError, ConfigError, Error, ExportError, FetchError, LaunchError, Result};
pub use export::{EnvironmentExporter, EnvmanExporter};
pub use fetch::{CheckoutState, FetchConfig, GitCloneFetcher, HttpCredentials, RepositoryFetcher};
pub use input::{Secret, StepInput};
pub use launch::{DetachedProcessLauncher, LaunchedProcess, ProcessLauncher, proxy_environment};
pub use step::{RunSummary, Stage, Step};
