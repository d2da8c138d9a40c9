//! Starting the proxy in the background
//!
//! The proxy has to keep serving the cache after this step exits, so it is
//! spawned as a session leader with its stdio on the null device and nothing
//! but its pid is kept.

use crate::build::is_executable;
use crate::config::PROXY_ENV_KEYS;
use crate::env::EnvRepository;
use crate::error::LaunchError;
use command_executor::{Command, DetachedLauncher};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A running, disowned process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedProcess {
    /// OS process id
    pub pid: u32,
    /// Environment the process was started with
    pub environment: Vec<(OsString, OsString)>,
}

/// Starts binaries that outlive the caller
pub trait ProcessLauncher: Send + Sync {
    /// Start `binary` detached, with the caller's environment plus `extra_env`
    fn launch_detached(
        &self,
        binary: &Path,
        extra_env: &[(String, String)],
    ) -> Result<LaunchedProcess, LaunchError>;
}

/// The variables the proxy needs, as currently set in `env`
///
/// Missing values are passed on as empty strings.
pub fn proxy_environment(env: &dyn EnvRepository) -> Vec<(String, String)> {
    PROXY_ENV_KEYS
        .iter()
        .map(|key| (key.to_string(), env.get(key)))
        .collect()
}

/// [`ProcessLauncher`] backed by [`DetachedLauncher`]
pub struct DetachedProcessLauncher {
    detached: DetachedLauncher,
    env: Arc<dyn EnvRepository>,
}

impl DetachedProcessLauncher {
    /// Launcher passing on the environment read from `env`
    pub fn new(env: Arc<dyn EnvRepository>) -> Self {
        Self {
            detached: DetachedLauncher::new(),
            env,
        }
    }

    /// Bind the child's stdio to `path` instead of the system null device
    pub fn with_null_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.detached = DetachedLauncher::with_null_device(path);
        self
    }
}

impl ProcessLauncher for DetachedProcessLauncher {
    fn launch_detached(
        &self,
        binary: &Path,
        extra_env: &[(String, String)],
    ) -> Result<LaunchedProcess, LaunchError> {
        if !is_executable(binary) {
            return Err(LaunchError::NotExecutable {
                path: binary.to_path_buf(),
            });
        }

        // Explicit entries win over inherited ones of the same name
        let mut merged: BTreeMap<OsString, OsString> = self.env.environ().into_iter().collect();
        merged.extend(extra_env.iter().map(|(k, v)| (k.into(), v.into())));
        let environment: Vec<(OsString, OsString)> = merged.into_iter().collect();

        let keys: Vec<&str> = extra_env.iter().map(|(k, _)| k.as_str()).collect();
        debug!("Passing {} to {}", keys.join(", "), binary.display());

        let command = Command::builder(binary)
            .clean_env(environment.iter().map(|(k, v)| (k, v)))
            .build();
        let pid = self.detached.spawn(&command)?;

        Ok(LaunchedProcess { pid, environment })
    }
}
