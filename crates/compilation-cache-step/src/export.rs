//! Writing output variables for later pipeline steps

use crate::error::ExportError;
use async_trait::async_trait;
use command_executor::{Command, Launcher, LocalLauncher};
use tracing::debug;

/// Write access to the pipeline's output-variable store
#[async_trait]
pub trait EnvironmentExporter: Send + Sync {
    /// Store `value` under `key` for the steps that follow
    async fn export(&self, key: &str, value: &str) -> Result<(), ExportError>;
}

/// Exports through `envman add`
pub struct EnvmanExporter<L: Launcher = LocalLauncher> {
    launcher: L,
    envman: Command,
}

impl EnvmanExporter<LocalLauncher> {
    /// Exporter running `envman` from `PATH`
    pub fn new() -> Self {
        Self::with_launcher(LocalLauncher)
    }
}

impl Default for EnvmanExporter<LocalLauncher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Launcher> EnvmanExporter<L> {
    /// Exporter running envman through `launcher`
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            launcher,
            envman: Command::new("envman"),
        }
    }

    /// Use `envman` (program plus leading arguments) instead of plain `envman`
    pub fn with_envman(mut self, envman: Command) -> Self {
        self.envman = envman;
        self
    }
}

#[async_trait]
impl<L: Launcher> EnvironmentExporter for EnvmanExporter<L> {
    async fn export(&self, key: &str, value: &str) -> Result<(), ExportError> {
        let mut cmd = self.envman.clone();
        cmd.args(["add", "--key", key, "--value", value]);

        debug!("Exporting {}", key);
        let result = self
            .launcher
            .execute(cmd)
            .await
            .map_err(ExportError::Spawn)?;

        if !result.status.success() {
            return Err(ExportError::Rejected {
                status: result.status,
                output: result.output.trim().to_string(),
            });
        }
        Ok(())
    }
}
