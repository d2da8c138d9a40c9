//! Compiling the proxy

use crate::error::BuildError;
use async_trait::async_trait;
use command_executor::{Command, Launcher, LocalLauncher, ProcessEventType, ProcessHandle};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Absolute path of a compiled executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    binary: PathBuf,
}

impl BuildResult {
    /// Wrap the path of a build artifact
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Path of the artifact
    pub fn path(&self) -> &Path {
        &self.binary
    }

    /// Fail unless the artifact is an executable regular file
    pub fn verify(&self) -> Result<(), BuildError> {
        if is_executable(&self.binary) {
            Ok(())
        } else {
            Err(BuildError::MissingArtifact {
                path: self.binary.clone(),
            })
        }
    }
}

/// Whether `path` is a regular file the current user may execute
pub(crate) fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Compiles one executable out of a source tree
#[async_trait]
pub trait BinaryBuilder: Send + Sync {
    /// Compile `module_path` (relative to `project_root`) into `project_root/output_name`
    async fn build(
        &self,
        project_root: &Path,
        module_path: &Path,
        output_name: &str,
    ) -> Result<BuildResult, BuildError>;
}

/// Builds Go packages with `go build`
///
/// Toolchain output is forwarded line by line to this process's stdout and
/// stderr while the build runs.
pub struct GoBinaryBuilder<L: Launcher = LocalLauncher> {
    launcher: L,
    toolchain: Command,
}

impl GoBinaryBuilder<LocalLauncher> {
    /// Builder running `go` from `PATH`
    pub fn new() -> Self {
        Self::with_launcher(LocalLauncher)
    }
}

impl Default for GoBinaryBuilder<LocalLauncher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Launcher> GoBinaryBuilder<L> {
    /// Builder running the toolchain through `launcher`
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            launcher,
            toolchain: Command::new("go"),
        }
    }

    /// Use `toolchain` (program plus leading arguments) instead of `go`
    pub fn with_toolchain(mut self, toolchain: Command) -> Self {
        self.toolchain = toolchain;
        self
    }
}

#[async_trait]
impl<L: Launcher> BinaryBuilder for GoBinaryBuilder<L> {
    async fn build(
        &self,
        project_root: &Path,
        module_path: &Path,
        output_name: &str,
    ) -> Result<BuildResult, BuildError> {
        if !project_root.is_dir() {
            return Err(BuildError::MissingProject {
                path: project_root.to_path_buf(),
            });
        }
        let project_root = std::fs::canonicalize(project_root)?;

        // Module paths are relative to the project even when written with a leading slash
        let module_path = module_path.strip_prefix("/").unwrap_or(module_path);
        let module_dir = project_root.join(module_path);
        if !module_dir.exists() {
            return Err(BuildError::MissingModule { path: module_dir });
        }

        let mut cmd = self.toolchain.clone();
        cmd.arg("build")
            .arg("-o")
            .arg(output_name)
            .arg(&module_dir)
            .current_dir(&project_root);

        info!("Building {}", module_dir.display());
        debug!("$ {}", cmd);

        let (mut events, mut handle) = self
            .launcher
            .launch(cmd)
            .await
            .map_err(BuildError::Invocation)?;

        let mut diagnostics = Vec::new();
        while let Some(event) = events.next().await {
            match (event.event_type, event.data) {
                (ProcessEventType::Stdout, Some(line)) => println!("{line}"),
                (ProcessEventType::Stderr, Some(line)) => {
                    eprintln!("{line}");
                    diagnostics.push(line);
                }
                _ => {}
            }
        }

        let status = handle.wait().await.map_err(BuildError::Invocation)?;
        if !status.success() {
            error!("proxy build failed: {}", status);
            return Err(BuildError::ToolchainFailed {
                status,
                diagnostics: diagnostics.join("\n"),
            });
        }

        let result = BuildResult::new(project_root.join(output_name));
        result.verify()?;

        info!("Build succeeded!");
        Ok(result)
    }
}
