//! Checking out the proxy sources

use crate::config::ProxySource;
use crate::error::FetchError;
use crate::input::Secret;
use async_trait::async_trait;
use command_executor::{Command, ExitResult, Launcher, LocalLauncher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What to check out and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Directory the working tree is created in
    pub clone_into_dir: PathBuf,
    /// History depth of the clone
    pub clone_depth: u32,
    /// History depth of each submodule
    pub submodule_update_depth: u32,
    /// Remote to clone
    pub repository_url: String,
    /// Branch to check out
    pub branch: String,
}

impl FetchConfig {
    /// Shallow checkout of `source` into `clone_into_dir`
    pub fn for_source(source: &ProxySource, clone_into_dir: PathBuf) -> Self {
        Self {
            clone_into_dir,
            clone_depth: 1,
            submodule_update_depth: 1,
            repository_url: source.repository_url.clone(),
            branch: source.branch.clone(),
        }
    }

    /// Check the configuration constraints
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.repository_url.trim().is_empty() {
            return Err(FetchError::InvalidConfig("repository URL is empty".into()));
        }
        if self.branch.trim().is_empty() {
            return Err(FetchError::InvalidConfig("branch is empty".into()));
        }
        if self.clone_depth == 0 || self.submodule_update_depth == 0 {
            return Err(FetchError::InvalidConfig(
                "clone and submodule depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Result of a successful checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutState {
    /// Root of the working tree
    pub dir: PathBuf,
    /// Checked out commit, when it could be determined
    pub commit: Option<String>,
}

/// Something that can produce a working tree
#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    /// Check out `config.branch` of `config.repository_url` into `config.clone_into_dir`
    async fn checkout(&self, config: FetchConfig) -> Result<CheckoutState, FetchError>;
}

/// Username and password for HTTP(S) remotes
#[derive(Debug, Clone)]
pub struct HttpCredentials {
    /// Username
    pub username: String,
    /// Password or access token
    pub password: Secret,
}

/// Checks out repositories with the git CLI
pub struct GitCloneFetcher<L: Launcher = LocalLauncher> {
    launcher: L,
    git: Command,
    credentials: Option<HttpCredentials>,
}

impl GitCloneFetcher<LocalLauncher> {
    /// Fetcher running `git` from `PATH`
    pub fn new() -> Self {
        Self::with_launcher(LocalLauncher)
    }
}

impl Default for GitCloneFetcher<LocalLauncher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Launcher> GitCloneFetcher<L> {
    /// Fetcher running git through `launcher`
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            launcher,
            git: Command::new("git"),
            credentials: None,
        }
    }

    /// Use `git` (program plus leading arguments) instead of plain `git`
    pub fn with_git(mut self, git: Command) -> Self {
        self.git = git;
        self
    }

    /// Authenticate against HTTP(S) remotes
    pub fn with_credentials(mut self, credentials: Option<HttpCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    async fn git(
        &self,
        operation: &'static str,
        dir: Option<&Path>,
        args: Vec<OsString>,
    ) -> Result<ExitResult, FetchError> {
        let mut cmd = self.git.clone();
        if let Some(dir) = dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");

        let result = self
            .launcher
            .execute(cmd)
            .await
            .map_err(FetchError::Spawn)?;
        if !result.status.success() {
            return Err(FetchError::GitFailed {
                operation,
                status: result.status,
                output: redact(result.output.trim(), self.credentials.as_ref()),
            });
        }
        Ok(result)
    }
}

#[async_trait]
impl<L: Launcher> RepositoryFetcher for GitCloneFetcher<L> {
    async fn checkout(&self, config: FetchConfig) -> Result<CheckoutState, FetchError> {
        config.validate()?;

        let dir = config.clone_into_dir.as_path();
        if dir.exists() && std::fs::read_dir(dir)?.next().is_some() {
            return Err(FetchError::TargetNotEmpty {
                path: dir.to_path_buf(),
            });
        }

        info!(
            "Cloning {} ({}) into {}",
            config.repository_url,
            config.branch,
            dir.display()
        );

        let url = authenticated_url(&config.repository_url, self.credentials.as_ref());
        self.git(
            "clone",
            None,
            vec![
                "clone".into(),
                "--depth".into(),
                config.clone_depth.to_string().into(),
                "--branch".into(),
                config.branch.as_str().into(),
                "--single-branch".into(),
                url.into(),
                dir.as_os_str().to_owned(),
            ],
        )
        .await?;

        self.git(
            "submodule update",
            Some(dir),
            vec![
                "submodule".into(),
                "update".into(),
                "--init".into(),
                "--recursive".into(),
                "--depth".into(),
                config.submodule_update_depth.to_string().into(),
            ],
        )
        .await?;

        let rev_parse = self
            .git("rev-parse", Some(dir), vec!["rev-parse".into(), "HEAD".into()])
            .await;
        let commit = match rev_parse {
            Ok(result) => result
                .output
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string),
            Err(err) => {
                debug!("Could not resolve checked out commit: {}", err);
                None
            }
        };

        if let Some(commit) = &commit {
            info!("Checked out {}", commit);
        }

        Ok(CheckoutState {
            dir: dir.to_path_buf(),
            commit,
        })
    }
}

/// Embed credentials into an HTTP(S) URL that carries none
fn authenticated_url(url: &str, credentials: Option<&HttpCredentials>) -> String {
    let Some(credentials) = credentials else {
        return url.to_string();
    };
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    if !matches!(scheme, "http" | "https") {
        return url.to_string();
    }
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.contains('@') {
        return url.to_string();
    }
    format!(
        "{scheme}://{}:{}@{rest}",
        percent_encode(&credentials.username),
        percent_encode(credentials.password.expose())
    )
}

fn percent_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

fn redact(output: &str, credentials: Option<&HttpCredentials>) -> String {
    match credentials {
        Some(c) if !c.password.expose().is_empty() => {
            output
                .replace(&percent_encode(c.password.expose()), "*****")
                .replace(c.password.expose(), "*****")
        }
        _ => output.to_string(),
    }
}
