//! Shared doubles for step tests

#![allow(dead_code)]

use async_trait::async_trait;
use command_executor::Command;
use compilation_cache_step::{
    CheckoutState, ExportError, EnvironmentExporter, FetchConfig, FetchError, LaunchError,
    LaunchedProcess, ProcessLauncher, RepositoryFetcher,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Log of every collaborator call, in call order
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Creates the proxy package directory instead of cloning
pub struct FakeFetcher {
    pub log: CallLog,
    pub fail: bool,
}

#[async_trait]
impl RepositoryFetcher for FakeFetcher {
    async fn checkout(&self, config: FetchConfig) -> Result<CheckoutState, FetchError> {
        self.log.push(format!("checkout {}", config.branch));
        if self.fail {
            return Err(FetchError::InvalidConfig("remote unreachable".into()));
        }
        std::fs::create_dir_all(config.clone_into_dir.join("cmd/proxy"))?;
        Ok(CheckoutState {
            dir: config.clone_into_dir,
            commit: Some("0123abc".into()),
        })
    }
}

/// Records launches and hands out a fixed pid, or fails
pub struct StubLauncher {
    pub log: CallLog,
    pub pid: u32,
    pub fail: bool,
}

impl ProcessLauncher for StubLauncher {
    fn launch_detached(
        &self,
        binary: &Path,
        extra_env: &[(String, String)],
    ) -> Result<LaunchedProcess, LaunchError> {
        self.log.push(format!("launch {}", binary.display()));
        if self.fail {
            return Err(LaunchError::NotExecutable {
                path: binary.to_path_buf(),
            });
        }
        Ok(LaunchedProcess {
            pid: self.pid,
            environment: extra_env
                .iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        })
    }
}

/// In-memory output store that can refuse one key
#[derive(Clone, Default)]
pub struct RecordingExporter {
    pub log: CallLog,
    pub exported: Arc<Mutex<Vec<(String, String)>>>,
    pub refuse: Option<&'static str>,
}

impl RecordingExporter {
    pub fn exported(&self) -> Vec<(String, String)> {
        self.exported.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnvironmentExporter for RecordingExporter {
    async fn export(&self, key: &str, value: &str) -> Result<(), ExportError> {
        self.log.push(format!("export {key}"));
        if self.refuse == Some(key) {
            return Err(ExportError::Unavailable("envstore is read-only".into()));
        }
        self.exported
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/// A `go` stand-in that writes a long-running shell script as "$3"
pub fn fake_go() -> Command {
    Command::builder("sh")
        .arg("-c")
        .arg("echo compiling \"$4\"; printf '#!/bin/sh\\nexec sleep 30\\n' > \"$3\" && chmod +x \"$3\"")
        .arg("fake-go")
        .build()
}

/// A `go` stand-in that fails like a broken package
pub fn failing_go() -> Command {
    Command::builder("sh")
        .arg("-c")
        .arg("echo 'cmd/proxy/main.go:3:1: syntax error' >&2; exit 1")
        .build()
}

/// Kill a detached stand-in and everything in its process group
#[cfg(unix)]
pub fn stop_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
}

pub fn binary_path(work_dir: &Path) -> PathBuf {
    work_dir
        .canonicalize()
        .unwrap()
        .join("xcode-cache-tools/xcode_cache_proxy")
}
