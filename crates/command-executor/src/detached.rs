//! Fire-and-forget spawning of background processes
//!
//! A detached process is started as the leader of a new session, so it has no
//! controlling terminal and does not share the spawner's process group. Its
//! standard streams are bound to the null device. Together these let it keep
//! running after the spawner exits and keep it from blocking on, or writing
//! into, streams that belong to the spawner.
//!
//! [`DetachedLauncher::spawn`] returns only the process id. No handle is kept:
//! the process is never waited on, signalled or killed by this crate.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::debug;

use crate::command::Command;
use crate::error::{Error, Result};

/// Default sink for the standard streams of a detached process
pub const NULL_DEVICE: &str = "/dev/null";

/// Spawns disowned, session-leading processes
#[derive(Debug, Clone)]
pub struct DetachedLauncher {
    null_device: PathBuf,
}

impl DetachedLauncher {
    /// Launcher that silences children through [`NULL_DEVICE`]
    pub fn new() -> Self {
        Self::with_null_device(NULL_DEVICE)
    }

    /// Launcher that binds child stdio to `path` instead of [`NULL_DEVICE`]
    pub fn with_null_device(path: impl Into<PathBuf>) -> Self {
        Self {
            null_device: path.into(),
        }
    }

    /// Path the child's standard streams are bound to
    pub fn null_device(&self) -> &Path {
        &self.null_device
    }

    /// Start `command` detached and return its pid
    ///
    /// Fails with [`Error::NullDevice`] before anything is spawned when the
    /// null device cannot be opened for reading and writing.
    pub fn spawn(&self, command: &Command) -> Result<u32> {
        let sink = self.open_null_device()?;

        let mut cmd = command.prepare_std();
        cmd.stdin(Stdio::from(sink.try_clone()?))
            .stdout(Stdio::from(sink.try_clone()?))
            .stderr(Stdio::from(sink));
        start_new_session(&mut cmd);

        let child = cmd
            .spawn()
            .map_err(|e| Error::from_spawn(command.program(), e))?;
        let pid = child.id();

        // A std child is neither killed nor waited for on drop
        drop(child);

        debug!("Detached {} as pid {}", command, pid);
        Ok(pid)
    }

    fn open_null_device(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.null_device)
            .map_err(|source| Error::NullDevice {
                path: self.null_device.clone(),
                source,
            })
    }
}

impl Default for DetachedLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn start_new_session(cmd: &mut std::process::Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: setsid(2) is async-signal-safe and the closure touches no state
    // shared with the parent, so it is sound to run between fork and exec.
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()
                .map(drop)
                .map_err(std::io::Error::from)
        });
    }
}

#[cfg(not(unix))]
fn start_new_session(_cmd: &mut std::process::Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_null_device() {
        assert_eq!(DetachedLauncher::new().null_device(), Path::new("/dev/null"));
        assert_eq!(
            DetachedLauncher::default().null_device(),
            DetachedLauncher::new().null_device()
        );
    }

    #[test]
    fn test_unopenable_null_device_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = DetachedLauncher::with_null_device(dir.path().join("missing/null"));

        let err = launcher.spawn(&Command::new("true")).unwrap_err();
        assert!(matches!(err, Error::NullDevice { .. }), "got {err:?}");
    }

    #[test]
    fn test_missing_program() {
        let err = DetachedLauncher::new()
            .spawn(&Command::new("definitely-not-a-real-binary-9127"))
            .unwrap_err();
        assert!(matches!(err, Error::CommandNotFound { .. }), "got {err:?}");
    }
}
