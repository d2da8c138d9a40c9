//! Attached children of the current process

use async_process::{Child, Stdio};
use async_trait::async_trait;
use futures::future::ready;
use futures::stream::{self, BoxStream, StreamExt};
use futures_lite::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::event::{ProcessEvent, ProcessEventType};
use crate::launcher::Launcher;
use crate::process::{ExitStatus, ProcessHandle};

/// Runs commands with stdin closed and both output streams captured
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLauncher;

/// Events of one child: `Started`, then its output lines as they arrive
pub type ProcessEventStream = BoxStream<'static, ProcessEvent>;

/// Control over a child started by [`LocalLauncher`]
///
/// A child that was never waited for is killed when the handle drops.
pub struct LocalProcessHandle {
    child: Child,
    reaped: bool,
}

fn lines<R>(reader: Option<R>, kind: ProcessEventType) -> BoxStream<'static, ProcessEvent>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    match reader {
        // A read error ends the stream like EOF does
        Some(reader) => BufReader::new(reader)
            .lines()
            .take_while(|line| ready(line.is_ok()))
            .filter_map(move |line| ready(line.ok().map(|l| ProcessEvent::line(kind.clone(), l))))
            .boxed(),
        None => stream::empty().boxed(),
    }
}

#[async_trait]
impl Launcher for LocalLauncher {
    type EventStream = ProcessEventStream;
    type Handle = LocalProcessHandle;

    async fn launch(&self, command: Command) -> Result<(Self::EventStream, Self::Handle)> {
        debug!("Running: {}", command);

        let mut child = command
            .prepare()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::from_spawn(command.program(), e))?;

        let pid = child.id();
        let output = stream::select(
            lines(child.stdout.take(), ProcessEventType::Stdout),
            lines(child.stderr.take(), ProcessEventType::Stderr),
        );
        let events = stream::once(ready(ProcessEvent::started(pid)))
            .chain(output)
            .boxed();

        Ok((
            events,
            LocalProcessHandle {
                child,
                reaped: false,
            },
        ))
    }
}

#[async_trait]
impl ProcessHandle for LocalProcessHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }

    async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self
            .child
            .status()
            .await
            .map_err(|e| Error::spawn_failed(format!("failed to wait for {}: {e}", self.child.id())))?;
        self.reaped = true;
        Ok(ExitStatus::from(status))
    }
}

impl Drop for LocalProcessHandle {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
        }
    }
}
