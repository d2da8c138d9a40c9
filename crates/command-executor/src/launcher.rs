//! Running commands whose output the caller waits for

use crate::command::Command;
use crate::error::Result;
use crate::event::ProcessEvent;
use crate::process::{ExitResult, ProcessHandle};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};

/// Starts commands as children the caller stays attached to
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    /// Events produced while the child runs
    type EventStream: Stream<Item = ProcessEvent> + Send + Unpin;

    /// Control over the started child
    type Handle: ProcessHandle;

    /// Start `command`; its events end once both output streams close
    async fn launch(&self, command: Command) -> Result<(Self::EventStream, Self::Handle)>;

    /// Run `command` to completion, keeping every output line
    ///
    /// A non-zero exit is reported in the result, not as an error.
    async fn execute(&self, command: Command) -> Result<ExitResult> {
        let (events, mut handle) = self.launch(command).await?;
        let output = events
            .filter_map(|event| async move { event.data })
            .fold(String::new(), |mut output, line| async move {
                output.push_str(&line);
                output.push('\n');
                output
            })
            .await;

        let status = handle.wait().await?;
        Ok(ExitResult { status, output })
    }
}
