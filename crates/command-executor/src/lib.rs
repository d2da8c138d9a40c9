//! Process primitives for pipeline steps
//!
//! This crate provides the two ways a step runs external programs: attached
//! execution with streamed output ([`backends::LocalLauncher`]) and
//! fire-and-forget spawning of a session-leading background process
//! ([`DetachedLauncher`]).

#![warn(missing_docs)]

pub mod backends;
pub mod command;
pub mod detached;
pub mod error;
pub mod event;
pub mod launcher;
pub mod process;

pub use backends::LocalLauncher;
pub use command::Command;
pub use detached::DetachedLauncher;
pub use error::{Error, Result};
pub use event::{ProcessEvent, ProcessEventType};
pub use launcher::Launcher;
pub use process::{ExitResult, ExitStatus, ProcessHandle};
