//! Backend implementations for different execution contexts
//!
//! Only local execution is provided: attached children whose output is
//! streamed back as [`ProcessEvent`](crate::event::ProcessEvent)s.

pub mod local;
pub use local::{LocalLauncher, LocalProcessHandle, ProcessEventStream};
