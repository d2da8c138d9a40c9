//! What an attached child reports while it runs

/// One observation of a running child
#[derive(Debug, Clone)]
pub struct ProcessEvent {
    /// What happened
    pub event_type: ProcessEventType,
    /// The output line, for [`ProcessEventType::Stdout`] and [`ProcessEventType::Stderr`]
    pub data: Option<String>,
}

impl ProcessEvent {
    /// The child is running as `pid`
    pub fn started(pid: u32) -> Self {
        Self {
            event_type: ProcessEventType::Started { pid },
            data: None,
        }
    }

    /// A line the child wrote, without its newline
    pub fn line(event_type: ProcessEventType, line: String) -> Self {
        Self {
            event_type,
            data: Some(line),
        }
    }
}

/// Kinds of [`ProcessEvent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEventType {
    /// Always the first event
    Started {
        /// OS process id
        pid: u32,
    },
    /// Line on stdout
    Stdout,
    /// Line on stderr
    Stderr,
}
