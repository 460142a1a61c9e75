//! What the session reports to whoever presents it
//!
//! The engine never talks to a UI directly. It emits [`UiEvent`]s into a
//! [`UiSink`]; the CLI prints them, tests collect them.

use std::path::PathBuf;

use crate::lifecycle::LifecycleState;
use crate::reconciler::TreeChange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    LifecycleChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    MountFailed {
        reason: String,
    },
    RosterChanged {
        host: String,
        guests: Vec<String>,
    },
    ParticipantJoined {
        name: String,
    },
    ParticipantLeft {
        name: String,
    },
    /// `author` is `None` for directories
    TreeEntryAdded {
        path: PathBuf,
        author: Option<String>,
    },
    TreeEntryRemoved {
        path: PathBuf,
    },
    ChatMessageReceived {
        from: String,
        text: String,
    },
    /// Something went wrong that does not stop the session
    Degraded {
        reason: String,
    },
    ChannelLost {
        reason: String,
    },
    RemoteRequestFailed {
        operation: &'static str,
        reason: String,
    },
    MeetingEnded,
    SessionClosed,
}

impl From<TreeChange> for UiEvent {
    fn from(change: TreeChange) -> Self {
        match change {
            TreeChange::DirectoryCreated { path } => UiEvent::TreeEntryAdded { path, author: None },
            TreeChange::PlaceholderCreated { path, author } => UiEvent::TreeEntryAdded {
                path,
                author: Some(author),
            },
            TreeChange::EntryRemoved { path } => UiEvent::TreeEntryRemoved { path },
        }
    }
}

pub trait UiSink: Send + Sync {
    fn emit(&self, event: UiEvent);
}

impl UiSink for flume::Sender<UiEvent> {
    fn emit(&self, event: UiEvent) {
        // nobody listening is fine
        let _ = self.send(event);
    }
}
