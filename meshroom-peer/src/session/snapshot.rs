use meshroom_core::{ChatMessage, Participant, PeerId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Uninitialized,
    Hub,
    Spoke,
}

/// Lifecycle of a room session.
///
/// `Idle -> SelfIdentified -> {Hosting | HostingConnected | Joining | Joined} -> Disconnected`,
/// and back to `Idle` through a room reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    SelfIdentified,
    Hosting,
    HostingConnected,
    Joining,
    Joined,
    Disconnected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::SelfIdentified => "identified",
            Phase::Hosting => "hosting",
            Phase::HostingConnected => "hosting (connected)",
            Phase::Joining => "joining",
            Phase::Joined => "joined",
            Phase::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Read-only view of the session published after every handled event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomSnapshot {
    pub self_id: Option<PeerId>,
    pub display_name: String,
    pub role: Role,
    pub phase: Phase,
    pub participants: Vec<Participant>,
    /// Displayed participant count. Authoritative on the hub, adopted from COUNT on a spoke.
    pub count: usize,
    pub open_connections: usize,
    pub message_count: usize,
}

impl RoomSnapshot {
    pub fn host(&self) -> Option<&Participant> {
        self.participants.first()
    }

    pub fn is_connected(&self) -> bool {
        self.open_connections > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// Transient status line for observers. Never stored in the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Appended to the log.
    Message(ChatMessage),
    Notice(Notice),
    /// The room was reset; log and membership are empty.
    Cleared,
}
