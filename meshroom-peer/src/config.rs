use meshroom_core::{PeerId, random_display_name};
use std::time::Duration;

pub const DEFAULT_RESET_SETTLE: Duration = Duration::from_millis(500);
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name announced in JOIN/LEAVE and used as author of local messages.
    pub display_name: String,
    /// Host identifier from an invitation link. Makes the session a spoke.
    pub invite: Option<PeerId>,
    /// Pause between a room reset and re-initialization.
    pub reset_settle: Duration,
    /// Buffer of the `SessionEvent` broadcast channel.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_name: random_display_name(),
            invite: None,
            reset_settle: DEFAULT_RESET_SETTLE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_invite(mut self, host: impl Into<PeerId>) -> Self {
        self.invite = Some(host.into());
        self
    }

    pub fn with_reset_settle(mut self, settle: Duration) -> Self {
        self.reset_settle = settle;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
