use crate::error::SessionError;
use crate::session::SessionCommand;
use crate::session::snapshot::{RoomSnapshot, SessionEvent};
use meshroom_core::{ChatMessage, InviteError, PeerId, invite_link};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Cloneable front of a running [`crate::Session`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<RoomSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        snapshot: watch::Receiver<RoomSnapshot>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            commands,
            snapshot,
            events,
        }
    }

    /// Obtains the self identifier and enters the hub or spoke role.
    /// Returns the current identifier when already initialized.
    pub async fn initialize(&self) -> Result<PeerId, SessionError> {
        self.request(|reply| SessionCommand::Initialize { reply: Some(reply) })
            .await?
    }

    /// Starts dialing `remote`. The outcome shows up in the snapshot phase;
    /// a failed dial is reported as an error notice.
    pub async fn join_room(&self, remote: impl Into<PeerId>) -> Result<(), SessionError> {
        let remote = remote.into();
        self.request(|reply| SessionCommand::JoinRoom { remote, reply })
            .await?
    }

    pub async fn send_text(&self, body: impl Into<String>) -> Result<(), SessionError> {
        let body = body.into();
        self.request(|reply| SessionCommand::SendText { body, reply })
            .await?
    }

    pub async fn send_image(&self, data_url: impl Into<String>) -> Result<(), SessionError> {
        let data_url = data_url.into();
        self.request(|reply| SessionCommand::SendImage { data_url, reply })
            .await?
    }

    /// Tears the room down. The session re-initializes as a new hub after the
    /// configured settling delay.
    pub async fn reset_room(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::ResetRoom { reply }).await
    }

    pub async fn messages(&self) -> Result<Vec<ChatMessage>, SessionError> {
        self.request(|reply| SessionCommand::Messages { reply }).await
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<RoomSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Invitation link for the current identifier, `None` before initialization.
    pub fn invite_link(&self, base: &str) -> Result<Option<String>, InviteError> {
        match self.snapshot.borrow().self_id.as_ref() {
            Some(id) => invite_link(base, id).map(Some),
            None => Ok(None),
        }
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Shutdown { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }
}
