use crate::error::{SessionError, TransportInitError};
use meshroom_core::{ChatMessage, PeerId};
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Requests delivered to the session actor through its mailbox.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// `reply` is `None` for the re-initialization the actor schedules after a reset.
    Initialize { reply: Option<Reply<PeerId>> },

    /// Posted by the open task once the transport answered.
    OpenFinished {
        attempt: u64,
        result: Result<PeerId, TransportInitError>,
    },

    JoinRoom { remote: PeerId, reply: Reply<()> },

    SendText { body: String, reply: Reply<()> },

    /// `data_url` is a `data:<mime>;base64,...` string.
    SendImage { data_url: String, reply: Reply<()> },

    ResetRoom { reply: oneshot::Sender<()> },

    Messages { reply: oneshot::Sender<Vec<ChatMessage>> },

    Shutdown { reply: oneshot::Sender<()> },
}
