use crate::error::ConnectionError;
use crate::transport::link::DataLink;
use bytes::Bytes;
use meshroom_core::ConnectionId;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Accepted by a hub.
    HubInbound,
    /// Dialed by a spoke towards its hub.
    SpokeOutbound,
}

/// Events the transport generates for the session loop.
///
/// For a given link `Opened` precedes every `Message`, and `Closed` is sent at most once.
pub enum TransportEvent {
    /// Data channel is open and ready for sending.
    Opened {
        link: Arc<dyn DataLink>,
        role: ConnectionRole,
    },

    Message {
        connection: ConnectionId,
        data: Bytes,
    },

    Closed {
        connection: ConnectionId,
    },

    Error {
        connection: ConnectionId,
        reason: String,
    },

    /// Posted by the session's dial task when `connect` fails.
    DialFailed {
        connection: ConnectionId,
        error: ConnectionError,
    },

    /// Rendezvous registration dropped. Open data channels survive it.
    RendezvousLost,
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::Opened { link, role } => f
                .debug_struct("Opened")
                .field("connection", &link.id())
                .field("remote", link.remote())
                .field("role", role)
                .finish(),
            TransportEvent::Message { connection, data } => f
                .debug_struct("Message")
                .field("connection", connection)
                .field("len", &data.len())
                .finish(),
            TransportEvent::Closed { connection } => {
                f.debug_struct("Closed").field("connection", connection).finish()
            }
            TransportEvent::Error { connection, reason } => f
                .debug_struct("Error")
                .field("connection", connection)
                .field("reason", reason)
                .finish(),
            TransportEvent::DialFailed { connection, error } => f
                .debug_struct("DialFailed")
                .field("connection", connection)
                .field("error", error)
                .finish(),
            TransportEvent::RendezvousLost => f.write_str("RendezvousLost"),
        }
    }
}
