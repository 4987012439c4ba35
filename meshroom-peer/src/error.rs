use meshroom_core::{ConnectionId, PeerId, ProtocolParseError};
use thiserror::Error;

/// Self identifier could not be obtained. Fatal to that initialization attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportInitError {
    #[error("rendezvous service unreachable: {0}")]
    Unreachable(String),

    #[error("rendezvous handshake failed: {0}")]
    Handshake(String),

    #[error("transport was shut down")]
    Shutdown,
}

/// Outbound connection failed. The session stays identified and may retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("peer {0} is unreachable")]
    Unreachable(PeerId),

    #[error("peer {0} rejected the connection")]
    Rejected(PeerId),

    #[error("connection negotiation failed: {0}")]
    Negotiation(String),

    #[error("transport is not open")]
    TransportClosed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelaySendError {
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    #[error("send on connection {connection} failed: {reason}")]
    Io {
        connection: ConnectionId,
        reason: String,
    },
}

/// Errors returned through [`crate::SessionHandle`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    TransportInit(#[from] TransportInitError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Relay(#[from] RelaySendError),

    #[error(transparent)]
    Protocol(#[from] ProtocolParseError),

    #[error("session has no self identifier yet")]
    NotInitialized,

    #[error("no open connection")]
    NotConnected,

    #[error("already connected to {0}")]
    AlreadyConnected(PeerId),

    #[error("hosting a room with connected peers")]
    HostingActiveRoom,

    #[error("message is empty")]
    EmptyMessage,

    #[error("session is closed")]
    SessionClosed,
}
