use crate::error::{ConnectionError, RelaySendError, TransportInitError};
use crate::transport::transport_event::TransportEvent;
use async_trait::async_trait;
use bytes::Bytes;
use meshroom_core::{ConnectionId, PeerId};
use tokio::sync::mpsc;

/// Peer-to-peer connection primitive used by a session.
///
/// Every event produced by the transport, including the events of links it
/// creates, is posted into the channel handed to [`Transport::open`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Registers with the rendezvous service and returns the assigned identifier.
    async fn open(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<PeerId, TransportInitError>;

    /// Starts accepting inbound connections. Until then they are rejected.
    async fn accept_incoming(&self);

    /// Dials `remote`. Resolves once the remote accepted the negotiation; the
    /// link itself is announced later with [`TransportEvent::Opened`].
    async fn connect(&self, remote: &PeerId, connection: ConnectionId)
    -> Result<(), ConnectionError>;

    /// Drops the rendezvous registration and closes every link. Idempotent.
    async fn shutdown(&self);
}

/// One ordered, reliable data channel.
#[async_trait]
pub trait DataLink: Send + Sync + 'static {
    fn id(&self) -> ConnectionId;

    fn remote(&self) -> &PeerId;

    fn is_open(&self) -> bool;

    async fn send(&self, data: Bytes) -> Result<(), RelaySendError>;

    /// Idempotent.
    async fn close(&self);
}
