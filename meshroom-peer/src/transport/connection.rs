use crate::error::RelaySendError;
use crate::transport::link::DataLink;
use crate::transport::transport_event::ConnectionRole;
use meshroom_core::{ConnectionId, Participant, PeerId, RelayEnvelope};
use std::sync::Arc;

/// A live link as tracked by the session.
#[derive(Clone)]
pub struct Connection {
    link: Arc<dyn DataLink>,
    role: ConnectionRole,
    /// Participant announced through JOIN (hub side).
    pub(crate) announced: Option<Participant>,
    /// LEAVE already received, the close must not announce again.
    pub(crate) leave_announced: bool,
}

impl Connection {
    pub fn new(link: Arc<dyn DataLink>, role: ConnectionRole) -> Self {
        Self {
            link,
            role,
            announced: None,
            leave_announced: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.link.id()
    }

    pub fn remote(&self) -> &PeerId {
        self.link.remote()
    }

    pub fn role(&self) -> ConnectionRole {
        self.role
    }

    pub fn is_open(&self) -> bool {
        self.link.is_open()
    }

    /// Peer that leaves the room when this connection goes away.
    pub fn departing_peer(&self) -> PeerId {
        self.announced
            .as_ref()
            .map(|p| p.peer_id.clone())
            .unwrap_or_else(|| self.remote().clone())
    }

    pub async fn send(&self, envelope: &RelayEnvelope) -> Result<(), RelaySendError> {
        let data = envelope.encode().map_err(|e| RelaySendError::Io {
            connection: self.id(),
            reason: e.to_string(),
        })?;
        self.link.send(data).await
    }

    pub(crate) fn link(&self) -> &Arc<dyn DataLink> {
        &self.link
    }

    pub async fn close(&self) {
        self.link.close().await;
    }
}
