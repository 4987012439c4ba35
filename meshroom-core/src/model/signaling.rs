use crate::model::peer::{ConnectionId, PeerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Rendezvous protocol.
///
/// On the way up `peer` names the target of the message, on the way down the
/// rendezvous service rewrites it to the sender.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "op", content = "d")]
pub enum SignalMessage {
    Welcome {
        peer_id: PeerId,
        ice_servers: Vec<IceServerConfig>,
    },
    Offer {
        peer: PeerId,
        connection: ConnectionId,
        sdp: String,
    },
    Answer {
        peer: PeerId,
        connection: ConnectionId,
        sdp: String,
    },
    IceCandidate {
        peer: PeerId,
        connection: ConnectionId,
        candidate: String,
    },
    /// The remote does not accept inbound connections.
    Reject {
        peer: PeerId,
        connection: ConnectionId,
    },
    /// Sent by the rendezvous service when `peer` is not registered.
    PeerUnavailable {
        peer: PeerId,
        connection: ConnectionId,
    },
}

impl SignalMessage {
    /// Addressed peer, `None` for `Welcome`.
    pub fn peer(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Welcome { .. } => None,
            SignalMessage::Offer { peer, .. }
            | SignalMessage::Answer { peer, .. }
            | SignalMessage::IceCandidate { peer, .. }
            | SignalMessage::Reject { peer, .. }
            | SignalMessage::PeerUnavailable { peer, .. } => Some(peer),
        }
    }

    /// Same message with `peer` replaced.
    pub fn readdressed(self, from: PeerId) -> Self {
        match self {
            SignalMessage::Welcome { .. } => self,
            SignalMessage::Offer {
                connection, sdp, ..
            } => SignalMessage::Offer {
                peer: from,
                connection,
                sdp,
            },
            SignalMessage::Answer {
                connection, sdp, ..
            } => SignalMessage::Answer {
                peer: from,
                connection,
                sdp,
            },
            SignalMessage::IceCandidate {
                connection,
                candidate,
                ..
            } => SignalMessage::IceCandidate {
                peer: from,
                connection,
                candidate,
            },
            SignalMessage::Reject { connection, .. } => SignalMessage::Reject {
                peer: from,
                connection,
            },
            SignalMessage::PeerUnavailable { connection, .. } => SignalMessage::PeerUnavailable {
                peer: from,
                connection,
            },
        }
    }
}
