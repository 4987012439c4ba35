use crate::model::participant::Participant;
use crate::model::peer::PeerId;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JOIN and LEAVE payload.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct PeerAnnouncement {
    pub username: String,
    #[serde(rename = "peerId")]
    pub peer_id: PeerId,
}

impl PeerAnnouncement {
    pub fn into_participant(self) -> Participant {
        Participant::new(self.peer_id, self.username)
    }
}

impl From<&Participant> for PeerAnnouncement {
    fn from(p: &Participant) -> Self {
        Self {
            username: p.display_name.clone(),
            peer_id: p.peer_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct TextPayload {
    pub username: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct ImagePayload {
    pub username: String,
    /// Data URL, relayed untouched.
    pub image: String,
}

/// Wire unit exchanged over a data channel. Relies on the channel for ordering.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "UPPERCASE")]
pub enum RelayEnvelope {
    Join(PeerAnnouncement),
    Leave(PeerAnnouncement),
    Text(TextPayload),
    Image(ImagePayload),
    Count(usize),
    /// JSON-encoded participant list, parsed only by the receiver.
    Userlist(String),
}

#[derive(Debug, Error)]
pub enum ProtocolParseError {
    #[error("malformed relay envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("malformed user list snapshot: {0}")]
    UserList(#[source] serde_json::Error),
}

impl RelayEnvelope {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEnvelope::Join(_) => "JOIN",
            RelayEnvelope::Leave(_) => "LEAVE",
            RelayEnvelope::Text(_) => "TEXT",
            RelayEnvelope::Image(_) => "IMAGE",
            RelayEnvelope::Count(_) => "COUNT",
            RelayEnvelope::Userlist(_) => "USERLIST",
        }
    }

    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolParseError> {
        serde_json::from_slice(data).map_err(ProtocolParseError::Envelope)
    }
}
