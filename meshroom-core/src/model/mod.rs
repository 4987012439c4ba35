mod envelope;
mod message;
mod participant;
mod peer;
mod signaling;

pub use envelope::{ImagePayload, PeerAnnouncement, ProtocolParseError, RelayEnvelope, TextPayload};
pub use message::{ChatMessage, MessageBody, MessageId, MessageLog, SYSTEM_AUTHOR, now_millis};
pub use participant::Participant;
pub use peer::{ConnectionId, PeerId};
pub use signaling::{IceServerConfig, SignalMessage};
