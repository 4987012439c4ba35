use axum::extract::ws::Message;
use dashmap::DashMap;
use meshroom_core::{IceServerConfig, PeerId, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

struct RendezvousInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Registry of connected peers. Forwards negotiation messages between them.
#[derive(Clone)]
pub struct RendezvousService {
    inner: Arc<RendezvousInner>,
}

impl RendezvousService {
    /// `ice_servers` are announced to every peer in its `Welcome`.
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(RendezvousInner {
                peers: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn is_registered(&self, peer_id: &PeerId) -> bool {
        self.inner.peers.contains_key(peer_id)
    }

    /// Registers the socket sender under a fresh identifier.
    pub(crate) fn register(&self, tx: mpsc::UnboundedSender<Message>) -> PeerId {
        loop {
            let peer_id = PeerId::random();
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.inner.peers.entry(peer_id.clone()) {
                slot.insert(tx);
                return peer_id;
            }
        }
    }

    pub(crate) fn remove_peer(&self, peer_id: &PeerId) {
        self.inner.peers.remove(peer_id);
    }

    pub(crate) fn send_signal(&self, peer_id: &PeerId, msg: &SignalMessage) -> bool {
        let Some(peer) = self.inner.peers.get(peer_id) else {
            return false;
        };
        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {}: {:?}", peer_id, e);
                    return false;
                }
                true
            }
            Err(e) => {
                error!("Failed to serialize signal message: {}", e);
                false
            }
        }
    }

    /// Delivers `msg` from `from` to the peer it names, rewriting `peer` to the sender.
    /// Answers `PeerUnavailable` when the target is not connected.
    pub(crate) fn forward(&self, from: &PeerId, msg: SignalMessage) {
        let (target, connection) = match &msg {
            SignalMessage::Offer {
                peer, connection, ..
            }
            | SignalMessage::Answer {
                peer, connection, ..
            }
            | SignalMessage::IceCandidate {
                peer, connection, ..
            }
            | SignalMessage::Reject { peer, connection } => (peer.clone(), *connection),
            SignalMessage::Welcome { .. } | SignalMessage::PeerUnavailable { .. } => {
                warn!("Peer {} sent a server-only message, ignored", from);
                return;
            }
        };

        debug!("Forwarding signal {} -> {}", from, target);
        if self.send_signal(&target, &msg.readdressed(from.clone())) {
            return;
        }

        warn!("Signal from {} to unknown peer {}", from, target);
        self.send_signal(
            from,
            &SignalMessage::PeerUnavailable {
                peer: target,
                connection,
            },
        );
    }
}

impl Default for RendezvousService {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
