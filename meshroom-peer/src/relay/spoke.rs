use crate::session::{Notice, Phase, Session};
use crate::transport::Connection;
use meshroom_core::{ChatMessage, Membership, MessageBody, PeerAnnouncement, RelayEnvelope};
use tracing::{debug, info, warn};

/// Spoke side of the relay protocol. Spokes never relay.
impl Session {
    pub(crate) async fn spoke_connection_opened(&mut self, connection: Connection) {
        info!("Connected to hub {} on {}", connection.remote(), connection.id());

        let Some(local) = self.local_participant() else {
            connection.close().await;
            return;
        };
        self.outbound = Some(connection.clone());
        self.membership.add(local.clone());

        let join = RelayEnvelope::Join(PeerAnnouncement::from(&local));
        if let Err(e) = connection.send(&join).await {
            self.prune(connection.id(), &e);
        }

        self.append(ChatMessage::joined(&local.display_name));
        self.phase = Phase::Joined;
    }

    pub(crate) async fn spoke_message(&mut self, envelope: RelayEnvelope) {
        debug!("Spoke received {}", envelope.kind());

        match envelope {
            RelayEnvelope::Join(announcement) => {
                self.append(ChatMessage::joined(&announcement.username));
                self.membership.add(announcement.into_participant());
            }

            RelayEnvelope::Text(payload) => {
                self.append(ChatMessage::remote(
                    payload.username,
                    MessageBody::Text(payload.text),
                ));
            }

            RelayEnvelope::Image(payload) => {
                self.append(ChatMessage::remote(
                    payload.username,
                    MessageBody::Image(payload.image),
                ));
            }

            RelayEnvelope::Leave(announcement) => {
                if let Some(outbound) = self.outbound.as_mut()
                    && outbound.remote() == &announcement.peer_id
                {
                    outbound.leave_announced = true;
                }
                self.append(ChatMessage::left(&announcement.username));
                self.membership.remove(&announcement.peer_id);
            }

            RelayEnvelope::Count(count) => {
                self.count = count;
            }

            RelayEnvelope::Userlist(snapshot) => match Membership::parse_snapshot(&snapshot) {
                Ok(participants) => {
                    if let Some(local) = self.local_participant() {
                        self.membership.replace_all(participants, &local);
                    }
                }
                Err(e) => {
                    warn!("Discarding malformed user list: {}", e);
                    self.notice(Notice::warning(format!("Ignored a malformed user list: {e}")));
                }
            },
        }
    }

    pub(crate) async fn spoke_connection_closed(&mut self) {
        let Some(closed) = self.outbound.take() else {
            return;
        };
        closed.close().await;
        info!("Connection {} to hub {} closed", closed.id(), closed.remote());

        if !closed.leave_announced {
            let name = self
                .membership
                .get(closed.remote())
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| closed.remote().to_string());
            self.append(ChatMessage::left(&name));
        }

        self.membership.clear();
        self.count = 0;
        self.phase = Phase::Disconnected;
    }
}
