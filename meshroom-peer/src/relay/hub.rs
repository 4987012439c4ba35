use crate::session::{Phase, Session};
use crate::transport::Connection;
use meshroom_core::{ChatMessage, ConnectionId, MessageBody, RelayEnvelope};
use tracing::{debug, info, warn};

/// Hub side of the relay protocol. The hub is authoritative for COUNT and USERLIST.
impl Session {
    pub(crate) async fn hub_connection_opened(&mut self, connection: Connection) {
        info!("Inbound connection {} from {}", connection.id(), connection.remote());

        self.inbound.push(connection.clone());
        self.count = self.inbound.len() + 1;
        self.phase = Phase::HostingConnected;

        self.broadcast(&RelayEnvelope::Count(self.count), None).await;

        let userlist = RelayEnvelope::Userlist(self.membership.to_snapshot());
        if let Err(e) = connection.send(&userlist).await {
            self.prune(connection.id(), &e);
        }
    }

    pub(crate) async fn hub_message(&mut self, origin: ConnectionId, envelope: RelayEnvelope) {
        debug!("Hub received {} on {}", envelope.kind(), origin);

        match envelope {
            RelayEnvelope::Join(announcement) => {
                let participant = announcement.clone().into_participant();
                self.append(ChatMessage::joined(&participant.display_name));
                self.membership.add(participant.clone());
                if let Some(i) = self.inbound_index(origin) {
                    self.inbound[i].announced = Some(participant);
                }

                self.broadcast_membership().await;
                self.broadcast(&RelayEnvelope::Join(announcement), Some(origin))
                    .await;
            }

            RelayEnvelope::Text(payload) => {
                self.append(ChatMessage::remote(
                    payload.username.clone(),
                    MessageBody::Text(payload.text.clone()),
                ));
                self.broadcast(&RelayEnvelope::Text(payload), Some(origin))
                    .await;
            }

            RelayEnvelope::Image(payload) => {
                self.append(ChatMessage::remote(
                    payload.username.clone(),
                    MessageBody::Image(payload.image.clone()),
                ));
                self.broadcast(&RelayEnvelope::Image(payload), Some(origin))
                    .await;
            }

            RelayEnvelope::Leave(announcement) => {
                self.membership.remove(&announcement.peer_id);
                self.append(ChatMessage::left(&announcement.username));
                if let Some(i) = self.inbound_index(origin) {
                    self.inbound[i].leave_announced = true;
                }

                self.broadcast(&RelayEnvelope::Leave(announcement), Some(origin))
                    .await;
                let userlist = RelayEnvelope::Userlist(self.membership.to_snapshot());
                self.broadcast(&userlist, None).await;
            }

            RelayEnvelope::Count(_) | RelayEnvelope::Userlist(_) => {
                warn!("Ignoring {} from spoke connection {}", envelope.kind(), origin);
            }
        }
    }

    pub(crate) async fn hub_connection_closed(&mut self, connection: ConnectionId) {
        let Some(i) = self.inbound_index(connection) else {
            return;
        };
        let closed = self.inbound.remove(i);
        closed.close().await;
        info!("Inbound connection {} from {} closed", connection, closed.remote());

        let departing = closed.departing_peer();
        let removed = self.membership.remove(&departing);
        let name = removed
            .map(|p| p.display_name)
            .or_else(|| closed.announced.as_ref().map(|p| p.display_name.clone()));
        match name {
            Some(name) if !closed.leave_announced => self.append(ChatMessage::left(&name)),
            Some(_) => {}
            None => debug!("Connection {} closed before announcing itself", connection),
        }

        self.count = self.inbound.len() + 1;
        self.broadcast_membership().await;

        if self.inbound.is_empty() && self.outbound.is_none() {
            self.phase = Phase::Disconnected;
        }
    }

    /// USERLIST then COUNT to every inbound connection.
    async fn broadcast_membership(&mut self) {
        let userlist = RelayEnvelope::Userlist(self.membership.to_snapshot());
        self.broadcast(&userlist, None).await;
        self.count = self.inbound.len() + 1;
        self.broadcast(&RelayEnvelope::Count(self.count), None).await;
    }
}
