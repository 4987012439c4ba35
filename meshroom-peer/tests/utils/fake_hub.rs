use bytes::Bytes;
use meshroom_core::{PeerId, RelayEnvelope};
use meshroom_peer::{DataLink, MemoryNetwork, MemoryTransport, Transport, TransportEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::utils::WAIT;

/// Raw transport endpoint posing as a hub, for feeding arbitrary bytes to a spoke.
pub struct FakeHub {
    pub id: PeerId,
    _transport: MemoryTransport,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl FakeHub {
    pub async fn open(network: &MemoryNetwork, id: &str) -> Self {
        let transport = network.transport_with_ids([id]);
        let (tx, events) = mpsc::unbounded_channel();
        let id = transport.open(tx).await.expect("fake hub failed to open");
        transport.accept_incoming().await;
        Self {
            id,
            _transport: transport,
            events,
        }
    }

    pub async fn accept(&mut self) -> Arc<dyn DataLink> {
        loop {
            match timeout(WAIT, self.events.recv()).await {
                Ok(Some(TransportEvent::Opened { link, .. })) => return link,
                Ok(Some(_)) => continue,
                _ => panic!("no inbound connection reached the fake hub"),
            }
        }
    }

    /// Next decoded envelope sent to the fake hub.
    pub async fn next_envelope(&mut self) -> RelayEnvelope {
        loop {
            match timeout(WAIT, self.events.recv()).await {
                Ok(Some(TransportEvent::Message { data, .. })) => {
                    return RelayEnvelope::decode(&data).expect("spoke sent garbage");
                }
                Ok(Some(_)) => continue,
                _ => panic!("fake hub received nothing"),
            }
        }
    }
}

pub async fn send_raw(link: &Arc<dyn DataLink>, raw: &str) {
    link.send(Bytes::from(raw.to_owned()))
        .await
        .expect("raw send failed");
}

pub async fn send_envelope(link: &Arc<dyn DataLink>, envelope: &RelayEnvelope) {
    link.send(envelope.encode().expect("encode failed"))
        .await
        .expect("envelope send failed");
}
