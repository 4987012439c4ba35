use crate::error::TransportInitError;
use futures::{SinkExt, StreamExt};
use meshroom_core::{IceServerConfig, PeerId, SignalMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

/// WebSocket registration with the rendezvous service.
pub(crate) struct RendezvousClient {
    outgoing: mpsc::UnboundedSender<SignalMessage>,
    write_task: JoinHandle<()>,
    read_task: JoinHandle<()>,
}

pub(crate) struct Registration {
    pub peer_id: PeerId,
    pub ice_servers: Vec<IceServerConfig>,
    pub client: RendezvousClient,
    /// Signals addressed to us. Ends when the rendezvous connection drops.
    pub incoming: mpsc::UnboundedReceiver<SignalMessage>,
}

impl RendezvousClient {
    /// Connects and waits for the `Welcome` carrying our identifier.
    pub(crate) async fn register(url: &str) -> Result<Registration, TransportInitError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| TransportInitError::Unreachable(e.to_string()))?;
        let (mut write, mut read) = ws.split();

        let (peer_id, ice_servers) = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<SignalMessage>(&text) {
                    Ok(SignalMessage::Welcome {
                        peer_id,
                        ice_servers,
                    }) => break (peer_id, ice_servers),
                    Ok(other) => {
                        return Err(TransportInitError::Handshake(format!(
                            "expected Welcome, got {:?}",
                            other
                        )));
                    }
                    Err(e) => return Err(TransportInitError::Handshake(e.to_string())),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Err(TransportInitError::Handshake(
                        "rendezvous closed before welcome".to_owned(),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportInitError::Handshake(e.to_string())),
            }
        };

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<SignalMessage>();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        let write_task = tokio::spawn(async move {
            while let Some(signal) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&signal) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize signal message: {}", e);
                        continue;
                    }
                };
                if write.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let read_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = read.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalMessage>(&text) {
                        Ok(signal) => {
                            debug!("Rendezvous signal received: {:?}", signal.peer());
                            if incoming_tx.send(signal).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid SignalMessage from rendezvous: {:?}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        Ok(Registration {
            peer_id,
            ice_servers,
            client: RendezvousClient {
                outgoing,
                write_task,
                read_task,
            },
            incoming,
        })
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<SignalMessage> {
        self.outgoing.clone()
    }

    pub(crate) fn send(&self, signal: SignalMessage) {
        if self.outgoing.send(signal).is_err() {
            warn!("Rendezvous connection is gone, signal dropped");
        }
    }

    pub(crate) fn close(&self) {
        self.read_task.abort();
        self.write_task.abort();
    }
}
