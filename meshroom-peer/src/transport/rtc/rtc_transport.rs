use crate::error::{ConnectionError, TransportInitError};
use crate::transport::link::{DataLink, Transport};
use crate::transport::rtc::connection_wrapper::RtcLink;
use crate::transport::rtc::link_registry::{DialGuard, LinkRegistry};
use crate::transport::rtc::rendezvous_client::RendezvousClient;
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::TransportEvent;
use async_trait::async_trait;
use meshroom_core::{ConnectionId, IceServerConfig, PeerId, SignalMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// WebRTC data channels negotiated through the rendezvous service.
pub struct RtcTransport {
    config: TransportConfig,
    state: AsyncMutex<Option<Arc<RtcSession>>>,
}

struct RtcSession {
    self_id: PeerId,
    ice_servers: Vec<IceServerConfig>,
    client: RendezvousClient,
    events: mpsc::UnboundedSender<TransportEvent>,
    accepting: AtomicBool,
    registry: Arc<LinkRegistry>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl RtcTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            state: AsyncMutex::new(None),
        }
    }

    async fn session(&self) -> Option<Arc<RtcSession>> {
        self.state.lock().await.clone()
    }

    /// Peer connections currently held, negotiating or open.
    pub async fn tracked_links(&self) -> usize {
        match self.session().await {
            Some(session) => session.registry.len(),
            None => 0,
        }
    }
}

impl Default for RtcTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl Transport for RtcTransport {
    async fn open(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<PeerId, TransportInitError> {
        let mut state = self.state.lock().await;
        if let Some(session) = state.as_ref() {
            return Ok(session.self_id.clone());
        }

        let registration = RendezvousClient::register(&self.config.rendezvous_url).await?;
        info!(
            "Registered with rendezvous {} as {}",
            self.config.rendezvous_url, registration.peer_id
        );

        let mut ice_servers = self.config.ice_servers.clone();
        ice_servers.extend(registration.ice_servers);

        let session = Arc::new(RtcSession {
            self_id: registration.peer_id.clone(),
            ice_servers,
            client: registration.client,
            events,
            accepting: AtomicBool::new(false),
            registry: Arc::new(LinkRegistry::default()),
            dispatcher: Mutex::new(None),
        });

        let weak = Arc::downgrade(&session);
        let mut incoming = registration.incoming;
        let dispatcher = tokio::spawn(async move {
            while let Some(signal) = incoming.recv().await {
                let Some(session) = weak.upgrade() else { return };
                session.handle_signal(signal).await;
            }
            if let Some(session) = weak.upgrade() {
                warn!("Rendezvous connection lost for {}", session.self_id);
                let _ = session.events.send(TransportEvent::RendezvousLost);
            }
        });
        if let Ok(mut slot) = session.dispatcher.lock() {
            *slot = Some(dispatcher);
        }

        *state = Some(session);
        Ok(registration.peer_id)
    }

    async fn accept_incoming(&self) {
        if let Some(session) = self.session().await {
            session.accepting.store(true, Ordering::SeqCst);
        }
    }

    async fn connect(
        &self,
        remote: &PeerId,
        connection: ConnectionId,
    ) -> Result<(), ConnectionError> {
        let session = self.session().await.ok_or(ConnectionError::TransportClosed)?;

        let (link, sdp) = RtcLink::offer(
            connection,
            remote.clone(),
            &session.ice_servers,
            session.events.clone(),
            session.client.sender(),
            Arc::downgrade(&session.registry),
        )
        .await
        .map_err(|e| {
            error!("Failed to create offer for {}: {:?}", remote, e);
            ConnectionError::Negotiation(e.to_string())
        })?;

        let (tx, rx) = oneshot::channel();
        session.registry.dial(connection, link, tx);
        let guard = DialGuard::new(session.registry.clone(), connection);
        session.client.send(SignalMessage::Offer {
            peer: remote.clone(),
            connection,
            sdp,
        });
        debug!("Offer sent to {} on {}", remote, connection);

        // Drop our handle so shutdown can release the session while we wait.
        drop(session);

        let outcome = rx.await;
        guard.disarm();
        outcome.map_err(|_| ConnectionError::TransportClosed)?
    }

    async fn shutdown(&self) {
        let Some(session) = self.state.lock().await.take() else {
            return;
        };

        if let Some(dispatcher) = session.dispatcher.lock().ok().and_then(|mut d| d.take()) {
            dispatcher.abort();
        }

        for link in session.registry.drain() {
            link.close().await;
        }

        session.client.close();
        info!("RTC transport {} shut down", session.self_id);
    }
}

impl RtcSession {
    async fn handle_signal(&self, signal: SignalMessage) {
        match signal {
            SignalMessage::Offer {
                peer,
                connection,
                sdp,
            } => self.accept_offer(peer, connection, sdp).await,

            SignalMessage::Answer {
                peer,
                connection,
                sdp,
            } => {
                let Some(link) = self.registry.get(&connection) else {
                    warn!("Answer from {} for unknown connection {}", peer, connection);
                    return;
                };
                match link.apply_answer(sdp).await {
                    Ok(()) => self.registry.settle(connection, Ok(())),
                    Err(e) => {
                        error!("Failed to apply answer from {}: {:?}", peer, e);
                        self.fail_dial(connection, ConnectionError::Negotiation(e.to_string()))
                            .await;
                    }
                }
            }

            SignalMessage::IceCandidate {
                peer,
                connection,
                candidate,
            } => {
                let Some(link) = self.registry.get(&connection) else {
                    debug!("ICE candidate from {} for unknown connection", peer);
                    return;
                };
                if let Err(e) = link.add_ice_candidate(&candidate).await {
                    warn!("Failed to add ICE candidate from {}: {:?}", peer, e);
                }
            }

            SignalMessage::Reject { peer, connection } => {
                self.fail_dial(connection, ConnectionError::Rejected(peer)).await;
            }

            SignalMessage::PeerUnavailable { peer, connection } => {
                self.fail_dial(connection, ConnectionError::Unreachable(peer)).await;
            }

            SignalMessage::Welcome { .. } => {
                warn!("Unexpected Welcome after registration");
            }
        }
    }

    async fn accept_offer(&self, peer: PeerId, connection: ConnectionId, sdp: String) {
        if !self.accepting.load(Ordering::SeqCst) {
            warn!("Rejecting offer from {}: not accepting connections", peer);
            self.client.send(SignalMessage::Reject { peer, connection });
            return;
        }

        let answered = RtcLink::answer(
            connection,
            peer.clone(),
            sdp,
            &self.ice_servers,
            self.events.clone(),
            self.client.sender(),
            Arc::downgrade(&self.registry),
        )
        .await;

        match answered {
            Ok((link, sdp)) => {
                self.registry.insert(connection, link);
                self.client.send(SignalMessage::Answer {
                    peer,
                    connection,
                    sdp,
                });
            }
            Err(e) => {
                error!("Failed to answer offer from {}: {:?}", peer, e);
                self.client.send(SignalMessage::Reject { peer, connection });
            }
        }
    }

    /// Settles a dial with `error` and discards its link; the dialer only sees the error.
    async fn fail_dial(&self, connection: ConnectionId, error: ConnectionError) {
        self.registry.settle(connection, Err(error));
        if let Some(link) = self.registry.forget(connection) {
            link.discard().await;
        }
    }
}
