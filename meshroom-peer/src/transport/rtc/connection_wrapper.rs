use crate::error::RelaySendError;
use crate::transport::link::DataLink;
use crate::transport::rtc::link_registry::LinkRegistry;
use crate::transport::transport_event::{ConnectionRole, TransportEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use meshroom_core::{ConnectionId, IceServerConfig, PeerId, SignalMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

const CHANNEL_LABEL: &str = "meshroom";

/// One WebRTC peer connection carrying a single ordered, reliable data channel.
pub(crate) struct RtcLink {
    id: ConnectionId,
    remote: PeerId,
    role: ConnectionRole,
    peer_connection: Arc<RTCPeerConnection>,
    channel: Mutex<Option<Arc<RTCDataChannel>>>,
    open: AtomicBool,
    closed: AtomicBool,
    remote_described: AtomicBool,
    /// Trickled candidates that arrived before the remote description.
    pending_candidates: AsyncMutex<Vec<RTCIceCandidateInit>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    registry: Weak<LinkRegistry>,
}

impl RtcLink {
    async fn build(
        id: ConnectionId,
        remote: PeerId,
        role: ConnectionRole,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<TransportEvent>,
        signals: mpsc::UnboundedSender<SignalMessage>,
        registry: Weak<LinkRegistry>,
    ) -> Result<Arc<Self>> {
        // Codecs are registered even though only a data channel is used.
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let interceptors = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(interceptors)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone().unwrap_or_default(),
                    credential: s.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let link = Arc::new(Self {
            id,
            remote,
            role,
            peer_connection,
            channel: Mutex::new(None),
            open: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            remote_described: AtomicBool::new(false),
            pending_candidates: AsyncMutex::new(Vec::new()),
            events,
            registry,
        });

        link.watch_state();
        link.trickle_candidates(signals);

        Ok(link)
    }

    /// Dialing side: creates the data channel and returns the SDP offer.
    pub(crate) async fn offer(
        id: ConnectionId,
        remote: PeerId,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<TransportEvent>,
        signals: mpsc::UnboundedSender<SignalMessage>,
        registry: Weak<LinkRegistry>,
    ) -> Result<(Arc<Self>, String)> {
        let link = Self::build(
            id,
            remote,
            ConnectionRole::SpokeOutbound,
            ice_servers,
            events,
            signals,
            registry,
        )
        .await?;

        match link.start_offer().await {
            Ok(sdp) => Ok((link, sdp)),
            Err(e) => {
                link.discard().await;
                Err(e)
            }
        }
    }

    async fn start_offer(self: &Arc<Self>) -> Result<String> {
        let channel = self
            .peer_connection
            .create_data_channel(CHANNEL_LABEL, None)
            .await
            .context("Failed to create data channel")?;
        self.attach_channel(channel);

        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(offer.sdp)
    }

    /// Accepting side: applies the remote offer and returns the SDP answer.
    pub(crate) async fn answer(
        id: ConnectionId,
        remote: PeerId,
        offer_sdp: String,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<TransportEvent>,
        signals: mpsc::UnboundedSender<SignalMessage>,
        registry: Weak<LinkRegistry>,
    ) -> Result<(Arc<Self>, String)> {
        let link = Self::build(
            id,
            remote,
            ConnectionRole::HubInbound,
            ice_servers,
            events,
            signals,
            registry,
        )
        .await?;

        match link.start_answer(offer_sdp).await {
            Ok(sdp) => Ok((link, sdp)),
            Err(e) => {
                link.discard().await;
                Err(e)
            }
        }
    }

    async fn start_answer(self: &Arc<Self>, offer_sdp: String) -> Result<String> {
        // The dialer creates the channel; it shows up here before it opens.
        let weak = Arc::downgrade(self);
        self.peer_connection
            .on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
                let weak = weak.clone();
                Box::pin(async move {
                    let Some(link) = weak.upgrade() else { return };
                    debug!(
                        "DataChannel '{}' announced on connection {}",
                        channel.label(),
                        link.id
                    );
                    link.attach_channel(channel);
                })
            }));

        let desc = RTCSessionDescription::offer(offer_sdp)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .context("Failed to apply remote offer")?;
        self.flush_candidates().await;

        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(answer.sdp)
    }

    pub(crate) async fn apply_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .context("Failed to apply remote answer")?;
        self.flush_candidates().await;
        Ok(())
    }

    pub(crate) async fn add_ice_candidate(&self, candidate_json: &str) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(candidate_json).context("Failed to parse ICE candidate JSON")?;

        {
            let mut pending = self.pending_candidates.lock().await;
            if !self.remote_described.load(Ordering::SeqCst) {
                pending.push(candidate);
                return Ok(());
            }
        }

        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn flush_candidates(&self) {
        let drained = {
            let mut pending = self.pending_candidates.lock().await;
            self.remote_described.store(true, Ordering::SeqCst);
            std::mem::take(&mut *pending)
        };

        for candidate in drained {
            if let Err(e) = self.peer_connection.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered ICE candidate on {}: {:?}", self.id, e);
            }
        }
    }

    fn watch_state(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.peer_connection
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let weak = weak.clone();
                Box::pin(async move {
                    let Some(link) = weak.upgrade() else { return };
                    info!("Peer connection {} state changed: {:?}", link.id, s);
                    match s {
                        RTCPeerConnectionState::Failed
                        | RTCPeerConnectionState::Disconnected
                        | RTCPeerConnectionState::Closed => link.mark_closed(),
                        _ => {}
                    }
                })
            }));
    }

    fn trickle_candidates(&self, signals: mpsc::UnboundedSender<SignalMessage>) {
        let remote = self.remote.clone();
        let id = self.id;
        self.peer_connection
            .on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
                let signals = signals.clone();
                let remote = remote.clone();
                Box::pin(async move {
                    let Some(candidate) = c else { return };
                    let Ok(json_candidate) = candidate.to_json() else {
                        return;
                    };
                    let Ok(candidate) = serde_json::to_string(&json_candidate) else {
                        return;
                    };
                    let _ = signals.send(SignalMessage::IceCandidate {
                        peer: remote,
                        connection: id,
                        candidate,
                    });
                })
            }));
    }

    fn attach_channel(self: &Arc<Self>, channel: Arc<RTCDataChannel>) {
        if let Ok(mut slot) = self.channel.lock() {
            *slot = Some(channel.clone());
        }

        let weak = Arc::downgrade(self);
        channel.on_open(Box::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                let Some(link) = weak.upgrade() else { return };
                info!("DataChannel open on connection {} ({})", link.id, link.remote);
                link.open.store(true, Ordering::SeqCst);
                let role = link.role;
                let _ = link.events.send(TransportEvent::Opened {
                    link: link.clone(),
                    role,
                });
            })
        }));

        let events = self.events.clone();
        let id = self.id;
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            let events = events.clone();
            Box::pin(async move {
                let data = Bytes::from(msg.data.to_vec());
                let _ = events.send(TransportEvent::Message {
                    connection: id,
                    data,
                });
            })
        }));

        let weak = Arc::downgrade(self);
        channel.on_close(Box::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(link) = weak.upgrade() {
                    link.mark_closed();
                }
            })
        }));

        let events = self.events.clone();
        channel.on_error(Box::new(move |err| {
            let events = events.clone();
            Box::pin(async move {
                let _ = events.send(TransportEvent::Error {
                    connection: id,
                    reason: err.to_string(),
                });
            })
        }));
    }

    fn mark_closed(&self) {
        if !self.retire() {
            return;
        }
        let _ = self
            .events
            .send(TransportEvent::Closed { connection: self.id });
    }

    /// Flags the link closed and deregisters it. False if it already was.
    fn retire(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.open.store(false, Ordering::SeqCst);
        if let Some(registry) = self.registry.upgrade() {
            registry.forget(self.id);
        }
        true
    }

    /// Closes without a `Closed` event, for links that never reached the session.
    pub(crate) async fn discard(&self) {
        self.retire();
        self.release().await;
    }

    async fn release(&self) {
        if let Some(channel) = self.current_channel() {
            let _ = channel.close().await;
        }
        if let Err(e) = self.peer_connection.close().await {
            debug!("Closing peer connection {} failed: {:?}", self.id, e);
        }
    }

    fn current_channel(&self) -> Option<Arc<RTCDataChannel>> {
        self.channel.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl DataLink for RtcLink {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn remote(&self) -> &PeerId {
        &self.remote
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }

    async fn send(&self, data: Bytes) -> Result<(), RelaySendError> {
        if !self.is_open() {
            return Err(RelaySendError::Closed(self.id));
        }
        let Some(channel) = self.current_channel() else {
            return Err(RelaySendError::Closed(self.id));
        };
        channel
            .send(&data)
            .await
            .map(|_| ())
            .map_err(|e| RelaySendError::Io {
                connection: self.id,
                reason: e.to_string(),
            })
    }

    async fn close(&self) {
        self.mark_closed();
        self.release().await;
    }
}
