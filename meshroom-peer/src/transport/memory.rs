use crate::error::{ConnectionError, RelaySendError, TransportInitError};
use crate::transport::link::{DataLink, Transport};
use crate::transport::transport_event::{ConnectionRole, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use meshroom_core::{ConnectionId, PeerId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// In-process stand-in for the rendezvous service and the data channels.
///
/// Cloning shares the same network.
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<NetworkInner>,
}

struct NetworkInner {
    endpoints: DashMap<PeerId, Endpoint>,
    reachable: AtomicBool,
}

#[derive(Clone)]
struct Endpoint {
    events: mpsc::UnboundedSender<TransportEvent>,
    accepting: Arc<AtomicBool>,
    links: Arc<Mutex<Vec<Arc<MemoryLink>>>>,
}

impl Endpoint {
    fn track(&self, link: Arc<MemoryLink>) {
        if let Ok(mut links) = self.links.lock() {
            links.push(link);
        }
    }

    fn tracked(&self) -> Vec<Arc<MemoryLink>> {
        self.links.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                endpoints: DashMap::new(),
                reachable: AtomicBool::new(true),
            }),
        }
    }

    /// Transport drawing random identifiers.
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport::new(self.clone(), Vec::<PeerId>::new())
    }

    /// Transport handing out `ids` in order on successive `open` calls, then random ones.
    pub fn transport_with_ids<I, P>(&self, ids: I) -> MemoryTransport
    where
        I: IntoIterator<Item = P>,
        P: Into<PeerId>,
    {
        MemoryTransport::new(self.clone(), ids.into_iter().map(Into::into).collect())
    }

    /// While unreachable, `open` and `connect` fail. Established links keep working.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_registered(&self, peer_id: &PeerId) -> bool {
        self.inner.endpoints.contains_key(peer_id)
    }

    /// Open links owned by `peer_id`.
    pub fn open_links(&self, peer_id: &PeerId) -> usize {
        self.endpoint(peer_id)
            .map(|e| e.tracked().iter().filter(|l| l.is_open()).count())
            .unwrap_or(0)
    }

    /// Breaks every link of `peer_id` without any close event: sends start
    /// failing on both ends while the links still look open.
    pub fn sever(&self, peer_id: &PeerId) {
        if let Some(endpoint) = self.endpoint(peer_id) {
            for link in endpoint.tracked() {
                link.state.broken.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Closes every link of `peer_id`, as if its process went away.
    pub async fn disconnect(&self, peer_id: &PeerId) {
        if let Some(endpoint) = self.endpoint(peer_id) {
            for link in endpoint.tracked() {
                link.close().await;
            }
        }
    }

    fn endpoint(&self, peer_id: &PeerId) -> Option<Endpoint> {
        self.inner.endpoints.get(peer_id).map(|e| e.value().clone())
    }

    fn is_reachable(&self) -> bool {
        self.inner.reachable.load(Ordering::SeqCst)
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryTransport {
    network: MemoryNetwork,
    ids: Mutex<VecDeque<PeerId>>,
    current: Mutex<Option<PeerId>>,
}

impl MemoryTransport {
    fn new(network: MemoryNetwork, ids: Vec<PeerId>) -> Self {
        Self {
            network,
            ids: Mutex::new(ids.into()),
            current: Mutex::new(None),
        }
    }

    pub fn self_id(&self) -> Option<PeerId> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    fn next_id(&self) -> PeerId {
        self.ids
            .lock()
            .ok()
            .and_then(|mut ids| ids.pop_front())
            .unwrap_or_else(PeerId::random)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(
        &self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<PeerId, TransportInitError> {
        if !self.network.is_reachable() {
            return Err(TransportInitError::Unreachable(
                "memory network is offline".to_owned(),
            ));
        }
        if let Some(id) = self.self_id() {
            return Ok(id);
        }

        let id = self.next_id();
        if self.network.is_registered(&id) {
            return Err(TransportInitError::Handshake(format!(
                "identifier {id} is already taken"
            )));
        }

        self.network.inner.endpoints.insert(
            id.clone(),
            Endpoint {
                events,
                accepting: Arc::new(AtomicBool::new(false)),
                links: Arc::new(Mutex::new(Vec::new())),
            },
        );
        if let Ok(mut current) = self.current.lock() {
            *current = Some(id.clone());
        }

        debug!("Memory transport registered {}", id);
        Ok(id)
    }

    async fn accept_incoming(&self) {
        let Some(endpoint) = self.self_id().and_then(|id| self.network.endpoint(&id)) else {
            return;
        };
        endpoint.accepting.store(true, Ordering::SeqCst);
    }

    async fn connect(
        &self,
        remote: &PeerId,
        connection: ConnectionId,
    ) -> Result<(), ConnectionError> {
        let me = self.self_id().ok_or(ConnectionError::TransportClosed)?;
        let local = self
            .network
            .endpoint(&me)
            .ok_or(ConnectionError::TransportClosed)?;

        if !self.network.is_reachable() {
            return Err(ConnectionError::Unreachable(remote.clone()));
        }
        let far = self
            .network
            .endpoint(remote)
            .ok_or_else(|| ConnectionError::Unreachable(remote.clone()))?;
        if !far.accepting.load(Ordering::SeqCst) {
            return Err(ConnectionError::Rejected(remote.clone()));
        }

        let state = Arc::new(LinkState {
            open: AtomicBool::new(true),
            broken: AtomicBool::new(false),
        });
        let near_end = Arc::new(MemoryLink {
            id: connection,
            remote: remote.clone(),
            own_events: local.events.clone(),
            peer_events: far.events.clone(),
            state: state.clone(),
        });
        let far_end = Arc::new(MemoryLink {
            id: connection,
            remote: me,
            own_events: far.events.clone(),
            peer_events: local.events.clone(),
            state,
        });
        local.track(near_end.clone());
        far.track(far_end.clone());

        // Dialer learns first, so anything the acceptor sends on open lands after it.
        let _ = local.events.send(TransportEvent::Opened {
            link: near_end,
            role: ConnectionRole::SpokeOutbound,
        });
        let _ = far.events.send(TransportEvent::Opened {
            link: far_end,
            role: ConnectionRole::HubInbound,
        });

        Ok(())
    }

    async fn shutdown(&self) {
        let Some(id) = self.current.lock().ok().and_then(|mut c| c.take()) else {
            return;
        };
        let Some((_, endpoint)) = self.network.inner.endpoints.remove(&id) else {
            return;
        };
        for link in endpoint.tracked() {
            link.close().await;
        }
        debug!("Memory transport {} shut down", id);
    }
}

struct LinkState {
    open: AtomicBool,
    broken: AtomicBool,
}

/// One end of an in-memory link. Both ends share the connection id and state.
pub struct MemoryLink {
    id: ConnectionId,
    remote: PeerId,
    own_events: mpsc::UnboundedSender<TransportEvent>,
    peer_events: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<LinkState>,
}

#[async_trait]
impl DataLink for MemoryLink {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn remote(&self) -> &PeerId {
        &self.remote
    }

    fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    async fn send(&self, data: Bytes) -> Result<(), RelaySendError> {
        if !self.is_open() {
            return Err(RelaySendError::Closed(self.id));
        }
        if self.state.broken.load(Ordering::SeqCst) {
            return Err(RelaySendError::Io {
                connection: self.id,
                reason: "link severed".to_owned(),
            });
        }
        self.peer_events
            .send(TransportEvent::Message {
                connection: self.id,
                data,
            })
            .map_err(|_| {
                self.state.open.store(false, Ordering::SeqCst);
                RelaySendError::Closed(self.id)
            })
    }

    async fn close(&self) {
        if !self.state.open.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.own_events.send(TransportEvent::Closed { connection: self.id });
        let _ = self.peer_events.send(TransportEvent::Closed { connection: self.id });
    }
}
