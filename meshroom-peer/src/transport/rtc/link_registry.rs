use crate::error::ConnectionError;
use crate::transport::rtc::connection_wrapper::RtcLink;
use dashmap::DashMap;
use meshroom_core::ConnectionId;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

pub(crate) type PendingDial = oneshot::Sender<Result<(), ConnectionError>>;

/// Live links of one RTC session and the dials still waiting on an answer.
///
/// Links deregister themselves when they close, so nothing outlives its
/// peer connection.
#[derive(Default)]
pub(crate) struct LinkRegistry {
    links: DashMap<ConnectionId, Arc<RtcLink>>,
    pending: DashMap<ConnectionId, PendingDial>,
}

impl LinkRegistry {
    pub(crate) fn insert(&self, connection: ConnectionId, link: Arc<RtcLink>) {
        self.links.insert(connection, link);
    }

    /// Tracks an outbound link until `settle` or `forget` answers `reply`.
    pub(crate) fn dial(&self, connection: ConnectionId, link: Arc<RtcLink>, reply: PendingDial) {
        self.links.insert(connection, link);
        self.pending.insert(connection, reply);
    }

    pub(crate) fn get(&self, connection: &ConnectionId) -> Option<Arc<RtcLink>> {
        self.links.get(connection).map(|l| l.value().clone())
    }

    pub(crate) fn settle(&self, connection: ConnectionId, result: Result<(), ConnectionError>) {
        if let Some((_, tx)) = self.pending.remove(&connection) {
            let _ = tx.send(result);
        }
    }

    /// Drops every trace of `connection`. A dial still waiting fails.
    pub(crate) fn forget(&self, connection: ConnectionId) -> Option<Arc<RtcLink>> {
        self.settle(
            connection,
            Err(ConnectionError::Negotiation(
                "connection closed during negotiation".to_owned(),
            )),
        );
        let removed = self.links.remove(&connection).map(|(_, link)| link);
        if removed.is_some() {
            debug!("Connection {} deregistered", connection);
        }
        removed
    }

    pub(crate) fn drain(&self) -> Vec<Arc<RtcLink>> {
        let links = self.links.iter().map(|l| l.value().clone()).collect();
        self.links.clear();
        self.pending.clear();
        links
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }
}

/// Removes a dial's link when its future is dropped before it settles.
pub(crate) struct DialGuard {
    registry: Arc<LinkRegistry>,
    connection: ConnectionId,
    armed: bool,
}

impl DialGuard {
    pub(crate) fn new(registry: Arc<LinkRegistry>, connection: ConnectionId) -> Self {
        Self {
            registry,
            connection,
            armed: true,
        }
    }

    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DialGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(link) = self.registry.forget(self.connection) else {
            return;
        };
        debug!("Dial {} abandoned, discarding its link", self.connection);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move { link.discard().await });
        }
    }
}
