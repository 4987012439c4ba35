use meshroom_core::{ChatMessage, PeerId};
use meshroom_peer::{
    MemoryNetwork, Notice, RoomSnapshot, Session, SessionConfig, SessionEvent, SessionHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

pub const WAIT: Duration = Duration::from_secs(3);
pub const TEST_RESET_SETTLE: Duration = Duration::from_millis(50);

/// A shared in-memory network plus helpers to start sessions on it.
pub struct TestRoom {
    pub network: MemoryNetwork,
}

impl TestRoom {
    pub fn new() -> Self {
        Self {
            network: MemoryNetwork::new(),
        }
    }

    pub fn spawn(&self, config: SessionConfig, ids: &[&str]) -> SessionHandle {
        let transport = self.network.transport_with_ids(ids.iter().copied());
        Session::spawn(
            Arc::new(transport),
            config.with_reset_settle(TEST_RESET_SETTLE),
        )
    }

    /// Initialized hub called `name` with identifier `id`.
    pub async fn hub(&self, name: &str, id: &str) -> SessionHandle {
        let hub = self.spawn(SessionConfig::new(name), &[id]);
        let assigned = hub.initialize().await.expect("hub failed to initialize");
        assert_eq!(assigned, PeerId::from(id));
        hub
    }

    /// Spoke invited to `host`, waited on until it is joined.
    pub async fn spoke(&self, name: &str, id: &str, host: &str) -> SessionHandle {
        let spoke = self.spawn(SessionConfig::new(name).with_invite(host), &[id]);
        spoke
            .initialize()
            .await
            .expect("spoke failed to initialize");
        wait_for_snapshot(&spoke, |s| s.count > 1).await;
        spoke
    }
}

pub async fn wait_for_snapshot<F>(handle: &SessionHandle, pred: F) -> RoomSnapshot
where
    F: FnMut(&RoomSnapshot) -> bool,
{
    let mut rx = handle.watch();
    match timeout(WAIT, rx.wait_for(pred)).await {
        Ok(Ok(snapshot)) => (*snapshot).clone(),
        _ => panic!("snapshot condition not reached: {:?}", handle.snapshot()),
    }
}

pub async fn wait_for_log<F>(handle: &SessionHandle, mut pred: F) -> Vec<ChatMessage>
where
    F: FnMut(&[ChatMessage]) -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let log = handle.messages().await.expect("session closed");
        if pred(&log) {
            return log;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("log condition not reached: {:#?}", log);
        }
        sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_notice(rx: &mut broadcast::Receiver<SessionEvent>) -> Notice {
    let result = timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::Notice(notice)) => return notice,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await;
    result.expect("no notice received")
}

/// Lets in-flight events settle before asserting that nothing else happens.
pub async fn quiesce() {
    sleep(Duration::from_millis(100)).await;
}

pub fn count_text(log: &[ChatMessage], text: &str) -> usize {
    log.iter().filter(|m| m.text() == Some(text)).count()
}
