use futures::StreamExt;
use meshroom_core::{ConnectionId, PeerId, SignalMessage};
use meshroom_peer::{ConnectionError, RtcTransport, Transport, TransportConfig, TransportEvent};
use meshroom_rendezvous::RendezvousService;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::integration::init_tracing;
use crate::utils::quiesce;

async fn start_rendezvous() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");
    tokio::spawn(meshroom_rendezvous::serve(
        listener,
        RendezvousService::new(Vec::new()),
    ));
    format!("ws://{addr}/ws")
}

async fn open_transport(url: &str) -> (RtcTransport, PeerId, mpsc::UnboundedReceiver<TransportEvent>) {
    let transport = RtcTransport::new(TransportConfig {
        rendezvous_url: url.to_owned(),
        ice_servers: Vec::new(),
    });
    let (tx, rx) = mpsc::unbounded_channel();
    let id = transport.open(tx).await.expect("Failed to register");
    (transport, id, rx)
}

#[tokio::test]
async fn test_unknown_peer_leaves_no_link() {
    init_tracing();
    let url = start_rendezvous().await;
    let (dialer, _, _events) = open_transport(&url).await;

    let err = dialer
        .connect(&PeerId::from("nobody"), ConnectionId::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectionError::Unreachable(peer) if peer.as_str() == "nobody"));
    assert_eq!(dialer.tracked_links().await, 0);
}

#[tokio::test]
async fn test_rejected_dial_reports_only_the_rejection() {
    init_tracing();
    let url = start_rendezvous().await;
    let (dialer, _, mut events) = open_transport(&url).await;
    // Registered but never told to accept.
    let (_target, target_id, _target_events) = open_transport(&url).await;

    let err = dialer
        .connect(&target_id, ConnectionId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::Rejected(ref peer) if *peer == target_id));
    assert_eq!(dialer.tracked_links().await, 0);

    quiesce().await;
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, TransportEvent::Closed { .. }),
            "rejected dial also reported a close"
        );
    }
}

#[tokio::test]
async fn test_abandoned_dial_is_discarded() {
    init_tracing();
    let url = start_rendezvous().await;
    let (dialer, _, _events) = open_transport(&url).await;

    // A registered peer that never answers offers.
    let (mut silent, _) = connect_async(url.as_str()).await.expect("Failed to connect");
    let silent_id = match timeout(Duration::from_secs(3), silent.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str(&text) {
            Ok(SignalMessage::Welcome { peer_id, .. }) => peer_id,
            other => panic!("Expected Welcome, got {:?}", other),
        },
        other => panic!("No welcome: {:?}", other.map(|m| m.map(|r| r.is_ok()))),
    };

    let dial = timeout(
        Duration::from_millis(300),
        dialer.connect(&silent_id, ConnectionId::new()),
    )
    .await;
    assert!(dial.is_err(), "silent peer answered");

    assert_eq!(dialer.tracked_links().await, 0);
    dialer.shutdown().await;
}
