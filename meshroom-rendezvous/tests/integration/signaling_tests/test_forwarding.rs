use meshroom_core::{ConnectionId, PeerId, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{TestClient, start_server};

#[tokio::test]
async fn test_offer_and_answer_are_readdressed() {
    init_tracing();
    let (addr, _service) = start_server(Vec::new()).await;
    let mut dialer = TestClient::connect(addr).await;
    let mut host = TestClient::connect(addr).await;
    let connection = ConnectionId::new();

    dialer
        .send(&SignalMessage::Offer {
            peer: host.peer_id.clone(),
            connection,
            sdp: "offer-sdp".to_owned(),
        })
        .await;

    assert_eq!(
        host.recv().await,
        SignalMessage::Offer {
            peer: dialer.peer_id.clone(),
            connection,
            sdp: "offer-sdp".to_owned(),
        }
    );

    host.send(&SignalMessage::Answer {
        peer: dialer.peer_id.clone(),
        connection,
        sdp: "answer-sdp".to_owned(),
    })
    .await;
    host.send(&SignalMessage::IceCandidate {
        peer: dialer.peer_id.clone(),
        connection,
        candidate: "{}".to_owned(),
    })
    .await;

    assert_eq!(
        dialer.recv().await,
        SignalMessage::Answer {
            peer: host.peer_id.clone(),
            connection,
            sdp: "answer-sdp".to_owned(),
        }
    );
    assert!(matches!(
        dialer.recv().await,
        SignalMessage::IceCandidate { peer, .. } if peer == host.peer_id
    ));
}

#[tokio::test]
async fn test_unknown_target_yields_peer_unavailable() {
    init_tracing();
    let (addr, _service) = start_server(Vec::new()).await;
    let mut dialer = TestClient::connect(addr).await;
    let connection = ConnectionId::new();
    let ghost = PeerId::from("ghost");

    dialer
        .send(&SignalMessage::Offer {
            peer: ghost.clone(),
            connection,
            sdp: "offer-sdp".to_owned(),
        })
        .await;

    assert_eq!(
        dialer.recv().await,
        SignalMessage::PeerUnavailable {
            peer: ghost,
            connection,
        }
    );
}

#[tokio::test]
async fn test_garbage_and_server_messages_are_dropped() {
    init_tracing();
    let (addr, _service) = start_server(Vec::new()).await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;

    a.send_raw("{not json").await;
    a.send(&SignalMessage::PeerUnavailable {
        peer: b.peer_id.clone(),
        connection: ConnectionId::new(),
    })
    .await;

    assert!(b.is_silent().await);
    assert!(a.is_silent().await);

    let connection = ConnectionId::new();
    a.send(&SignalMessage::Reject {
        peer: b.peer_id.clone(),
        connection,
    })
    .await;
    assert_eq!(
        b.recv().await,
        SignalMessage::Reject {
            peer: a.peer_id.clone(),
            connection,
        }
    );
}
