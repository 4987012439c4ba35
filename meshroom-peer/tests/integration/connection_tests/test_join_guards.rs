use meshroom_peer::{SessionConfig, SessionError};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_for_snapshot};

#[tokio::test]
async fn test_join_requires_identifier() {
    init_tracing();
    let room = TestRoom::new();

    let spoke = room.spawn(SessionConfig::new("S"), &["s1"]);
    let err = spoke.join_room("h1").await.unwrap_err();
    assert!(matches!(err, SessionError::NotInitialized));
}

#[tokio::test]
async fn test_join_rejected_while_connected() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    let _other_hub = room.hub("G", "g1").await;
    let spoke = room.spoke("S", "s1", "h1").await;

    let err = spoke.join_room("g1").await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadyConnected(id) if id.as_str() == "h1"));

    wait_for_snapshot(&hub, |s| s.count == 2).await;
    let err = hub.join_room("g1").await.unwrap_err();
    assert!(matches!(err, SessionError::HostingActiveRoom));
}
