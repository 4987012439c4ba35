use meshroom_peer::SessionError;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_for_snapshot};

#[tokio::test]
async fn test_shutdown_stops_the_actor() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    let spoke = room.spoke("S", "s1", "h1").await;

    spoke.shutdown().await.unwrap();
    assert!(!room.network.is_registered(&"s1".into()));
    wait_for_snapshot(&hub, |s| s.count == 1).await;

    let err = spoke.send_text("late").await.unwrap_err();
    assert!(matches!(err, SessionError::SessionClosed));
}
