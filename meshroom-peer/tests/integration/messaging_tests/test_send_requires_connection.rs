use meshroom_peer::{NoticeKind, SessionConfig, SessionError};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_for_notice};

#[tokio::test]
async fn test_send_without_connection_is_rejected() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    let mut events = hub.subscribe();

    let err = hub.send_text("anyone?").await.unwrap_err();
    assert!(matches!(err, SessionError::NotConnected));

    let notice = wait_for_notice(&mut events).await;
    assert_eq!(notice.kind, NoticeKind::Warning);
    assert!(hub.messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    let _spoke = room.spoke("S", "s1", "h1").await;

    let err = hub.send_text("   ").await.unwrap_err();
    assert!(matches!(err, SessionError::EmptyMessage));

    let idle = room.spawn(SessionConfig::new("I"), &["i1"]);
    let err = idle.send_text("hi").await.unwrap_err();
    assert!(matches!(err, SessionError::NotConnected));
}
