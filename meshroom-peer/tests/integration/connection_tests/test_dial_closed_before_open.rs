use meshroom_peer::{NoticeKind, Phase, SessionConfig};

use crate::integration::init_tracing;
use crate::utils::{ClosingDialTransport, spawn_scripted, wait_for_notice, wait_for_snapshot};

#[tokio::test]
async fn test_invited_dial_closed_before_open_returns_to_identified() {
    init_tracing();
    let spoke = spawn_scripted(
        ClosingDialTransport::new("s1"),
        SessionConfig::new("S").with_invite("h1"),
    );
    let mut events = spoke.subscribe();

    let id = spoke.initialize().await.unwrap();
    assert_eq!(id.as_str(), "s1");

    let notice = wait_for_notice(&mut events).await;
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.text.contains("h1"), "{}", notice.text);

    let view = wait_for_snapshot(&spoke, |s| s.phase == Phase::SelfIdentified).await;
    assert_eq!(view.open_connections, 0);
    assert_eq!(view.count, 1);
}

#[tokio::test]
async fn test_join_can_be_retried_after_early_close() {
    init_tracing();
    let spoke = spawn_scripted(ClosingDialTransport::new("s1"), SessionConfig::new("S"));
    spoke.initialize().await.unwrap();

    for _ in 0..2 {
        let mut events = spoke.subscribe();
        spoke.join_room("h1").await.unwrap();
        assert_eq!(wait_for_notice(&mut events).await.kind, NoticeKind::Error);
        wait_for_snapshot(&spoke, |s| s.phase == Phase::SelfIdentified).await;
    }
}
