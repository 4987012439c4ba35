use meshroom_peer::{ConnectionError, Phase, Role, SessionConfig};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_for_notice, wait_for_snapshot};

#[tokio::test]
async fn test_invited_spoke_does_not_accept_connections() {
    init_tracing();
    let room = TestRoom::new();

    let _hub = room.hub("H", "h1").await;
    let spoke = room.spoke("S", "s1", "h1").await;
    assert_eq!(spoke.snapshot().role, Role::Spoke);

    let other = room.spawn(SessionConfig::new("O"), &["o1"]);
    let mut events = other.subscribe();
    other.initialize().await.unwrap();
    other.join_room("s1").await.unwrap();

    let notice = wait_for_notice(&mut events).await;
    assert!(
        notice
            .text
            .contains(&ConnectionError::Rejected("s1".into()).to_string()),
        "{}",
        notice.text
    );
    wait_for_snapshot(&other, |s| s.phase == Phase::SelfIdentified).await;
    assert_eq!(spoke.snapshot().open_connections, 1);
}
