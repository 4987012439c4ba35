use meshroom_peer::Phase;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, count_text, quiesce, wait_for_snapshot};

#[tokio::test]
async fn test_hub_reset_announces_leave_once() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    let a = room.spoke("A", "a1", "h1").await;
    let b = room.spoke("B", "b1", "h1").await;

    hub.reset_room().await.unwrap();

    for spoke in [&a, &b] {
        let view = wait_for_snapshot(spoke, |s| s.phase == Phase::Disconnected).await;
        assert_eq!(view.count, 0);
        assert!(view.participants.is_empty());
        assert_eq!(view.open_connections, 0);
    }

    quiesce().await;
    for spoke in [&a, &b] {
        let log = spoke.messages().await.unwrap();
        assert_eq!(count_text(&log, "H left the room"), 1);
    }
}
