use meshroom_peer::{Phase, Role, SessionEvent};

use crate::integration::init_tracing;
use crate::utils::{TestRoom, wait_for_log, wait_for_snapshot};

#[tokio::test]
async fn test_reset_room_starts_over_as_new_hub() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    let spoke = room.spoke("S", "s1", "h1").await;
    spoke.send_text("before reset").await.unwrap();
    wait_for_log(&spoke, |log| !log.is_empty()).await;

    let old_id = spoke.snapshot().self_id.unwrap();
    let mut events = spoke.subscribe();
    spoke.reset_room().await.unwrap();

    loop {
        if let SessionEvent::Cleared = events.recv().await.unwrap() {
            break;
        }
    }

    let view = wait_for_snapshot(&spoke, |s| s.phase == Phase::Hosting).await;
    assert_eq!(view.role, Role::Hub);
    assert_eq!(view.count, 1);
    assert_eq!(view.open_connections, 0);
    assert_eq!(view.message_count, 0);
    assert_eq!(view.participants.len(), 1);

    let new_id = view.self_id.unwrap();
    assert_ne!(new_id, old_id);
    assert_eq!(view.participants[0].peer_id, new_id);
    assert!(spoke.messages().await.unwrap().is_empty());

    assert!(!room.network.is_registered(&old_id));
    assert_eq!(room.network.open_links(&new_id), 0);
    wait_for_snapshot(&hub, |s| s.count == 1).await;
}

#[tokio::test]
async fn test_reset_room_is_idempotent() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    hub.reset_room().await.unwrap();
    hub.reset_room().await.unwrap();

    let view = wait_for_snapshot(&hub, |s| s.phase == Phase::Hosting).await;
    assert_eq!(view.count, 1);
    assert_ne!(view.self_id.map(|id| id.to_string()), Some("h1".to_owned()));

    let _late = room.spoke("L", "l1", view.participants[0].peer_id.as_str()).await;
    wait_for_snapshot(&hub, |s| s.count == 2).await;
}
