use meshroom_core::PeerId;

use crate::integration::init_tracing;
use crate::utils::{TestRoom, count_text, quiesce, wait_for_log, wait_for_snapshot};

#[tokio::test]
async fn test_count_equals_inbound_connections_plus_one() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    let mut spokes = Vec::new();
    for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
        let id = format!("s{i}");
        spokes.push(room.spoke(name, &id, "h1").await);
        let view = wait_for_snapshot(&hub, |s| s.participants.len() == i + 2).await;
        assert_eq!(view.count, i + 2);
        assert_eq!(view.open_connections, i + 1);
    }

    room.network.disconnect(&PeerId::from("s1")).await;
    let view = wait_for_snapshot(&hub, |s| s.count == 4).await;
    assert_eq!(view.participants.len(), 4);
    assert!(!view.participants.iter().any(|p| p.display_name == "B"));

    spokes[2].reset_room().await.unwrap();
    let view = wait_for_snapshot(&hub, |s| s.count == 3).await;
    assert_eq!(view.participants.len(), 3);

    for spoke in [&spokes[0], &spokes[3]] {
        let view = wait_for_snapshot(spoke, |s| s.count == 3 && s.participants.len() == 3).await;
        assert_eq!(view.host().map(|p| p.display_name.as_str()), Some("H"));
    }

    quiesce().await;
    let hub_log = hub.messages().await.unwrap();
    assert_eq!(count_text(&hub_log, "B left the room"), 1);
    assert_eq!(count_text(&hub_log, "C left the room"), 1);

    // Departures are announced to other spokes only through LEAVE.
    let a_log = wait_for_log(&spokes[0], |log| count_text(log, "C left the room") == 1).await;
    assert_eq!(count_text(&a_log, "B left the room"), 0);
}
