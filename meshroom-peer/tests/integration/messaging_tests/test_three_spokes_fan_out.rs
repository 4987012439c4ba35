use crate::integration::init_tracing;
use crate::utils::{TestRoom, count_text, quiesce, wait_for_log, wait_for_snapshot};

#[tokio::test]
async fn test_three_spokes_fan_out() {
    init_tracing();
    let room = TestRoom::new();

    let hub = room.hub("H", "h1").await;
    let a = room.spoke("A", "a1", "h1").await;
    let b = room.spoke("B", "b1", "h1").await;
    let c = room.spoke("C", "c1", "h1").await;

    wait_for_snapshot(&hub, |s| s.count == 4 && s.participants.len() == 4).await;
    for spoke in [&a, &b, &c] {
        wait_for_snapshot(spoke, |s| s.count == 4 && s.participants.len() == 4).await;
    }

    a.send_text("from a").await.unwrap();
    b.send_text("from b").await.unwrap();
    hub.send_text("from hub").await.unwrap();

    for session in [&hub, &a, &b, &c] {
        wait_for_log(session, |log| {
            count_text(log, "from a") == 1
                && count_text(log, "from b") == 1
                && count_text(log, "from hub") == 1
        })
        .await;
    }

    quiesce().await;

    for session in [&hub, &a, &b, &c] {
        let log = session.messages().await.unwrap();
        assert_eq!(count_text(&log, "from a"), 1);
        assert_eq!(count_text(&log, "from b"), 1);
        assert_eq!(count_text(&log, "from hub"), 1);
    }

    let c_log = c.messages().await.unwrap();
    assert!(c_log.iter().filter(|m| !m.is_system_notice).all(|m| !m.origin_local));
    let a_log = a.messages().await.unwrap();
    let own = a_log.iter().find(|m| m.text() == Some("from a")).unwrap();
    assert!(own.origin_local);
    let relayed = a_log.iter().find(|m| m.text() == Some("from hub")).unwrap();
    assert_eq!(relayed.author, "H");
}

#[tokio::test]
async fn test_later_spokes_learn_about_earlier_ones() {
    init_tracing();
    let room = TestRoom::new();

    let _hub = room.hub("H", "h1").await;
    let a = room.spoke("A", "a1", "h1").await;
    let _b = room.spoke("B", "b1", "h1").await;

    let a_log = wait_for_log(&a, |log| count_text(log, "B joined the room") == 1).await;
    assert_eq!(count_text(&a_log, "A joined the room"), 1);

    let a_view = wait_for_snapshot(&a, |s| s.participants.len() == 3).await;
    let names: Vec<&str> = a_view
        .participants
        .iter()
        .map(|p| p.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["H", "A", "B"]);
}
