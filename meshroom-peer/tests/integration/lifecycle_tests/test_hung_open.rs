use meshroom_peer::{Phase, SessionConfig, SessionError, TransportInitError};
use std::time::Duration;
use tokio::time::timeout;

use crate::integration::init_tracing;
use crate::utils::{HangingTransport, quiesce, spawn_scripted};

const PROMPT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_shutdown_completes_while_open_hangs() {
    init_tracing();
    let hub = spawn_scripted(HangingTransport, SessionConfig::new("H"));

    let pending = tokio::spawn({
        let hub = hub.clone();
        async move { hub.initialize().await }
    });
    quiesce().await;

    // The actor keeps serving commands while the transport opens.
    let log = timeout(PROMPT, hub.messages()).await.expect("actor is blocked");
    assert!(log.unwrap().is_empty());

    timeout(PROMPT, hub.shutdown())
        .await
        .expect("shutdown hung behind open")
        .unwrap();

    let result = timeout(PROMPT, pending).await.unwrap().unwrap();
    assert!(matches!(
        result,
        Err(SessionError::TransportInit(TransportInitError::Shutdown))
    ));
}

#[tokio::test]
async fn test_reset_completes_while_open_hangs() {
    init_tracing();
    let hub = spawn_scripted(HangingTransport, SessionConfig::new("H"));

    let first = tokio::spawn({
        let hub = hub.clone();
        async move { hub.initialize().await }
    });
    let second = tokio::spawn({
        let hub = hub.clone();
        async move { hub.initialize().await }
    });
    quiesce().await;

    timeout(PROMPT, hub.reset_room())
        .await
        .expect("reset hung behind open")
        .unwrap();

    for waiter in [first, second] {
        let result = timeout(PROMPT, waiter).await.unwrap().unwrap();
        assert!(matches!(
            result,
            Err(SessionError::TransportInit(TransportInitError::Shutdown))
        ));
    }

    let view = hub.snapshot();
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.self_id.is_none());

    timeout(PROMPT, hub.shutdown()).await.unwrap().unwrap();
}
