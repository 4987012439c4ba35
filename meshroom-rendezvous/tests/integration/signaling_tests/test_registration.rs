use meshroom_core::IceServerConfig;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{TestClient, start_server};

#[tokio::test]
async fn test_each_client_gets_a_unique_identifier() {
    init_tracing();
    let stun = IceServerConfig::stun("stun:stun.example.org:3478");
    let (addr, service) = start_server(vec![stun.clone()]).await;

    let a = TestClient::connect(addr).await;
    let b = TestClient::connect(addr).await;

    assert_ne!(a.peer_id, b.peer_id);
    assert_eq!(a.ice_servers, vec![stun]);
    assert!(service.is_registered(&a.peer_id));
    assert!(service.is_registered(&b.peer_id));
    assert_eq!(service.peer_count(), 2);
}

#[tokio::test]
async fn test_closing_the_socket_unregisters() {
    init_tracing();
    let (addr, service) = start_server(Vec::new()).await;

    let a = TestClient::connect(addr).await;
    let id = a.peer_id.clone();
    a.close().await;

    for _ in 0..50 {
        if !service.is_registered(&id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("peer {} still registered", id);
}
