/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Client flows over `WebSocketRelay` and real WebRTC data channels, against
//! the routing relay shared with the transport tests.

#[path = "../../peerchat-transport/tests/support/mod.rs"]
mod support;

use peerchat_client::{ChatClient, ClientEvent, LifecycleState, RegistrationStatus};
use peerchat_transport::{WebRtcConfig, WebSocketRelay};
use peerchat_types::Identity;
use std::time::{Duration, Instant};
use support::SilentPeer;
use tokio::time::timeout;

const PATIENCE: Duration = Duration::from_secs(20);

fn relay(url: &str) -> WebSocketRelay {
    WebSocketRelay::new(url)
        .unwrap()
        .with_webrtc(WebRtcConfig::local())
}

async fn wait_for_state(client: &ChatClient, state: LifecycleState) {
    timeout(PATIENCE, client.wait_for(|s| s.state == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state:?}"))
        .unwrap();
}

async fn registered(url: &str) -> (ChatClient, Identity) {
    let client = ChatClient::start(relay(url));
    let snapshot = timeout(PATIENCE, client.wait_for(|s| s.identity.is_some()))
        .await
        .expect("timed out registering")
        .unwrap();
    assert_eq!(snapshot.registration, RegistrationStatus::Registered);
    (client, snapshot.identity.unwrap())
}

async fn connected_pair(url: &str) -> (ChatClient, Identity, ChatClient, Identity) {
    let (alice, alice_id) = registered(url).await;
    let (bob, bob_id) = registered(url).await;
    bob.connect(alice_id.as_str()).await.unwrap();
    wait_for_state(&bob, LifecycleState::Connected).await;
    wait_for_state(&alice, LifecycleState::Connected).await;
    (alice, alice_id, bob, bob_id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_over_data_channel() {
    let server = support::spawn_relay().await;
    let (alice, _alice_id, bob, bob_id) = connected_pair(&server.url).await;

    bob.send("hello over webrtc").await.unwrap();
    let seen = timeout(PATIENCE, alice.wait_for(|s| !s.messages.is_empty()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen.messages[0].text(), "hello over webrtc");
    assert_eq!(seen.messages[0].sender_id(), &bob_id);

    let frames = serde_json::to_string(&server.frames()).unwrap();
    assert!(!frames.contains("hello over webrtc"));

    alice.shutdown().await.unwrap();
    bob.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_client_turns_away_second_caller() {
    let server = support::spawn_relay().await;
    let (alice, alice_id, bob, bob_id) = connected_pair(&server.url).await;
    let mut alice_events = alice.subscribe();
    let (carol, carol_id) = registered(&server.url).await;

    carol.connect(alice_id.as_str()).await.unwrap();
    wait_for_state(&carol, LifecycleState::Disconnected).await;

    let rejected = timeout(PATIENCE, async {
        loop {
            match alice_events.recv().await {
                Ok(ClientEvent::InboundRejected(remote)) => return remote,
                Ok(_) => continue,
                Err(e) => panic!("event bus closed: {e}"),
            }
        }
    })
    .await
    .expect("no InboundRejected event");
    assert_eq!(rejected, carol_id);

    let snapshot = alice.snapshot();
    assert_eq!(snapshot.state, LifecycleState::Connected);
    assert_eq!(snapshot.remote, Some(bob_id));
    assert_eq!(bob.snapshot().state, LifecycleState::Connected);
    assert!(carol.snapshot().remote.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_expired_offer_errors_then_resets() {
    let server = support::spawn_relay().await;
    let (client, _) = registered(&server.url).await;
    let started = Instant::now();

    client.connect("user-9999-z").await.unwrap();
    wait_for_state(&client, LifecycleState::Error).await;
    wait_for_state(&client, LifecycleState::Disconnected).await;
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(client.snapshot().remote.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_survives_relay_loss() {
    let server = support::spawn_relay().await;
    let (alice, _alice_id, bob, _bob_id) = connected_pair(&server.url).await;

    server.shutdown();
    // Let both clients notice the relay is gone.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(alice.snapshot().state, LifecycleState::Connected);
    assert_eq!(bob.snapshot().state, LifecycleState::Connected);

    alice.send("still here").await.unwrap();
    let seen = timeout(PATIENCE, bob.wait_for(|s| !s.messages.is_empty()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen.messages[0].text(), "still here");
    assert_eq!(seen.state, LifecycleState::Connected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_relay_loss_while_connecting_disconnects() {
    let server = support::spawn_relay().await;
    let (client, _) = registered(&server.url).await;
    let mut peer = SilentPeer::join(&server.url, "user-2222-b").await;

    client.connect("user-2222-b").await.unwrap();
    peer.expect("OFFER").await;
    assert_eq!(client.snapshot().state, LifecycleState::Connecting);

    server.shutdown();
    wait_for_state(&client, LifecycleState::Disconnected).await;
    assert!(client.snapshot().remote.is_none());
}
