#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Signaling session tests against the in-memory peer network.
//!
//! Drives `SignalingSession` directly (no `GameSession`) to check the
//! negotiation state machine, the once-only local code, and channel gating.

mod common;

use peer_tictactoe::codec;
use peer_tictactoe::config::RtcConfig;
use peer_tictactoe::peer::{IceGatheringState, PeerConnector, PeerEvent};
use peer_tictactoe::{
    ChannelState, PeerGameError, Role, SdpType, SessionDescription, SessionState, SignalingSession,
    WireMessage,
};

use common::{MockConnector, MockNetwork, MockPeer};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

async fn host_session(connector: &MockConnector) -> SignalingSession<MockPeer> {
    let pc = connector.connect(&RtcConfig::default()).await.unwrap();
    SignalingSession::host(pc, "ttt").await.unwrap()
}

async fn join_session(connector: &MockConnector) -> SignalingSession<MockPeer> {
    let pc = connector.connect(&RtcConfig::default()).await.unwrap();
    SignalingSession::join(pc)
}

/// Pull every queued event through `observe`, polling for the local code
/// after each one the way the orchestrator does. Returns every code handed
/// out.
async fn drive(session: &mut SignalingSession<MockPeer>) -> Vec<String> {
    let mut codes = Vec::new();
    while let Some(event) = session.recv().await {
        session.observe(&event);
        if let Some(code) = session.poll_local_code() {
            codes.push(code);
        }
    }
    codes
}

/// Host and joiner connected through both codes.
async fn connected_pair(
    network: &MockNetwork,
) -> (SignalingSession<MockPeer>, SignalingSession<MockPeer>) {
    let connector = MockConnector::new(network);
    let mut host = host_session(&connector).await;
    let mut join = join_session(&connector).await;

    let offer = drive(&mut host).await.remove(0);
    join.apply_remote_code(&offer).await.unwrap();
    let answer = drive(&mut join).await.remove(0);
    host.apply_remote_code(&answer).await.unwrap();

    drive(&mut host).await;
    drive(&mut join).await;
    (host, join)
}

// ════════════════════════════════════════════════════════════════════
// Host / join lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn host_awaits_answer_with_local_offer() {
    let connector = MockConnector::new(&MockNetwork::new());
    let host = host_session(&connector).await;

    assert_eq!(host.role(), Role::Host);
    assert_eq!(host.state(), SessionState::AwaitingRemote);
    assert_eq!(host.channel_state(), ChannelState::Connecting);
    assert_eq!(host.local_description().unwrap().kind, SdpType::Offer);
    assert!(host.remote_description().is_none());
}

#[tokio::test]
async fn join_awaits_offer_without_local_description() {
    let connector = MockConnector::new(&MockNetwork::new());
    let join = join_session(&connector).await;

    assert_eq!(join.role(), Role::Join);
    assert_eq!(join.state(), SessionState::AwaitingRemote);
    assert!(join.local_description().is_none());
    assert!(join.local_code().is_none());
}

#[tokio::test]
async fn session_ids_are_unique() {
    let connector = MockConnector::new(&MockNetwork::new());
    let a = host_session(&connector).await;
    let b = host_session(&connector).await;
    assert_ne!(a.id(), b.id());
}

#[tokio::test]
async fn full_negotiation_connects_both_sides() {
    let network = MockNetwork::new();
    let (host, join) = connected_pair(&network).await;

    assert_eq!(host.state(), SessionState::Connected);
    assert_eq!(join.state(), SessionState::Connected);
    assert_eq!(host.channel_state(), ChannelState::Open);
    assert_eq!(join.channel_state(), ChannelState::Open);
    assert_eq!(join.remote_description().unwrap().kind, SdpType::Offer);
    assert_eq!(host.remote_description().unwrap().kind, SdpType::Answer);
}

// ════════════════════════════════════════════════════════════════════
// Local code exposure
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn local_code_is_exposed_exactly_once() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;

    // Nothing before gathering completes.
    assert!(host.poll_local_code().is_none());

    let codes = drive(&mut host).await;
    assert_eq!(
        codes.len(),
        1,
        "one code despite several gathering callbacks"
    );
    assert!(host.poll_local_code().is_none());
}

#[tokio::test]
async fn exposed_code_carries_gathered_candidates() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;
    let code = drive(&mut host).await.remove(0);

    let decoded = codec::decode(&code).unwrap();
    assert_eq!(decoded.kind, SdpType::Offer);
    assert!(decoded.sdp.contains("a=candidate:"));
}

#[tokio::test]
async fn local_code_on_demand_is_repeatable() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;
    let exposed = drive(&mut host).await.remove(0);

    assert_eq!(host.local_code().as_deref(), Some(exposed.as_str()));
    assert_eq!(host.local_code().as_deref(), Some(exposed.as_str()));
}

#[tokio::test]
async fn joiner_exposes_answer_after_applying_offer() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;
    let mut join = join_session(&connector).await;

    let offer = drive(&mut host).await.remove(0);
    join.apply_remote_code(&offer).await.unwrap();
    assert_eq!(join.state(), SessionState::Negotiating);

    let codes = drive(&mut join).await;
    assert_eq!(codes.len(), 1);
    assert_eq!(codec::decode(&codes[0]).unwrap().kind, SdpType::Answer);
}

#[tokio::test]
async fn closed_session_exposes_nothing() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;
    // Deliver the gathering events without polling.
    while let Some(event) = host.recv().await {
        host.observe(&event);
        if event == PeerEvent::IceGatheringStateChanged(IceGatheringState::Complete) {
            break;
        }
    }
    host.close().await;
    assert!(host.poll_local_code().is_none());
}

// ════════════════════════════════════════════════════════════════════
// Remote code validation
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn host_rejects_offer_code() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;
    let desc = SessionDescription::new(SdpType::Offer, "v=0\r\no=mock 9 0\r\n");
    let offer = codec::encode(&desc).unwrap();

    let err = host.apply_remote_code(&offer).await.unwrap_err();
    assert!(matches!(err, PeerGameError::PeerSetup(_)), "got {err:?}");
    assert_eq!(host.state(), SessionState::AwaitingRemote);
}

#[tokio::test]
async fn joiner_rejects_answer_code() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut join = join_session(&connector).await;
    let desc = SessionDescription::new(SdpType::Answer, "v=0\r\no=mock 9 0\r\n");
    let answer = codec::encode(&desc).unwrap();

    let err = join.apply_remote_code(&answer).await.unwrap_err();
    assert!(matches!(err, PeerGameError::PeerSetup(_)));
    assert!(join.local_description().is_none());
}

#[tokio::test]
async fn invalid_code_leaves_session_untouched() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;
    let offer_before = host.local_description().cloned();

    for garbage in ["", "   ", "G1!!!", "hello", "{\"type\":\"answer\"}"] {
        let err = host.apply_remote_code(garbage).await.unwrap_err();
        assert!(
            matches!(err, PeerGameError::InvalidCode(_)),
            "{garbage:?} gave {err:?}"
        );
    }
    assert_eq!(host.state(), SessionState::AwaitingRemote);
    assert_eq!(host.local_description().cloned(), offer_before);
    assert!(host.remote_description().is_none());
}

#[tokio::test]
async fn legacy_json_answer_is_accepted() {
    let network = MockNetwork::new();
    let connector = MockConnector::new(&network);
    let mut host = host_session(&connector).await;
    let mut join = join_session(&connector).await;

    let offer = drive(&mut host).await.remove(0);
    join.apply_remote_code(&offer).await.unwrap();
    drive(&mut join).await;

    let answer = join.local_description().unwrap();
    let legacy = serde_json::to_string(answer).unwrap();
    host.apply_remote_code(&legacy).await.unwrap();
    assert_eq!(host.state(), SessionState::Negotiating);
}

#[tokio::test]
async fn rejected_remote_description_keeps_awaiting() {
    let network = MockNetwork::new();
    let connector = MockConnector::new(&network);
    let mut host = host_session(&connector).await;
    let mut join = join_session(&connector).await;
    let offer = drive(&mut host).await.remove(0);

    network.set_reject_remote(true);
    let err = join.apply_remote_code(&offer).await.unwrap_err();
    assert!(matches!(err, PeerGameError::PeerSetup(_)));
    assert_eq!(join.state(), SessionState::AwaitingRemote);

    network.set_reject_remote(false);
    join.apply_remote_code(&offer).await.unwrap();
    assert_eq!(join.state(), SessionState::Negotiating);
}

#[tokio::test]
async fn second_remote_code_is_refused() {
    let network = MockNetwork::new();
    let connector = MockConnector::new(&network);
    let mut host = host_session(&connector).await;
    let mut join = join_session(&connector).await;
    let offer = drive(&mut host).await.remove(0);

    join.apply_remote_code(&offer).await.unwrap();
    let err = join.apply_remote_code(&offer).await.unwrap_err();
    assert!(matches!(err, PeerGameError::PeerSetup(_)));
    assert_eq!(join.state(), SessionState::Negotiating);
}

// ════════════════════════════════════════════════════════════════════
// Data channel
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn send_requires_open_channel() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;

    let err = host.send(&WireMessage::Reset).await.unwrap_err();
    assert!(matches!(err, PeerGameError::ChannelUnavailable));
}

#[tokio::test]
async fn frames_reach_the_other_side() {
    let network = MockNetwork::new();
    let (mut host, mut join) = connected_pair(&network).await;

    host.send(&WireMessage::roles(Role::Join)).await.unwrap();
    let event = join.recv().await.unwrap();
    let PeerEvent::DataChannelMessage(text) = event else {
        panic!("expected a frame, got {event:?}");
    };
    assert_eq!(
        WireMessage::parse(&text).unwrap(),
        WireMessage::roles(Role::Join)
    );
}

#[tokio::test]
async fn channel_error_and_close_are_tracked() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;

    host.observe(&PeerEvent::DataChannelOpen);
    assert_eq!(host.channel_state(), ChannelState::Open);
    assert_eq!(host.state(), SessionState::Connected);

    host.observe(&PeerEvent::DataChannelError("boom".into()));
    assert_eq!(host.channel_state(), ChannelState::Error);

    host.observe(&PeerEvent::DataChannelClose);
    assert_eq!(host.channel_state(), ChannelState::Closed);
    // A closed channel does not tear the session down by itself.
    assert_eq!(host.state(), SessionState::Connected);
}

#[tokio::test]
async fn close_notifies_peer_and_stops_events() {
    let network = MockNetwork::new();
    let (mut host, mut join) = connected_pair(&network).await;

    host.close().await;
    assert_eq!(host.state(), SessionState::Closed);
    assert_eq!(host.channel_state(), ChannelState::Closed);
    assert!(host.recv().await.is_none());
    assert!(host.send(&WireMessage::Reset).await.is_err());

    assert_eq!(join.recv().await, Some(PeerEvent::DataChannelClose));
    join.observe(&PeerEvent::DataChannelClose);
    assert_eq!(join.channel_state(), ChannelState::Closed);
}

#[tokio::test]
async fn close_is_idempotent() {
    let connector = MockConnector::new(&MockNetwork::new());
    let mut host = host_session(&connector).await;
    host.close().await;
    host.close().await;
    assert_eq!(host.state(), SessionState::Closed);
}
