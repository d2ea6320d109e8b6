#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for peer tic-tac-toe integration tests.
//!
//! Provides an in-memory peer network ([`MockNetwork`], [`MockConnector`],
//! [`MockPeer`]), a recording clipboard, and helpers for draining events and
//! driving two sessions until they go quiet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use peer_tictactoe::clipboard::Clipboard;
use peer_tictactoe::config::RtcConfig;
use peer_tictactoe::peer::{
    ConnectionState, DataChannelOptions, IceConnectionState, IceGatheringState, PeerConnection,
    PeerConnector, PeerEvent,
};
use peer_tictactoe::{
    GameEvent, GameSession, PeerGameError, SdpType, SessionDescription, WireMessage,
};
use tokio::sync::mpsc;

// ── MockNetwork ─────────────────────────────────────────────────────

struct PeerSlot {
    events: mpsc::UnboundedSender<PeerEvent>,
    link: Option<u32>,
}

#[derive(Default)]
struct NetworkInner {
    next_id: u32,
    peers: HashMap<u32, PeerSlot>,
    /// Every data channel frame, tagged with the sending peer.
    frames: Vec<(u32, String)>,
    fail_connect: bool,
    reject_remote: bool,
    trickled_candidates: usize,
}

/// A switchboard that links mock peers once the host applies an answer.
#[derive(Clone, Default)]
pub struct MockNetwork {
    inner: Arc<StdMutex<NetworkInner>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        let network = Self::default();
        network.inner.lock().unwrap().trickled_candidates = 2;
        network
    }

    /// Make the next `connect` calls fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.inner.lock().unwrap().fail_connect = fail;
    }

    /// Make `set_remote_description` reject everything.
    pub fn set_reject_remote(&self, reject: bool) {
        self.inner.lock().unwrap().reject_remote = reject;
    }

    /// Wire messages sent by peer `id`, in order.
    pub fn frames_from(&self, id: u32) -> Vec<WireMessage> {
        self.inner
            .lock()
            .unwrap()
            .frames
            .iter()
            .filter(|(from, _)| *from == id)
            .map(|(_, text)| WireMessage::parse(text).unwrap())
            .collect()
    }

    /// Whether peer `id` is still registered (not closed).
    pub fn is_open(&self, id: u32) -> bool {
        self.inner.lock().unwrap().peers.contains_key(&id)
    }

    /// Inject a raw frame as if the linked peer of `to` sent it.
    pub fn inject_frame(&self, to: u32, text: &str) {
        let inner = self.inner.lock().unwrap();
        let slot = inner.peers.get(&to).expect("peer registered");
        slot.events
            .send(PeerEvent::DataChannelMessage(text.to_string()))
            .unwrap();
    }

    /// Inject an arbitrary event into peer `to`.
    pub fn inject_event(&self, to: u32, event: PeerEvent) {
        let inner = self.inner.lock().unwrap();
        let slot = inner.peers.get(&to).expect("peer registered");
        slot.events.send(event).unwrap();
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Hands out [`MockPeer`]s on a shared [`MockNetwork`] and remembers their ids.
#[derive(Clone)]
pub struct MockConnector {
    network: MockNetwork,
    created: Arc<StdMutex<Vec<u32>>>,
}

impl MockConnector {
    pub fn new(network: &MockNetwork) -> Self {
        Self {
            network: network.clone(),
            created: Arc::new(StdMutex::new(Vec::new())),
        }
    }

    /// Id of the most recently created peer.
    pub fn last_peer(&self) -> u32 {
        let created = self.created.lock().unwrap();
        *created.last().expect("a peer was created")
    }

    pub fn peers_created(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl PeerConnector for MockConnector {
    type Connection = MockPeer;

    async fn connect(&self, config: &RtcConfig) -> Result<MockPeer, PeerGameError> {
        assert!(!config.ice_servers.is_empty());
        let mut inner = self.network.inner.lock().unwrap();
        if inner.fail_connect {
            return Err(PeerGameError::PeerSetup("connect refused".into()));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        inner.peers.insert(
            id,
            PeerSlot {
                events: events_tx.clone(),
                link: None,
            },
        );
        drop(inner);
        self.created.lock().unwrap().push(id);

        Ok(MockPeer {
            id,
            network: Arc::clone(&self.network.inner),
            events_tx,
            events_rx,
            local: None,
            remote: None,
            gathering: IceGatheringState::New,
            data_channel: None,
            closed: false,
        })
    }
}

// ── MockPeer ────────────────────────────────────────────────────────

/// An in-memory peer connection.
///
/// `recv` never blocks: it returns `None` when no event is queued, so
/// `GameSession::pump` returning `false` means "quiet for now". ICE gathering
/// advances as its events are pulled, like browser callbacks firing.
pub struct MockPeer {
    id: u32,
    network: Arc<StdMutex<NetworkInner>>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    events_rx: mpsc::UnboundedReceiver<PeerEvent>,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    gathering: IceGatheringState,
    data_channel: Option<DataChannelOptions>,
    closed: bool,
}

fn mock_sdp(id: u32, kind: SdpType) -> String {
    format!("v=0\r\no=mock {id} 0 IN IP4 127.0.0.1\r\ns=-\r\na=mock-{kind}\r\n")
}

fn peer_id_of(sdp: &str) -> Option<u32> {
    sdp.lines()
        .find_map(|line| line.strip_prefix("o=mock "))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|id| id.parse().ok())
}

impl MockPeer {
    fn push(&self, event: PeerEvent) {
        let _ = self.events_tx.send(event);
    }
}

#[async_trait]
impl PeerConnection for MockPeer {
    async fn create_data_channel(
        &mut self,
        options: &DataChannelOptions,
    ) -> Result<(), PeerGameError> {
        assert!(options.ordered, "game channel must be ordered");
        self.data_channel = Some(options.clone());
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, PeerGameError> {
        Ok(SessionDescription::new(
            SdpType::Offer,
            mock_sdp(self.id, SdpType::Offer),
        ))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription, PeerGameError> {
        match &self.remote {
            Some(remote) if remote.kind == SdpType::Offer => Ok(SessionDescription::new(
                SdpType::Answer,
                mock_sdp(self.id, SdpType::Answer),
            )),
            _ => Err(PeerGameError::PeerSetup("no remote offer".into())),
        }
    }

    async fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), PeerGameError> {
        self.local = Some(description);
        self.gathering = IceGatheringState::New;
        self.push(PeerEvent::IceGatheringStateChanged(
            IceGatheringState::Gathering,
        ));
        let trickled = self.network.lock().unwrap().trickled_candidates;
        for _ in 0..trickled {
            self.push(PeerEvent::IceCandidate);
        }
        self.push(PeerEvent::IceGatheringStateChanged(
            IceGatheringState::Complete,
        ));
        // End-of-candidates fires one more candidate callback.
        self.push(PeerEvent::IceCandidate);
        Ok(())
    }

    async fn set_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), PeerGameError> {
        let mut inner = self.network.lock().unwrap();
        if inner.reject_remote {
            return Err(PeerGameError::PeerSetup(
                "remote description rejected".into(),
            ));
        }
        let remote_id = peer_id_of(&description.sdp)
            .ok_or_else(|| PeerGameError::PeerSetup("unparseable SDP".into()))?;

        if description.kind == SdpType::Answer {
            if self.local.as_ref().map(|d| d.kind) != Some(SdpType::Offer) {
                return Err(PeerGameError::PeerSetup(
                    "answer without local offer".into(),
                ));
            }
            let Some(remote) = inner.peers.get_mut(&remote_id) else {
                return Err(PeerGameError::PeerSetup("unknown remote peer".into()));
            };
            remote.link = Some(self.id);
            let remote_events = remote.events.clone();
            if let Some(me) = inner.peers.get_mut(&self.id) {
                me.link = Some(remote_id);
            }
            drop(inner);

            for events in [&self.events_tx, &remote_events] {
                let _ = events.send(PeerEvent::IceConnectionStateChanged(
                    IceConnectionState::Connected,
                ));
                let _ = events.send(PeerEvent::ConnectionStateChanged(
                    ConnectionState::Connected,
                ));
                if self.data_channel.is_some() {
                    let _ = events.send(PeerEvent::DataChannelOpen);
                }
            }
        }

        self.remote = Some(description);
        Ok(())
    }

    fn local_description(&self) -> Option<&SessionDescription> {
        self.local.as_ref()
    }

    fn ice_gathering_state(&self) -> IceGatheringState {
        self.gathering
    }

    async fn send(&mut self, text: String) -> Result<(), PeerGameError> {
        let mut inner = self.network.lock().unwrap();
        let link = inner
            .peers
            .get(&self.id)
            .and_then(|slot| slot.link)
            .ok_or(PeerGameError::ChannelUnavailable)?;
        let target = inner
            .peers
            .get(&link)
            .map(|slot| slot.events.clone())
            .ok_or(PeerGameError::ChannelUnavailable)?;
        inner.frames.push((self.id, text.clone()));
        drop(inner);
        target
            .send(PeerEvent::DataChannelMessage(text))
            .map_err(|_| PeerGameError::ChannelUnavailable)
    }

    async fn recv(&mut self) -> Option<PeerEvent> {
        if self.closed {
            return None;
        }
        let event = self.events_rx.try_recv().ok()?;
        if let PeerEvent::IceGatheringStateChanged(state) = &event {
            self.gathering = *state;
            if *state == IceGatheringState::Complete {
                if let Some(local) = self.local.as_mut() {
                    local
                        .sdp
                        .push_str("a=candidate:1 1 udp 2122260223 10.0.0.1 50000 typ host\r\n");
                }
            }
        }
        Some(event)
    }

    async fn close(&mut self) -> Result<(), PeerGameError> {
        self.closed = true;
        let mut inner = self.network.lock().unwrap();
        if let Some(slot) = inner.peers.remove(&self.id) {
            if let Some(remote) = slot.link.and_then(|link| inner.peers.get(&link)) {
                let lost = PeerEvent::ConnectionStateChanged(ConnectionState::Disconnected);
                let _ = remote.events.send(PeerEvent::DataChannelClose);
                let _ = remote.events.send(lost);
            }
        }
        Ok(())
    }
}

// ── RecordingClipboard ──────────────────────────────────────────────

/// Clipboard that records what was copied, or refuses when `fail` is set.
#[derive(Clone, Default)]
pub struct RecordingClipboard {
    pub copied: Arc<StdMutex<Vec<String>>>,
    pub fail: bool,
}

#[async_trait]
impl Clipboard for RecordingClipboard {
    async fn write_text(&self, text: &str) -> Result<(), PeerGameError> {
        if self.fail {
            return Err(PeerGameError::Clipboard("permission denied".into()));
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Everything currently queued on an event receiver.
pub fn drain(rx: &mut mpsc::Receiver<GameEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Pump one session until its connection has nothing more to report.
pub async fn settle_one(session: &mut GameSession<MockConnector>) {
    while session.pump().await {}
}

/// Pump both sessions until neither has pending peer events.
pub async fn settle(a: &mut GameSession<MockConnector>, b: &mut GameSession<MockConnector>) {
    loop {
        let progressed_a = a.pump().await;
        let progressed_b = b.pump().await;
        if !progressed_a && !progressed_b {
            break;
        }
    }
}

/// The code carried by the first `LocalCodeReady` event in `events`.
pub fn local_code(events: &[GameEvent]) -> Option<String> {
    events.iter().find_map(|event| match event {
        GameEvent::LocalCodeReady { code, .. } => Some(code.clone()),
        _ => None,
    })
}

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
