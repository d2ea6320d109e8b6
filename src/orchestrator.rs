//! End-to-end host/join flow.
//!
//! [`GameSession`] owns the single active [`SignalingSession`] and the
//! [`GameState`], and is the only thing that mutates them. UI actions call its
//! public methods; peer connection events are pulled with
//! [`GameSession::next_peer_event`] and fed back through
//! [`GameSession::handle_peer_event`] (or both at once with
//! [`GameSession::pump`]). Everything the UI needs to render arrives on the
//! bounded [`GameEvent`] channel returned from [`GameSession::new`].
//!
//! # Example
//!
//! ```rust,ignore
//! let (mut host, mut events) = GameSession::new(connector, SessionConfig::new());
//! host.start_hosting().await?;
//!
//! while host.pump().await {
//!     while let Ok(event) = events.try_recv() {
//!         match event {
//!             GameEvent::LocalCodeReady { code, .. } => show(code),
//!             GameEvent::BoardChanged { board, .. } => render(board),
//!             _ => {}
//!         }
//!     }
//! }
//! ```

use std::fmt;

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::clipboard::{copy_with_fallback, Clipboard};
use crate::config::SessionConfig;
use crate::error::{MoveError, PeerGameError, Result};
use crate::event::{GameEvent, Notice, PeerStatus, Status};
use crate::game::{GameState, MoveOutcome, Symbol};
use crate::link::{build_join_link, JoinRequest};
use crate::peer::{PeerConnector, PeerEvent};
use crate::protocol::{Role, WireMessage};
use crate::session::{ChannelState, SessionState, SignalingSession};
use crate::sync::{self, SyncOutcome};

/// Owner of one participant's game and (at most one) peer session.
pub struct GameSession<C: PeerConnector> {
    connector: C,
    config: SessionConfig,
    rtc: Option<SignalingSession<C::Connection>>,
    game: GameState,
    event_tx: mpsc::Sender<GameEvent>,
    clipboard: Option<Box<dyn Clipboard>>,
}

impl<C: PeerConnector> GameSession<C> {
    /// Create a local (peerless) game and the receiver for its events.
    ///
    /// The initial board and [`Status::Local`] are emitted right away.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn new(connector: C, config: SessionConfig) -> (Self, mpsc::Receiver<GameEvent>) {
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let session = Self {
            connector,
            config,
            rtc: None,
            game: GameState::new(),
            event_tx,
            clipboard: None,
        };
        session.emit_board();
        session.emit(GameEvent::StatusChanged(Status::Local));
        (session, event_rx)
    }

    /// Install the clipboard used to hand out codes and join links.
    pub fn set_clipboard(&mut self, clipboard: impl Clipboard) {
        self.clipboard = Some(Box::new(clipboard));
    }

    // ── Public actions ──────────────────────────────────────────────

    /// Tear down any active session and start hosting a new one.
    ///
    /// The offer code is announced with [`GameEvent::LocalCodeReady`] once
    /// ICE gathering completes.
    ///
    /// # Errors
    ///
    /// [`PeerGameError::PeerSetup`] if the connection or offer cannot be
    /// created. The game is left without a session.
    pub async fn start_hosting(&mut self) -> Result<()> {
        self.teardown().await;

        let session = match self.connect_host().await {
            Ok(session) => session,
            Err(e) => {
                warn!("failed to start hosting: {e}");
                self.emit(GameEvent::Notice(Notice::PeerSetupFailed));
                return Err(e);
            }
        };
        debug!(session = %session.id(), "hosting");
        self.rtc = Some(session);

        self.game.clear();
        self.emit_board();
        self.emit(GameEvent::StatusChanged(Status::Hosting));
        // Some stacks finish gathering before the first event is pulled.
        self.expose_local_code().await;
        Ok(())
    }

    /// Tear down any active session and start joining. The host's code is
    /// applied afterwards with [`apply_remote_code`](Self::apply_remote_code).
    ///
    /// # Errors
    ///
    /// [`PeerGameError::PeerSetup`] if the connection cannot be created.
    pub async fn start_joining(&mut self) -> Result<()> {
        self.teardown().await;

        let pc = match self.connector.connect(&self.config.rtc).await {
            Ok(pc) => pc,
            Err(e) => {
                warn!("failed to start joining: {e}");
                self.emit(GameEvent::Notice(Notice::PeerSetupFailed));
                return Err(e);
            }
        };
        let session = SignalingSession::join(pc);
        debug!(session = %session.id(), "joining");
        self.rtc = Some(session);

        self.game.clear();
        self.emit_board();
        self.emit(GameEvent::StatusChanged(Status::Joining));
        Ok(())
    }

    /// Auto-join from a page query string (`?join=1&code=<token>`).
    ///
    /// Returns `Ok(false)` without doing anything unless the query asks to
    /// join. A join link without a code starts the join flow and reports the
    /// missing code.
    ///
    /// # Errors
    ///
    /// Errors from [`start_joining`](Self::start_joining) and
    /// [`apply_remote_code`](Self::apply_remote_code).
    pub async fn join_from_query(&mut self, query: &str) -> Result<bool> {
        let Some(request) = JoinRequest::from_query(query) else {
            return Ok(false);
        };
        self.start_joining().await?;

        match request.code {
            Some(code) => self.apply_remote_code(&code).await?,
            None => {
                self.emit(GameEvent::StatusChanged(Status::JoinLinkMissingCode));
                self.emit(GameEvent::Notice(Notice::MissingHostCode));
            }
        }
        Ok(true)
    }

    /// Apply the code the peer handed over: the joiner's accept code on the
    /// host, the host's offer code on the joiner.
    ///
    /// Failures are reported with a [`Notice`] and leave the session in place
    /// so the user can try another code.
    ///
    /// # Errors
    ///
    /// [`PeerGameError::NoActiveSession`], [`PeerGameError::InvalidCode`] or
    /// [`PeerGameError::PeerSetup`].
    pub async fn apply_remote_code(&mut self, token: &str) -> Result<()> {
        let rtc = self.rtc.as_mut().ok_or(PeerGameError::NoActiveSession)?;
        let role = rtc.role();

        if let Err(e) = rtc.apply_remote_code(token).await {
            warn!(session = %rtc.id(), "failed to apply remote code: {e}");
            let notice = match role {
                Role::Host => Notice::InvalidAcceptCode,
                Role::Join => Notice::HostCodeFailed,
            };
            self.emit(GameEvent::Notice(notice));
            return Err(e);
        }

        if role == Role::Host {
            self.emit(GameEvent::Notice(Notice::AcceptCodeApplied));
        }
        self.expose_local_code().await;
        Ok(())
    }

    /// Place the local participant's mark at `idx` and tell the peer.
    ///
    /// # Errors
    ///
    /// [`PeerGameError::Move`] for an illegal move and
    /// [`PeerGameError::NotYourTurn`] while waiting for the peer. The state is
    /// untouched on error.
    pub async fn make_move(&mut self, idx: usize) -> Result<MoveOutcome> {
        if self.game.over() {
            return Err(MoveError::GameOver.into());
        }
        if !self.game.is_my_turn(self.rtc.is_some()) {
            return Err(PeerGameError::NotYourTurn);
        }

        let sym = self.game.turn();
        let outcome = self.game.apply_move(idx, sym)?;
        self.send(WireMessage::mark(idx, sym)).await;
        self.emit_move_outcome(outcome);
        Ok(outcome)
    }

    /// Start a new game.
    ///
    /// Without a peer the board resets locally with the local participant as
    /// X. The host resets for both sides with a fresh side assignment. The
    /// joiner can only ask the host to do so.
    pub async fn request_new_game(&mut self) {
        match self.role() {
            None => {
                self.game.reset_with(|| Symbol::X);
                self.emit_reset();
            }
            Some(Role::Host) => self.host_reset().await,
            Some(Role::Join) => {
                self.send(WireMessage::RequestReset).await;
                self.emit(GameEvent::Notice(Notice::RequestedNewGame));
            }
        }
    }

    /// Copy the local code (join link for the host, accept code for the
    /// joiner) to the clipboard again, e.g. from a "copy" button.
    ///
    /// Returns the text handed out, or `None` while the code is not ready.
    /// Without an installed clipboard the text is only returned.
    ///
    /// # Errors
    ///
    /// [`PeerGameError::NoActiveSession`] without a session.
    pub async fn copy_local_code(&mut self) -> Result<Option<String>> {
        let rtc = self.rtc.as_ref().ok_or(PeerGameError::NoActiveSession)?;
        let role = rtc.role();
        let Some(code) = rtc.local_code() else {
            return Ok(None);
        };
        let (text, _) = self.shareable(role, &code);
        self.copy(role, &text).await;
        Ok(Some(text))
    }

    /// Close the active session, if any. Also the page-unload hook.
    pub async fn disconnect(&mut self) {
        if self.teardown().await {
            self.emit(GameEvent::ChannelStateChanged(ChannelState::Closed));
        }
    }

    // ── Peer events ─────────────────────────────────────────────────

    /// Wait for the next event from the active session's connection.
    ///
    /// Returns `None` immediately when there is no session, and once the
    /// connection stops producing events.
    pub async fn next_peer_event(&mut self) -> Option<PeerEvent> {
        match self.rtc.as_mut() {
            Some(rtc) => rtc.recv().await,
            None => None,
        }
    }

    /// React to one peer connection event.
    pub async fn handle_peer_event(&mut self, event: PeerEvent) {
        let Some(rtc) = self.rtc.as_mut() else {
            debug!("ignoring peer event without a session: {event:?}");
            return;
        };
        rtc.observe(&event);
        let role = rtc.role();

        match event {
            PeerEvent::IceCandidate | PeerEvent::IceGatheringStateChanged(_) => {
                self.expose_local_code().await;
            }
            PeerEvent::IceConnectionStateChanged(state) => {
                self.emit(GameEvent::PeerStateChanged(PeerStatus::Ice(state)));
            }
            PeerEvent::ConnectionStateChanged(state) => {
                self.emit(GameEvent::PeerStateChanged(PeerStatus::Connection(state)));
            }
            PeerEvent::DataChannelOpen => {
                self.emit(GameEvent::ChannelStateChanged(ChannelState::Open));
                self.emit(GameEvent::Notice(Notice::Connected));
                if role == Role::Host {
                    self.host_reset().await;
                }
                self.emit_turn_status();
            }
            PeerEvent::DataChannelClose => {
                self.emit(GameEvent::ChannelStateChanged(ChannelState::Closed));
                self.emit(GameEvent::Notice(Notice::Disconnected));
            }
            PeerEvent::DataChannelError(reason) => {
                warn!("data channel error: {reason}");
                self.emit(GameEvent::ChannelStateChanged(ChannelState::Error));
                self.emit(GameEvent::Notice(Notice::ChannelError));
            }
            PeerEvent::DataChannelMessage(text) => self.handle_frame(role, &text).await,
        }
    }

    /// Pull and handle one peer event. Returns `false` when there was none.
    pub async fn pump(&mut self) -> bool {
        match self.next_peer_event().await {
            Some(event) => {
                self.handle_peer_event(event).await;
                true
            }
            None => false,
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    /// The local game state.
    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Role of the active session; `None` for a local game.
    pub fn role(&self) -> Option<Role> {
        self.rtc.as_ref().map(SignalingSession::role)
    }

    /// The active signaling session, if any.
    pub fn session(&self) -> Option<&SignalingSession<C::Connection>> {
        self.rtc.as_ref()
    }

    /// Negotiation state of the active session.
    pub fn session_state(&self) -> Option<SessionState> {
        self.rtc.as_ref().map(SignalingSession::state)
    }

    /// Data channel state of the active session.
    pub fn channel_state(&self) -> Option<ChannelState> {
        self.rtc.as_ref().map(SignalingSession::channel_state)
    }

    /// Whether the local participant may move now.
    pub fn is_my_turn(&self) -> bool {
        self.game.is_my_turn(self.rtc.is_some())
    }

    // ── Internal helpers ────────────────────────────────────────────

    async fn connect_host(&self) -> Result<SignalingSession<C::Connection>> {
        let pc = self.connector.connect(&self.config.rtc).await?;
        SignalingSession::host(pc, &self.config.channel_label).await
    }

    /// Close and drop the active session. Returns whether there was one.
    async fn teardown(&mut self) -> bool {
        match self.rtc.take() {
            Some(mut rtc) => {
                debug!(session = %rtc.id(), "tearing down session");
                rtc.close().await;
                true
            }
            None => false,
        }
    }

    async fn handle_frame(&mut self, role: Role, text: &str) {
        let message = match WireMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("dropping unrecognized frame: {e} (raw: {text})");
                return;
            }
        };
        if message.origin() == Some(role) {
            debug!("{role} received {message:?}, which only the other side sends");
        }

        match sync::apply_message(&mut self.game, role, &message) {
            SyncOutcome::Ignored => {}
            SyncOutcome::Moved(outcome) => self.emit_move_outcome(outcome),
            SyncOutcome::Reset => self.emit_reset(),
            SyncOutcome::RolesAssigned(symbol) => {
                debug!("assigned {symbol}");
                self.emit_board();
            }
            SyncOutcome::ResetRequested => self.host_reset().await,
        }
    }

    /// Host-authoritative reset: pick sides, tell the peer, clear the board.
    async fn host_reset(&mut self) {
        let host_symbol = self.config.host_symbol.unwrap_or_else(random_symbol);
        self.game.reset_with(|| host_symbol);

        let x_role = match host_symbol {
            Symbol::X => Role::Host,
            Symbol::O => Role::Join,
        };
        self.send(WireMessage::roles(x_role)).await;
        self.emit_reset();
        self.send(WireMessage::Reset).await;
    }

    /// Send to the peer; dropped (not queued) while the channel is closed.
    async fn send(&mut self, message: WireMessage) {
        let Some(rtc) = self.rtc.as_mut() else {
            return;
        };
        match rtc.send(&message).await {
            Ok(()) => {}
            Err(PeerGameError::ChannelUnavailable) => {
                debug!("channel not open, dropping {message:?}");
            }
            Err(e) => warn!("failed to send {message:?}: {e}"),
        }
    }

    async fn expose_local_code(&mut self) {
        let Some(rtc) = self.rtc.as_mut() else {
            return;
        };
        let Some(code) = rtc.poll_local_code() else {
            return;
        };
        let role = rtc.role();

        let (text, join_link) = self.shareable(role, &code);
        if role == Role::Host {
            self.copy(role, &text).await;
        }
        self.emit(GameEvent::LocalCodeReady {
            role,
            code,
            join_link,
        });
    }

    /// Text to hand to the peer for `code`, plus the join link if one was
    /// built.
    fn shareable(&self, role: Role, code: &str) -> (String, Option<String>) {
        let join_link = match role {
            Role::Host => self
                .config
                .join_base_url
                .as_deref()
                .map(|base| build_join_link(base, Some(code))),
            Role::Join => None,
        };
        let text = join_link.clone().unwrap_or_else(|| code.to_string());
        (text, join_link)
    }

    async fn copy(&self, role: Role, text: &str) {
        let Some(clipboard) = self.clipboard.as_deref() else {
            return;
        };
        let notice = match copy_with_fallback(clipboard, text).await {
            Ok(()) => Notice::Copied(match role {
                Role::Host if self.config.join_base_url.is_some() => "Join link",
                Role::Host => "Host code",
                Role::Join => "Accept Code",
            }),
            Err(e) => {
                warn!("copy failed: {e}");
                Notice::CopyFailed
            }
        };
        self.emit(GameEvent::Notice(notice));
    }

    fn emit_move_outcome(&self, outcome: MoveOutcome) {
        self.emit_board();
        match outcome {
            MoveOutcome::Finished(result) => {
                let status = match result.winner() {
                    Some(winner) => Status::Won(winner),
                    None => Status::Draw,
                };
                self.emit(GameEvent::StatusChanged(status));
            }
            MoveOutcome::Continue { .. } => self.emit_turn_status(),
        }
    }

    fn emit_reset(&self) {
        self.emit_board();
        self.emit(GameEvent::StatusChanged(Status::NewGame {
            my_symbol: self.game.my_symbol(),
        }));
        self.emit(GameEvent::Notice(Notice::GameReset));
    }

    fn emit_turn_status(&self) {
        if self.game.over() {
            return;
        }
        self.emit(GameEvent::StatusChanged(Status::Turn {
            turn: self.game.turn(),
            mine: self.is_my_turn(),
        }));
    }

    fn emit_board(&self) {
        self.emit(GameEvent::BoardChanged {
            board: *self.game.board(),
            result: self.game.result(),
            my_turn: self.is_my_turn(),
        });
    }

    /// Emit an event. If the channel is full, log a warning and drop the
    /// event rather than stall the session.
    fn emit(&self, event: GameEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("event channel full, dropping event: {dropped:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event channel closed, receiver dropped");
            }
        }
    }
}

fn random_symbol() -> Symbol {
    if rand::rng().random_bool(0.5) {
        Symbol::X
    } else {
        Symbol::O
    }
}

impl<C: PeerConnector> fmt::Debug for GameSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("session", &self.rtc)
            .field("game", &self.game)
            .field("has_clipboard", &self.clipboard.is_some())
            .finish()
    }
}
