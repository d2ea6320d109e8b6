//! Signaling session: the host/join negotiation state machine around one
//! peer connection.
//!
//! ```text
//! host: Idle → Creating → AwaitingRemote ──apply answer──→ Negotiating → Connected
//! join: Idle → Creating → AwaitingRemote ──apply offer───→ Negotiating → Connected
//!                                                        (any) ──close──→ Closed
//! ```
//!
//! The local code is exposed once ICE gathering completes. Gathering can
//! report completion more than once (every trickled candidate re-checks it),
//! so [`SignalingSession::poll_local_code`] hands the code out exactly once
//! per local description.

use std::fmt;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::{self, SdpType, SessionDescription};
use crate::error::{PeerGameError, Result};
use crate::peer::{DataChannelOptions, IceGatheringState, PeerConnection, PeerEvent};
use crate::protocol::{Role, WireMessage};

/// Negotiation progress of a [`SignalingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing started.
    Idle,
    /// Setting up the connection (and, for the host, the offer).
    Creating,
    /// Waiting for the peer's code to be pasted or embedded.
    AwaitingRemote,
    /// Both descriptions applied; waiting for the data channel.
    Negotiating,
    /// The data channel is open.
    Connected,
    /// Torn down; no further events.
    Closed,
}

/// State of the game data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not open yet.
    Connecting,
    /// Frames can be sent.
    Open,
    /// Closed by either side.
    Closed,
    /// The channel reported an error.
    Error,
}

/// One hosting or joining attempt over a single peer connection.
pub struct SignalingSession<P> {
    id: Uuid,
    role: Role,
    pc: P,
    state: SessionState,
    channel: ChannelState,
    remote: Option<SessionDescription>,
    local_code_exposed: bool,
}

impl<P: PeerConnection> SignalingSession<P> {
    fn new(role: Role, pc: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            pc,
            state: SessionState::Idle,
            channel: ChannelState::Connecting,
            remote: None,
            local_code_exposed: false,
        }
    }

    /// Start hosting: create an ordered data channel and an offer.
    ///
    /// # Errors
    ///
    /// [`PeerGameError::PeerSetup`] if the connection refuses; the connection
    /// is closed before returning.
    pub async fn host(pc: P, channel_label: &str) -> Result<Self> {
        let mut session = Self::new(Role::Host, pc);
        session.transition(SessionState::Creating);

        let options = DataChannelOptions {
            label: channel_label.to_string(),
            ordered: true,
        };
        if let Err(e) = session.create_offer(&options).await {
            session.close().await;
            return Err(e);
        }

        session.transition(SessionState::AwaitingRemote);
        Ok(session)
    }

    /// Start joining. The offer arrives later through
    /// [`apply_remote_code`](Self::apply_remote_code).
    pub fn join(pc: P) -> Self {
        let mut session = Self::new(Role::Join, pc);
        session.transition(SessionState::Creating);
        session.transition(SessionState::AwaitingRemote);
        session
    }

    async fn create_offer(&mut self, options: &DataChannelOptions) -> Result<()> {
        self.pc.create_data_channel(options).await?;
        let offer = self.pc.create_offer().await?;
        self.pc.set_local_description(offer).await?;
        self.local_code_exposed = false;
        Ok(())
    }

    /// Session identifier, used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Host or join.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Negotiation progress.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Data channel state.
    pub fn channel_state(&self) -> ChannelState {
        self.channel
    }

    /// The applied remote description, if any.
    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote.as_ref()
    }

    /// The current local description, if any.
    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.pc.local_description()
    }

    /// Decode the peer's code and apply it.
    ///
    /// The host expects an answer, the joiner an offer (to which it then
    /// answers). Failures leave the session as it was so the user can paste
    /// again.
    ///
    /// # Errors
    ///
    /// [`PeerGameError::InvalidCode`] for an undecodable code,
    /// [`PeerGameError::PeerSetup`] for a description of the wrong type, a
    /// session past the point of accepting one, or a rejecting connection.
    pub async fn apply_remote_code(&mut self, token: &str) -> Result<()> {
        let description = codec::decode(token)?;
        self.apply_remote_description(description).await
    }

    /// Apply an already decoded remote description.
    ///
    /// # Errors
    ///
    /// See [`apply_remote_code`](Self::apply_remote_code).
    pub async fn apply_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<()> {
        if self.state != SessionState::AwaitingRemote {
            return Err(PeerGameError::PeerSetup(format!(
                "cannot apply a remote description while {:?}",
                self.state
            )));
        }
        let expected = self.expected_remote();
        if description.kind != expected {
            return Err(PeerGameError::PeerSetup(format!(
                "expected an {expected} code, got an {}",
                description.kind
            )));
        }

        self.pc.set_remote_description(description.clone()).await?;
        if self.role == Role::Join {
            let answer = self.pc.create_answer().await?;
            self.pc.set_local_description(answer).await?;
            self.local_code_exposed = false;
        }

        self.remote = Some(description);
        self.transition(SessionState::Negotiating);
        Ok(())
    }

    /// The encoded local code, the first time it is final.
    ///
    /// Returns `Some` once ICE gathering has completed for the current local
    /// description and `None` on every later call, however many gathering
    /// callbacks fire.
    pub fn poll_local_code(&mut self) -> Option<String> {
        if self.local_code_exposed || self.state == SessionState::Closed {
            return None;
        }
        if self.pc.ice_gathering_state() != IceGatheringState::Complete {
            return None;
        }
        let code = self.local_code()?;
        self.local_code_exposed = true;
        debug!(session = %self.id, role = %self.role, "local code ready");
        Some(code)
    }

    /// Encode the current local description on demand (e.g. a "copy code"
    /// button). `None` until the role's own description exists.
    pub fn local_code(&self) -> Option<String> {
        let description = self
            .pc
            .local_description()
            .filter(|d| d.kind == self.expected_local())?;
        match codec::encode(description) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(session = %self.id, "failed to encode local description: {e}");
                None
            }
        }
    }

    /// Track data channel lifecycle events.
    pub fn observe(&mut self, event: &PeerEvent) {
        match event {
            PeerEvent::DataChannelOpen => {
                self.channel = ChannelState::Open;
                if self.state != SessionState::Closed {
                    self.transition(SessionState::Connected);
                }
            }
            PeerEvent::DataChannelClose => self.channel = ChannelState::Closed,
            PeerEvent::DataChannelError(_) => self.channel = ChannelState::Error,
            _ => {}
        }
    }

    /// Send one wire message over the data channel.
    ///
    /// # Errors
    ///
    /// [`PeerGameError::ChannelUnavailable`] unless the channel is open.
    pub async fn send(&mut self, message: &WireMessage) -> Result<()> {
        if self.channel != ChannelState::Open {
            return Err(PeerGameError::ChannelUnavailable);
        }
        let json = message.to_json()?;
        debug!(session = %self.id, "sending {json}");
        self.pc.send(json).await
    }

    /// Next event from the underlying connection.
    pub async fn recv(&mut self) -> Option<PeerEvent> {
        if self.state == SessionState::Closed {
            return None;
        }
        self.pc.recv().await
    }

    /// Close the data channel and connection. Close failures are logged and
    /// otherwise ignored.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(e) = self.pc.close().await {
            warn!(session = %self.id, "peer connection close failed: {e}");
        }
        self.channel = ChannelState::Closed;
        self.transition(SessionState::Closed);
    }

    fn expected_remote(&self) -> SdpType {
        match self.role {
            Role::Host => SdpType::Answer,
            Role::Join => SdpType::Offer,
        }
    }

    fn expected_local(&self) -> SdpType {
        match self.role {
            Role::Host => SdpType::Offer,
            Role::Join => SdpType::Answer,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(session = %self.id, role = %self.role, "session {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

impl<P> fmt::Debug for SignalingSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalingSession")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("state", &self.state)
            .field("channel", &self.channel)
            .field("local_code_exposed", &self.local_code_exposed)
            .finish()
    }
}
