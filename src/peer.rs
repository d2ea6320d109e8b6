//! Peer-connection capability consumed by the signaling session.
//!
//! The WebRTC stack itself is an external collaborator. Implement
//! [`PeerConnector`] and [`PeerConnection`] over whatever provides it (a
//! browser `RTCPeerConnection` through `wasm-bindgen`, a native WebRTC crate,
//! or an in-memory double in tests).
//!
//! Browser callbacks (`onicecandidate`, `onicegatheringstatechange`,
//! `ondatachannel`, `onopen`, `onmessage`, ...) are surfaced as
//! [`PeerEvent`]s pulled through [`PeerConnection::recv`].
//!
//! # Implementing a peer connection
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use peer_tictactoe::codec::SessionDescription;
//! use peer_tictactoe::error::PeerGameError;
//! use peer_tictactoe::peer::{DataChannelOptions, IceGatheringState, PeerConnection, PeerEvent};
//!
//! struct MyPeer { /* ... */ }
//!
//! #[async_trait]
//! impl PeerConnection for MyPeer {
//!     async fn create_data_channel(
//!         &mut self,
//!         options: &DataChannelOptions,
//!     ) -> Result<(), PeerGameError> {
//!         unimplemented!()
//!     }
//!     async fn create_offer(&mut self) -> Result<SessionDescription, PeerGameError> {
//!         unimplemented!()
//!     }
//!     async fn create_answer(&mut self) -> Result<SessionDescription, PeerGameError> {
//!         unimplemented!()
//!     }
//!     async fn set_local_description(
//!         &mut self,
//!         description: SessionDescription,
//!     ) -> Result<(), PeerGameError> {
//!         unimplemented!()
//!     }
//!     async fn set_remote_description(
//!         &mut self,
//!         description: SessionDescription,
//!     ) -> Result<(), PeerGameError> {
//!         unimplemented!()
//!     }
//!     fn local_description(&self) -> Option<&SessionDescription> {
//!         unimplemented!()
//!     }
//!     fn ice_gathering_state(&self) -> IceGatheringState {
//!         unimplemented!()
//!     }
//!     async fn send(&mut self, text: String) -> Result<(), PeerGameError> {
//!         unimplemented!()
//!     }
//!     async fn recv(&mut self) -> Option<PeerEvent> {
//!         unimplemented!()
//!     }
//!     async fn close(&mut self) -> Result<(), PeerGameError> {
//!         unimplemented!()
//!     }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;

use crate::codec::SessionDescription;
use crate::config::RtcConfig;
use crate::error::PeerGameError;

/// Progress of local ICE candidate gathering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceGatheringState {
    /// No description applied yet.
    New,
    /// Candidates are being collected.
    Gathering,
    /// All candidates are folded into the local description; it is final.
    Complete,
}

/// ICE transport state of the connection (`iceConnectionState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    /// Not started.
    New,
    /// Checking candidate pairs.
    Checking,
    /// A usable pair was found.
    Connected,
    /// Checking finished.
    Completed,
    /// No pair works.
    Failed,
    /// Connectivity was lost.
    Disconnected,
    /// Shut down.
    Closed,
}

impl fmt::Display for IceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Checking => "checking",
            Self::Connected => "connected",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
        })
    }
}

/// Aggregate connection state (`connectionState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started.
    New,
    /// Establishing transports.
    Connecting,
    /// Transports are up.
    Connected,
    /// A transport lost connectivity.
    Disconnected,
    /// A transport failed.
    Failed,
    /// Shut down.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        })
    }
}

/// Something the peer connection reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A local ICE candidate trickled in.
    IceCandidate,
    /// Local gathering progressed.
    IceGatheringStateChanged(IceGatheringState),
    /// ICE transport state changed.
    IceConnectionStateChanged(IceConnectionState),
    /// Aggregate connection state changed.
    ConnectionStateChanged(ConnectionState),
    /// The data channel (created locally or announced by the remote) opened.
    DataChannelOpen,
    /// The data channel closed.
    DataChannelClose,
    /// The data channel failed.
    DataChannelError(String),
    /// One text frame from the remote peer.
    DataChannelMessage(String),
}

/// Data channel parameters requested by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChannelOptions {
    /// Channel label; both peers see it.
    pub label: String,
    /// Request in-order delivery. The sync protocol relies on it.
    pub ordered: bool,
}

/// A single peer connection.
///
/// # Cancel Safety
///
/// [`recv`](PeerConnection::recv) **MUST** be cancel-safe: a cancelled call
/// must not lose an event. Channel-backed implementations are naturally
/// cancel-safe.
#[async_trait]
pub trait PeerConnection: Send + 'static {
    /// Create the (host-initiated) data channel.
    async fn create_data_channel(
        &mut self,
        options: &DataChannelOptions,
    ) -> Result<(), PeerGameError>;

    /// Create an offer for the data channel created earlier.
    async fn create_offer(&mut self) -> Result<SessionDescription, PeerGameError>;

    /// Create an answer to the applied remote offer.
    async fn create_answer(&mut self) -> Result<SessionDescription, PeerGameError>;

    /// Apply a locally created description. Starts ICE gathering.
    async fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), PeerGameError>;

    /// Apply the peer's description.
    ///
    /// # Errors
    ///
    /// [`PeerGameError::PeerSetup`] if the stack rejects it.
    async fn set_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), PeerGameError>;

    /// The current local description, including every candidate gathered so
    /// far.
    fn local_description(&self) -> Option<&SessionDescription>;

    /// Progress of local ICE gathering.
    fn ice_gathering_state(&self) -> IceGatheringState;

    /// Send one text frame over the data channel.
    async fn send(&mut self, text: String) -> Result<(), PeerGameError>;

    /// Next event from the connection. `None` once the connection is gone.
    async fn recv(&mut self) -> Option<PeerEvent>;

    /// Close the data channel and the connection.
    async fn close(&mut self) -> Result<(), PeerGameError>;
}

/// Factory for peer connections.
#[async_trait]
pub trait PeerConnector: Send + Sync + 'static {
    /// The connection type this connector produces.
    type Connection: PeerConnection;

    /// Create a fresh connection configured with `config`'s ICE servers.
    async fn connect(&self, config: &RtcConfig) -> Result<Self::Connection, PeerGameError>;
}
