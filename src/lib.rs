//! # Peer Tic-Tac-Toe
//!
//! Two-player tic-tac-toe over a peer-to-peer data channel, negotiated
//! without a signaling server: the players swap a pair of copy-pasteable
//! session codes (host offer, joiner answer) out of band.
//!
//! ## Features
//!
//! - **Session codes**: [`codec`] packs an SDP offer/answer into a short
//!   `G1` (gzip) or `G0` (plain) base64 token and still reads legacy JSON codes
//! - **Signaling state machine**: [`SignalingSession`] drives one host or
//!   join negotiation and exposes the local code exactly once
//! - **Host-authoritative sync**: [`sync::apply_message`] applies inbound
//!   [`WireMessage`]s; only the host resets and assigns sides
//! - **Stack-agnostic**: implement [`PeerConnector`] / [`PeerConnection`]
//!   for any WebRTC stack
//! - **Event-driven**: a [`GameSession`] emits typed [`GameEvent`]s for the UI
//!
//! ## Cargo features
//!
//! - `gzip` (default): produce and accept compressed `G1` codes

pub mod clipboard;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod game;
pub mod link;
pub mod orchestrator;
pub mod peer;
pub mod protocol;
pub mod session;
pub mod sync;

// Re-export primary types for ergonomic imports.
pub use codec::{SdpType, SessionDescription};
pub use config::SessionConfig;
pub use error::{InvalidCode, MoveError, PeerGameError};
pub use event::{GameEvent, Notice, Status};
pub use game::{GameState, Symbol};
pub use orchestrator::GameSession;
pub use peer::{PeerConnection, PeerConnector, PeerEvent};
pub use protocol::{Role, WireMessage};
pub use session::{ChannelState, SessionState, SignalingSession};
