//! Events a [`GameSession`](crate::GameSession) emits for the UI.

use std::fmt;

use crate::game::{Board, GameResult, Symbol};
use crate::peer::{ConnectionState, IceConnectionState};
use crate::protocol::Role;
use crate::session::ChannelState;

/// Status line shown above the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// No peer; both sides are played locally.
    Local,
    /// Waiting for a joiner to apply the host code.
    Hosting,
    /// Applying the host's code.
    Joining,
    /// A join link was opened without a code.
    JoinLinkMissingCode,
    /// A reset just happened.
    NewGame { my_symbol: Symbol },
    /// Game in progress; `mine` if the local participant moves next.
    Turn { turn: Symbol, mine: bool },
    /// The given symbol completed a line.
    Won(Symbol),
    /// Full board, no line.
    Draw,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("Local game. Click Host to create a shareable join link."),
            Self::Hosting => f.write_str("Hosting… waiting for peer."),
            Self::Joining => f.write_str("Joining… establishing session."),
            Self::JoinLinkMissingCode => f.write_str("Join link missing code."),
            Self::NewGame { my_symbol } => write!(f, "New game. You are {my_symbol}."),
            Self::Turn { turn, mine: true } => write!(f, "Turn: {turn} (Your move)"),
            Self::Turn { turn, mine: false } => write!(f, "Turn: {turn} (Waiting)"),
            Self::Won(winner) => write!(f, "{winner} wins!"),
            Self::Draw => f.write_str("Draw!"),
        }
    }
}

/// Short-lived user feedback (a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Data channel opened.
    Connected,
    /// Data channel closed.
    Disconnected,
    /// Data channel reported an error.
    ChannelError,
    /// The board was reset.
    GameReset,
    /// The joiner asked the host for a new game.
    RequestedNewGame,
    /// The host applied the joiner's accept code.
    AcceptCodeApplied,
    /// The host could not use the pasted accept code.
    InvalidAcceptCode,
    /// The joiner could not use the host code.
    HostCodeFailed,
    /// A join link carried no host code.
    MissingHostCode,
    /// The peer connection could not be created.
    PeerSetupFailed,
    /// Text reached the clipboard; the payload says what it was.
    Copied(&'static str),
    /// Neither clipboard path worked.
    CopyFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("Connected"),
            Self::Disconnected => f.write_str("Disconnected"),
            Self::ChannelError => f.write_str("Channel error"),
            Self::GameReset => f.write_str("Game reset"),
            Self::RequestedNewGame => f.write_str("Requested new game"),
            Self::AcceptCodeApplied => f.write_str("Accept Code applied"),
            Self::InvalidAcceptCode => f.write_str("Invalid Accept Code"),
            Self::HostCodeFailed => f.write_str("Failed to apply host code"),
            Self::MissingHostCode => f.write_str("Missing host code"),
            Self::PeerSetupFailed => f.write_str("Connection setup failed"),
            Self::Copied(what) => write!(f, "{what} copied"),
            Self::CopyFailed => f.write_str("Copy failed"),
        }
    }
}

/// Connection progress reported by the peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    /// ICE transport state changed.
    Ice(IceConnectionState),
    /// Aggregate connection state changed.
    Connection(ConnectionState),
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ice(state) => write!(f, "ICE: {state}"),
            Self::Connection(state) => write!(f, "Peer: {state}"),
        }
    }
}

/// Events emitted by a [`GameSession`](crate::GameSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// New status line.
    StatusChanged(Status),
    /// The board needs re-rendering.
    BoardChanged {
        board: Board,
        result: Option<GameResult>,
        /// Whether the local participant may click a cell.
        my_turn: bool,
    },
    /// Connection progress for the status bar.
    PeerStateChanged(PeerStatus),
    /// The data channel opened, closed or failed.
    ChannelStateChanged(ChannelState),
    /// The local session code is final and can be handed to the peer.
    LocalCodeReady {
        role: Role,
        code: String,
        /// Join link embedding `code` (host only, when a base URL is
        /// configured).
        join_link: Option<String>,
    },
    /// Toast for the user.
    Notice(Notice),
}
