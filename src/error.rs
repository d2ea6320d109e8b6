//! Error types for peer tic-tac-toe sessions.

use thiserror::Error;

/// A session code could not be decoded into a session description.
///
/// This is user-correctable (the code was mistyped, truncated, or came from
/// somewhere else) and never tears down an active session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid session code: {reason}")]
pub struct InvalidCode {
    /// Short description of why decoding failed.
    pub reason: String,
}

impl InvalidCode {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Reasons a move is rejected by the game state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The cell index is outside `0..9`.
    #[error("cell index {0} is out of range")]
    OutOfRange(usize),

    /// The cell already holds a symbol.
    #[error("cell {0} is already occupied")]
    CellOccupied(usize),

    /// The game has already been won or drawn.
    #[error("game is over")]
    GameOver,
}

/// Errors that can occur while negotiating or playing a peer session.
#[derive(Debug, Error)]
pub enum PeerGameError {
    /// A pasted or embedded session code was malformed.
    #[error(transparent)]
    InvalidCode(#[from] InvalidCode),

    /// The game state machine rejected a move.
    #[error("illegal move: {0}")]
    Move(#[from] MoveError),

    /// A local move was attempted while it is the peer's turn.
    #[error("not your turn")]
    NotYourTurn,

    /// A wire message was sent while the data channel is not open.
    #[error("data channel is not open")]
    ChannelUnavailable,

    /// The peer connection rejected an operation (description apply,
    /// offer/answer creation, data channel setup).
    #[error("peer setup failed: {0}")]
    PeerSetup(String),

    /// An action that needs a hosting or joining session was attempted
    /// without one.
    #[error("no active session")]
    NoActiveSession,

    /// The clipboard capability could not take the text.
    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// Failed to serialize or deserialize a wire message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A specialized [`Result`] type for peer tic-tac-toe operations.
pub type Result<T> = std::result::Result<T, PeerGameError>;
