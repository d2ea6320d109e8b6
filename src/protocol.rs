//! Wire messages exchanged over the data channel.
//!
//! Each data channel `send` carries exactly one JSON-serialized
//! [`WireMessage`], e.g.:
//!
//! ```json
//! {"type":"move","idx":4,"sym":"X"}
//! {"type":"reset"}
//! {"type":"request-reset"}
//! {"type":"roles","xRole":"host","v":2}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::game::Symbol;

/// Version tag carried by [`WireMessage::RoleAssignment`].
pub const ROLES_VERSION: u32 = 2;

/// The two participants of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Creates the offer; authoritative for resets and side assignment.
    Host,
    /// Applies the host's offer and answers it.
    Join,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::Join => "join",
        })
    }
}

/// Message vocabulary of the game sync protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireMessage {
    /// A mark placed by the sender.
    Move {
        idx: u8,
        /// Symbol of the mover. Older peers omit it; receivers then fall back
        /// to their own turn tracking.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sym: Option<Symbol>,
    },
    /// Start a new game (host only).
    Reset,
    /// Ask the host to start a new game (join only).
    RequestReset,
    /// Tell the peer which role plays X (host only).
    #[serde(rename = "roles")]
    RoleAssignment {
        #[serde(rename = "xRole")]
        x_role: Role,
        #[serde(rename = "v", default)]
        version: u32,
    },
}

impl WireMessage {
    /// A move message with an explicit symbol.
    pub fn mark(idx: usize, sym: Symbol) -> Self {
        Self::Move {
            // Board indices are < 9, so this never saturates for legal moves.
            idx: u8::try_from(idx).unwrap_or(u8::MAX),
            sym: Some(sym),
        }
    }

    /// A current-version role assignment.
    pub fn roles(x_role: Role) -> Self {
        Self::RoleAssignment {
            x_role,
            version: ROLES_VERSION,
        }
    }

    /// Which role may send this message. `None` means either side.
    pub fn origin(&self) -> Option<Role> {
        match self {
            Self::Move { .. } => None,
            Self::Reset | Self::RoleAssignment { .. } => Some(Role::Host),
            Self::RequestReset => Some(Role::Join),
        }
    }

    /// Parse one data channel frame. Unknown `type` tags are an error.
    ///
    /// # Errors
    ///
    /// Returns [`PeerGameError::Serialization`](crate::PeerGameError::Serialization)
    /// for malformed JSON or unknown message types.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to a data channel frame.
    ///
    /// # Errors
    ///
    /// Returns [`PeerGameError::Serialization`](crate::PeerGameError::Serialization)
    /// if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_value(msg: &WireMessage) -> Value {
        serde_json::from_str(&msg.to_json().unwrap()).unwrap()
    }

    #[test]
    fn move_wire_format() {
        assert_eq!(
            as_value(&WireMessage::mark(4, Symbol::X)),
            json!({"type": "move", "idx": 4, "sym": "X"})
        );
    }

    #[test]
    fn reset_wire_formats() {
        assert_eq!(as_value(&WireMessage::Reset), json!({"type": "reset"}));
        assert_eq!(
            as_value(&WireMessage::RequestReset),
            json!({"type": "request-reset"})
        );
    }

    #[test]
    fn roles_wire_format() {
        assert_eq!(
            as_value(&WireMessage::roles(Role::Host)),
            json!({"type": "roles", "xRole": "host", "v": 2})
        );
    }

    #[test]
    fn parses_peer_frames() {
        assert_eq!(
            WireMessage::parse(r#"{"type":"move","idx":0,"sym":"O"}"#).unwrap(),
            WireMessage::Move {
                idx: 0,
                sym: Some(Symbol::O)
            }
        );
        assert_eq!(
            WireMessage::parse(r#"{"type":"roles","xRole":"join","v":2}"#).unwrap(),
            WireMessage::roles(Role::Join)
        );
    }

    #[test]
    fn move_without_symbol_parses() {
        assert_eq!(
            WireMessage::parse(r#"{"type":"move","idx":7}"#).unwrap(),
            WireMessage::Move { idx: 7, sym: None }
        );
    }

    #[test]
    fn roles_without_version_parses() {
        assert_eq!(
            WireMessage::parse(r#"{"type":"roles","xRole":"host"}"#).unwrap(),
            WireMessage::RoleAssignment {
                x_role: Role::Host,
                version: 0
            }
        );
    }

    #[test]
    fn unknown_or_malformed_frames_are_rejected() {
        for frame in [
            r#"{"type":"chat","text":"hi"}"#,
            r#"{"idx":4}"#,
            r#"{"type":"move","idx":"four"}"#,
            r#"{"type":"move","idx":1,"sym":"Z"}"#,
            r#"{"type":"roles","xRole":"spectator"}"#,
            "not json",
        ] {
            assert!(WireMessage::parse(frame).is_err(), "{frame}");
        }
    }

    #[test]
    fn origins_follow_host_authority() {
        assert_eq!(WireMessage::Reset.origin(), Some(Role::Host));
        assert_eq!(WireMessage::roles(Role::Join).origin(), Some(Role::Host));
        assert_eq!(WireMessage::RequestReset.origin(), Some(Role::Join));
        assert_eq!(WireMessage::mark(1, Symbol::O).origin(), None);
    }
}
