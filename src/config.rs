//! Configuration for a [`GameSession`](crate::GameSession).

use serde::{Deserialize, Serialize};

use crate::game::Symbol;

/// Default STUN server used for ICE.
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Default label of the game data channel.
pub const DEFAULT_CHANNEL_LABEL: &str = "ttt";

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// One ICE server entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// URLs of one STUN/TURN server.
    pub urls: Vec<String>,
}

impl IceServer {
    /// A server reachable at a single URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
        }
    }
}

/// Settings handed to [`PeerConnector::connect`](crate::peer::PeerConnector::connect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcConfig {
    /// Servers used for ICE candidate gathering.
    pub ice_servers: Vec<IceServer>,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServer::new(DEFAULT_STUN_SERVER)],
        }
    }
}

/// Configuration for a [`GameSession`](crate::GameSession).
///
/// # Example
///
/// ```
/// use peer_tictactoe::config::SessionConfig;
/// use peer_tictactoe::game::Symbol;
///
/// let config = SessionConfig::new()
///     .with_join_base_url("https://example.com/tictactoe/")
///     .with_host_symbol(Symbol::X)
///     .with_event_channel_capacity(64);
/// assert_eq!(config.channel_label, "ttt");
/// assert_eq!(config.event_channel_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// ICE configuration for new peer connections.
    ///
    /// Defaults to a single public STUN server.
    pub rtc: RtcConfig,
    /// Label of the host-created data channel. Defaults to **`"ttt"`**.
    pub channel_label: String,
    /// Capacity of the bounded event channel.
    ///
    /// When the UI cannot keep up, events are dropped (with a warning logged)
    /// rather than stalling the session. Defaults to **256**. Values below 1
    /// are clamped to 1.
    pub event_channel_capacity: usize,
    /// Page URL that join links point at. When unset, hosts still get a
    /// [`LocalCodeReady`](crate::GameEvent::LocalCodeReady) event but no link.
    pub join_base_url: Option<String>,
    /// Symbol the host plays on every reset. `None` (the default) picks a
    /// side at random each game.
    pub host_symbol: Option<Symbol>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            rtc: RtcConfig::default(),
            channel_label: DEFAULT_CHANNEL_LABEL.to_string(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            join_base_url: None,
            host_symbol: None,
        }
    }

    /// Replace the ICE server list.
    #[must_use]
    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.rtc.ice_servers = servers;
        self
    }

    /// Set the data channel label.
    #[must_use]
    pub fn with_channel_label(mut self, label: impl Into<String>) -> Self {
        self.channel_label = label.into();
        self
    }

    /// Set the capacity of the bounded event channel (clamped to at least 1).
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the page URL used to build join links.
    #[must_use]
    pub fn with_join_base_url(mut self, url: impl Into<String>) -> Self {
        self.join_base_url = Some(url.into());
        self
    }

    /// Pin the host's side instead of choosing at random.
    #[must_use]
    pub fn with_host_symbol(mut self, symbol: Symbol) -> Self {
        self.host_symbol = Some(symbol);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::new();
        assert_eq!(
            config.rtc.ice_servers,
            vec![IceServer::new(DEFAULT_STUN_SERVER)]
        );
        assert_eq!(config.channel_label, "ttt");
        assert_eq!(config.event_channel_capacity, 256);
        assert!(config.join_base_url.is_none());
        assert!(config.host_symbol.is_none());
    }

    #[test]
    fn capacity_is_clamped_to_one() {
        let config = SessionConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{"join_base_url":"https://example.com/ttt","host_symbol":"O"}"#;
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.join_base_url.as_deref(),
            Some("https://example.com/ttt")
        );
        assert_eq!(config.host_symbol, Some(Symbol::O));
        assert_eq!(config.channel_label, DEFAULT_CHANNEL_LABEL);
        assert_eq!(config.rtc, RtcConfig::default());
    }
}
