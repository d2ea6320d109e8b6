//! Session codes: copy-pasteable text tokens carrying a session description.
//!
//! A session description (offer or answer SDP) is far too large to ask a user
//! to retype, so it is wrapped into a short-ish token that survives a
//! clipboard or a URL query parameter:
//!
//! | Prefix | Payload                          | Produced by            |
//! |--------|----------------------------------|------------------------|
//! | `G1`   | `base64(gzip({"t":..,"s":..}))`  | [`encode`] (preferred) |
//! | `G0`   | `base64({"t":..,"s":..})`        | [`encode`] (fallback)  |
//! | none   | `{"type":..,"sdp":..}`           | legacy peers only      |
//!
//! [`decode`] accepts all three and never panics on garbage input. Like the
//! browser's `atob`, it tolerates ASCII whitespace inside the base64 body
//! (line-wrapped pastes) and missing `=` padding.
//!
//! ```
//! use peer_tictactoe::codec::{self, SdpType, SessionDescription};
//!
//! let offer = SessionDescription::new(SdpType::Offer, "v=0\r\n");
//! let token = codec::encode(&offer).unwrap();
//! assert!(token.starts_with("G"));
//! assert_eq!(codec::decode(&token).unwrap(), offer);
//! ```

use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD as BASE64};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::InvalidCode;

/// Decoding engine matching `atob`: padding optional, trailing bits ignored.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Discriminates the two session description kinds this protocol exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Created by the host.
    Offer,
    /// Created by the joining peer in reply to an offer.
    Answer,
}

impl SdpType {
    /// Wire name of the type (`"offer"` / `"answer"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session description: type plus the SDP blob, opaque beyond its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Offer or answer.
    #[serde(rename = "type")]
    pub kind: SdpType,
    /// Raw SDP text.
    pub sdp: String,
}

impl SessionDescription {
    /// Create a description from its parts.
    pub fn new(kind: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            kind,
            sdp: sdp.into(),
        }
    }
}

/// Token format selected by its two-character prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFormat {
    /// `G1`: gzip-compressed JSON.
    Compressed,
    /// `G0`: plain JSON.
    Plain,
}

impl CodeFormat {
    /// The prefix that tags tokens of this format.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Compressed => "G1",
            Self::Plain => "G0",
        }
    }
}

/// Compact payload carried inside prefixed tokens.
#[derive(Deserialize)]
struct CompactPayload {
    t: SdpType,
    s: String,
}

/// Borrowed form of [`CompactPayload`] for encoding.
#[derive(Serialize)]
struct CompactPayloadRef<'a> {
    t: SdpType,
    s: &'a str,
}

impl From<CompactPayload> for SessionDescription {
    fn from(payload: CompactPayload) -> Self {
        Self::new(payload.t, payload.s)
    }
}

/// Encode a description, preferring the compressed format.
///
/// Falls back to [`CodeFormat::Plain`] when the `gzip` feature is disabled or
/// compression fails.
///
/// # Errors
///
/// Returns [`InvalidCode`] only if the payload cannot be serialized.
pub fn encode(description: &SessionDescription) -> Result<String, InvalidCode> {
    if cfg!(feature = "gzip") {
        match encode_as(description, CodeFormat::Compressed) {
            Ok(token) => return Ok(token),
            Err(e) => warn!("compressed encoding unavailable, using plain code: {e}"),
        }
    }
    encode_as(description, CodeFormat::Plain)
}

/// Encode a description in an explicit format.
///
/// # Errors
///
/// Returns [`InvalidCode`] when `format` is [`CodeFormat::Compressed`] and
/// compression is unavailable (the `gzip` feature is off) or fails.
pub fn encode_as(
    description: &SessionDescription,
    format: CodeFormat,
) -> Result<String, InvalidCode> {
    let json = payload_json(description)?;
    let body = match format {
        CodeFormat::Plain => json.into_bytes(),
        CodeFormat::Compressed => gzip::compress(json.as_bytes())?,
    };
    Ok(format!("{}{}", format.prefix(), BASE64.encode(body)))
}

/// Decode a token produced by [`encode`], a `G0`/`G1` token from another
/// peer, or a legacy raw-JSON token.
///
/// Leading and trailing whitespace is ignored.
///
/// # Errors
///
/// Returns [`InvalidCode`] for anything that does not decode to an offer or
/// answer.
pub fn decode(token: &str) -> Result<SessionDescription, InvalidCode> {
    let token = token.trim();
    if token.is_empty() {
        return Err(InvalidCode::new("empty session code"));
    }

    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            let decoded = strategy(token);
            if decoded.is_some() {
                debug!("decoded session code using {name} strategy");
            }
            decoded
        })
        .ok_or_else(|| InvalidCode::new("unrecognized or corrupt session code"))
}

// ── Decode strategies ───────────────────────────────────────────────

type Strategy = fn(&str) -> Option<SessionDescription>;

/// Tried in order; the first one that yields a description wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("compressed", decode_compressed),
    ("plain", decode_plain),
    ("legacy", decode_legacy),
];

fn decode_compressed(token: &str) -> Option<SessionDescription> {
    let bytes = prefixed_bytes(token, CodeFormat::Compressed)?;
    let json = gzip::decompress(&bytes).ok()?;
    parse_compact(&json)
}

fn decode_plain(token: &str) -> Option<SessionDescription> {
    let bytes = prefixed_bytes(token, CodeFormat::Plain)?;
    parse_compact(&bytes)
}

fn decode_legacy(token: &str) -> Option<SessionDescription> {
    let description: SessionDescription = serde_json::from_str(token).ok()?;
    (!description.sdp.is_empty()).then_some(description)
}

fn prefixed_bytes(token: &str, format: CodeFormat) -> Option<Vec<u8>> {
    let body: String = token
        .strip_prefix(format.prefix())?
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64.decode(body).ok()
}

fn parse_compact(json: &[u8]) -> Option<SessionDescription> {
    serde_json::from_slice::<CompactPayload>(json)
        .ok()
        .map(SessionDescription::from)
}

fn payload_json(description: &SessionDescription) -> Result<String, InvalidCode> {
    let payload = CompactPayloadRef {
        t: description.kind,
        s: &description.sdp,
    };
    serde_json::to_string(&payload)
        .map_err(|e| InvalidCode::new(format!("payload serialization failed: {e}")))
}

#[cfg(feature = "gzip")]
mod gzip {
    use std::io::{Read, Write};

    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    use crate::error::InvalidCode;

    pub(super) fn compress(data: &[u8]) -> Result<Vec<u8>, InvalidCode> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder
            .write_all(data)
            .and_then(|()| encoder.finish())
            .map_err(|e| InvalidCode::new(format!("gzip compression failed: {e}")))
    }

    pub(super) fn decompress(data: &[u8]) -> Result<Vec<u8>, InvalidCode> {
        let mut out = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| InvalidCode::new(format!("gzip decompression failed: {e}")))?;
        Ok(out)
    }
}

#[cfg(not(feature = "gzip"))]
mod gzip {
    use crate::error::InvalidCode;

    pub(super) fn compress(_data: &[u8]) -> Result<Vec<u8>, InvalidCode> {
        Err(InvalidCode::new("built without gzip support"))
    }

    pub(super) fn decompress(_data: &[u8]) -> Result<Vec<u8>, InvalidCode> {
        Err(InvalidCode::new("built without gzip support"))
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
    use serde_json::Value;

    use super::*;

    /// Answer produced by a browser peer: `JSON.stringify({t, s})`, gzipped
    /// with `CompressionStream`, then `btoa`.
    const BROWSER_G1_ANSWER: &str = "G1H4sIAAAAAAAAAyWMTwuCQBTEv8pjz/nnPU1T2EvZQRAR1JuXTSUFWxddk4i+e1rMYZgfM/NmmoVMyHltJ3Zg8xae3K6mSo7cANdD9B10gSBOIc5cQPJNexPulZkbu2luw28i+H0aFxWeyzRKrn/24EKpoa+F7kcJAZRRZkVFklv5pchgbW+Tro1GaFF3Qsp2+P/UQjb9RtsQAWFpFBASkWcTOYABmeidTDQJjq5DCPqloBtnvY/Z5wvBDbsb1AAAAA==";

    const BROWSER_ANSWER_SDP: &str = "v=0\r\no=- 46117314 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
        a=group:BUNDLE 0\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
        a=candidate:1 1 udp 2122260223 192.168.1.2 54321 typ host\r\n";

    /// `"G0" + btoa(JSON.stringify({t: "offer", s: "v=0\r\na=x\r\n"}))`.
    const BROWSER_G0_OFFER: &str = "G0eyJ0Ijoib2ZmZXIiLCJzIjoidj0wXHJcbmE9eFxyXG4ifQ==";

    fn offer() -> SessionDescription {
        SessionDescription::new(
            SdpType::Offer,
            "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
             a=group:BUNDLE 0\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n",
        )
    }

    #[test]
    fn plain_code_round_trips() {
        let token = encode_as(&offer(), CodeFormat::Plain).unwrap();
        assert!(token.starts_with("G0"));
        assert_eq!(decode(&token).unwrap(), offer());
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn compressed_code_round_trips_and_is_preferred() {
        let token = encode(&offer()).unwrap();
        assert!(token.starts_with("G1"));
        assert_eq!(decode(&token).unwrap(), offer());
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn compressed_code_is_shorter_for_repetitive_sdp() {
        let sdp = "a=candidate:1 1 udp 2122260223 192.168.1.2 54321 typ host\r\n".repeat(12);
        let desc = SessionDescription::new(SdpType::Answer, sdp);
        let compressed = encode_as(&desc, CodeFormat::Compressed).unwrap();
        let plain = encode_as(&desc, CodeFormat::Plain).unwrap();
        assert!(compressed.len() < plain.len());
    }

    #[cfg(not(feature = "gzip"))]
    #[test]
    fn encode_falls_back_to_plain_without_gzip() {
        let token = encode(&offer()).unwrap();
        assert!(token.starts_with("G0"));
        assert!(encode_as(&offer(), CodeFormat::Compressed).is_err());
    }

    #[test]
    fn decode_ignores_surrounding_whitespace() {
        let token = encode(&offer()).unwrap();
        assert_eq!(decode(&format!("  {token}\n")).unwrap(), offer());
    }

    #[test]
    fn payload_uses_compact_keys() {
        let token = encode_as(&offer(), CodeFormat::Plain).unwrap();
        let json = BASE64.decode(&token[2..]).unwrap();
        let value: Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["t"], "offer");
        assert_eq!(value["s"], offer().sdp);
    }

    #[test]
    fn legacy_json_code_decodes() {
        let legacy = r#"{"type":"answer","sdp":"v=0\r\n"}"#;
        let desc = decode(legacy).unwrap();
        assert_eq!(desc.kind, SdpType::Answer);
        assert_eq!(desc.sdp, "v=0\r\n");
    }

    #[test]
    fn legacy_json_without_sdp_is_rejected() {
        assert!(decode(r#"{"type":"offer","sdp":""}"#).is_err());
        assert!(decode(r#"{"type":"offer"}"#).is_err());
        assert!(decode(r#"{"type":"rollback","sdp":"v=0"}"#).is_err());
    }

    #[test]
    fn garbage_is_invalid_code() {
        for token in [
            "", "   ", "hello", "G0", "G0!!!!", "G1AAAA", "G2abcd", "{not json",
        ] {
            assert!(decode(token).is_err(), "expected {token:?} to be rejected");
        }
    }

    #[test]
    fn truncated_codes_are_invalid() {
        let tokens = [
            encode(&offer()).unwrap(),
            encode_as(&offer(), CodeFormat::Plain).unwrap(),
        ];
        for token in tokens {
            let truncated = &token[..token.len() / 2];
            assert!(decode(truncated).is_err());
        }
    }

    #[test]
    fn plain_prefix_with_compressed_body_is_invalid() {
        let compact = BASE64.encode(r#"{"t":"offer"}"#);
        assert!(decode(&format!("G0{compact}")).is_err());
    }

    #[test]
    fn browser_plain_code_decodes() {
        let desc = decode(BROWSER_G0_OFFER).unwrap();
        assert_eq!(
            desc,
            SessionDescription::new(SdpType::Offer, "v=0\r\na=x\r\n")
        );
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn browser_compressed_code_decodes() {
        let desc = decode(BROWSER_G1_ANSWER).unwrap();
        assert_eq!(desc.kind, SdpType::Answer);
        assert_eq!(desc.sdp, BROWSER_ANSWER_SDP);
    }

    #[test]
    fn line_wrapped_code_decodes() {
        let (head, tail) = BROWSER_G0_OFFER.split_at(24);
        let wrapped = format!("{head}\n{tail}");
        assert_eq!(decode(&wrapped).unwrap().kind, SdpType::Offer);

        let token = encode_as(&offer(), CodeFormat::Plain).unwrap();
        let chunked: Vec<String> = token
            .as_bytes()
            .chunks(20)
            .map(|chunk| String::from_utf8(chunk.to_vec()).unwrap())
            .collect();
        assert_eq!(decode(&chunked.join("\r\n \t")).unwrap(), offer());
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn line_wrapped_compressed_code_decodes() {
        let (head, tail) = BROWSER_G1_ANSWER.split_at(40);
        let wrapped = format!("{head}\n  {tail}");
        assert_eq!(decode(&wrapped).unwrap().sdp, BROWSER_ANSWER_SDP);
    }

    #[test]
    fn unpadded_code_decodes() {
        let unpadded = BROWSER_G0_OFFER.trim_end_matches('=');
        assert_ne!(unpadded, BROWSER_G0_OFFER);
        assert_eq!(decode(unpadded).unwrap(), decode(BROWSER_G0_OFFER).unwrap());
    }

    #[test]
    fn encoded_codes_keep_padding() {
        let token = encode_as(&offer(), CodeFormat::Plain).unwrap();
        assert_eq!((token.len() - 2) % 4, 0);
    }
}
