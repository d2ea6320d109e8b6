//! Join links: a page URL with `?join=1&code=<token>` appended.
//!
//! The host hands out the link; opening it on the other side auto-starts the
//! join flow with the embedded offer code.

use url::form_urlencoded;

/// What a join link's query string asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// The host's offer code, if the link carried one.
    pub code: Option<String>,
}

impl JoinRequest {
    /// Parse a query string (`join=1&code=...`, with or without a leading
    /// `?`) or a full URL. Returns `None` unless `join=1` is present.
    pub fn from_query(input: &str) -> Option<Self> {
        let query = match input.split_once('?') {
            Some((_, query)) => query,
            None => input,
        };
        let query = query.split('#').next().unwrap_or_default();

        let mut join = false;
        let mut code = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "join" => join = value == "1",
                "code" if !value.trim().is_empty() => code = Some(value.into_owned()),
                _ => {}
            }
        }
        join.then_some(Self { code })
    }
}

/// Build the link a joining peer opens. Any query or fragment already on
/// `base_url` is replaced.
pub fn build_join_link(base_url: &str, code: Option<&str>) -> String {
    let base = base_url.split(['?', '#']).next().unwrap_or_default();
    let mut link = format!("{base}?join=1");
    if let Some(code) = code {
        link.push_str("&code=");
        link.extend(form_urlencoded::byte_serialize(code.as_bytes()));
    }
    link
}
