//! Request-line validation.
//!
//! The accepted shape is exactly `METHOD SP TARGET SP HTTP/1.1 CR LF` where
//! method and target are runs of visible ASCII (`!`..`~`). Anything else is a
//! mismatch: the driver logs it and keeps waiting for a valid line.

use crate::query::{parse_query_string, percent_decode};
use std::collections::HashMap;

/// A validated request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// The method token, exactly as received.
    pub method: String,
    /// The raw target, before any decoding.
    pub target: String,
}

impl RequestLine {
    /// The percent-decoded path half of the target. Escapes naming non-UTF-8
    /// octets are replaced here, since route patterns match on text.
    pub fn path(&self) -> String {
        let decoded = percent_decode(self.split_target().0.as_bytes());
        String::from_utf8_lossy(&decoded).into_owned()
    }

    /// Decoded query parameters from the target, empty when there is no
    /// query.
    pub fn params(&self) -> HashMap<String, Vec<String>> {
        match self.split_target().1 {
            Some(query) => parse_query_string(query),
            None => HashMap::new(),
        }
    }

    /// Splits the raw target at the first `?`.
    fn split_target(&self) -> (&str, Option<&str>) {
        match self.target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (&self.target, None),
        }
    }
}

/// Parses one input line as a request line. `line` must include its CRLF
/// terminator.
pub fn parse_request_line(line: &[u8]) -> Option<RequestLine> {
    let body = line.strip_suffix(b"\r\n")?;
    let text = std::str::from_utf8(body).ok()?;

    let mut parts = text.split(' ');
    let method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if method.is_empty() || target.is_empty() || version != "HTTP/1.1" {
        return None;
    }
    if !is_visible_ascii(method) || !is_visible_ascii(target) {
        return None;
    }

    Some(RequestLine {
        method: method.to_string(),
        target: target.to_string(),
    })
}

fn is_visible_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x21..=0x7e).contains(&b))
}
