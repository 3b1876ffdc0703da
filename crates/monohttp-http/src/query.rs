//! Percent codec and query-string splitting.
//!
//! The codec operates on raw bytes: an escape may name any octet, including
//! ones that are not valid UTF-8 on their own, and decoding must hand every
//! one of them back unchanged. Only [`parse_query_string`] converts to text,
//! at its map boundary, since route matching and handler ergonomics want
//! `str` keys.

use std::collections::HashMap;

/// Decodes `+` to space and `%HH` to the named octet, then collapses each
/// CRLF pair to LF. Malformed escapes are kept literally. Byte-faithful:
/// decoding the output of [`percent_encode`] recovers the input bytes
/// exactly.
pub fn percent_decode(input: &[u8]) -> Vec<u8> {
    let mut unescaped = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'+' => {
                unescaped.push(b' ');
                i += 1;
            }
            b'%' => match (hex_digit(input.get(i + 1)), hex_digit(input.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    unescaped.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    unescaped.push(b'%');
                    i += 1;
                }
            },
            byte => {
                unescaped.push(byte);
                i += 1;
            }
        }
    }

    // CRLF -> LF, left to right, one CR per LF.
    let mut out = Vec::with_capacity(unescaped.len());
    let mut i = 0;
    while i < unescaped.len() {
        if unescaped[i] == b'\r' && unescaped.get(i + 1) == Some(&b'\n') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(unescaped[i]);
            i += 1;
        }
    }
    out
}

fn hex_digit(byte: Option<&u8>) -> Option<u8> {
    match byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// The inverse of [`percent_decode`]: LF becomes an encoded CRLF, space
/// becomes `+`, and every byte outside `A-Za-z0-9-_.~` becomes `%HH` with
/// uppercase hex. Output is always ASCII.
pub fn percent_encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input {
        match byte {
            b' ' => out.push('+'),
            // LF expands to CRLF on the wire; the decoder collapses it back.
            b'\n' => out.push_str("%0D%0A"),
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Splits a query string into decoded key → ordered values.
///
/// Pieces are separated by `;` or `&`; each splits at its first `=`, and a
/// piece without `=` is dropped silently. Values accumulate per key in
/// arrival order; ordering across distinct keys is not preserved. Decoded
/// bytes that are not UTF-8 are replaced at this boundary.
pub fn parse_query_string(query: &str) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for piece in query.split(['&', ';']) {
        let Some((key, value)) = piece.split_once('=') else {
            continue;
        };
        out.entry(decode_text(key)).or_default().push(decode_text(value));
    }
    out
}

fn decode_text(s: &str) -> String {
    String::from_utf8_lossy(&percent_decode(s.as_bytes())).into_owned()
}
