//! Strict request-`Cookie` parsing (RFC 6265 §5.4, server side).
//!
//! One linear scan validates the whole header against
//! `cookie-pair *( ";" SP cookie-pair )`. A cookie name is a token, a cookie
//! value is a run of cookie-octets optionally wrapped in matched double
//! quotes (the quotes are stripped). Any deviation anywhere discards the
//! entire header; the request then proceeds with no cookies.

use monohttp_core::Cookie;

/// Parses a `Cookie` header value. Returns `None` if the header does not
/// match the grammar end to end.
pub fn parse_cookie_header(value: &str) -> Option<Vec<Cookie>> {
    let bytes = value.as_bytes();
    let mut cookies = Vec::new();
    let mut i = 0;

    loop {
        let name_start = i;
        while i < bytes.len() && is_cookie_name_char(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            return None;
        }
        let name = &value[name_start..i];

        if bytes.get(i) != Some(&b'=') {
            return None;
        }
        i += 1;

        let cookie_value = if bytes.get(i) == Some(&b'"') {
            i += 1;
            let inner_start = i;
            while i < bytes.len() && is_cookie_octet(bytes[i]) {
                i += 1;
            }
            if bytes.get(i) != Some(&b'"') {
                return None;
            }
            let inner = &value[inner_start..i];
            i += 1;
            inner
        } else {
            let value_start = i;
            while i < bytes.len() && is_cookie_octet(bytes[i]) {
                i += 1;
            }
            &value[value_start..i]
        };

        cookies.push(Cookie::new(name, cookie_value));

        if i == bytes.len() {
            return Some(cookies);
        }
        // The separator is exactly "; ".
        if bytes.get(i) != Some(&b';') || bytes.get(i + 1) != Some(&b' ') {
            return None;
        }
        i += 2;
    }
}

/// Token characters of RFC 2616: no CTLs, no separators, no non-ASCII.
fn is_cookie_name_char(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'A'..=b'Z'
            | b'a'..=b'z'
    )
}

/// cookie-octet: printable US-ASCII minus controls, space, `"`, `,`, `;`,
/// and `\`.
fn is_cookie_octet(byte: u8) -> bool {
    matches!(byte, 0x21 | 0x23..=0x2b | 0x2d..=0x3a | 0x3c..=0x5b | 0x5d..=0x7e)
}
