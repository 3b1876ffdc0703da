//! Property tests for the codec and body framing invariants.

use std::collections::HashMap;

use monohttp_core::{Body, BufInput, ChunkStream, FieldMap, InputStream};
use monohttp_http::{parse_query_string, percent_decode, percent_encode};
use proptest::prelude::*;

proptest! {
    /// Decoding inverts encoding for arbitrary byte strings, not just valid
    /// UTF-8: the encoder injects a CR before each LF, the decoder collapses
    /// exactly one back out, and every other octet survives untouched.
    #[test]
    fn decode_inverts_encode(s in proptest::collection::vec(any::<u8>(), 0..128)) {
        prop_assert_eq!(percent_decode(percent_encode(&s).as_bytes()), s);
    }

    /// Both newline conventions round-trip to themselves.
    #[test]
    fn newline_conventions_round_trip(lines in proptest::collection::vec("[a-z ]{0,8}", 0..5)) {
        let crlf = lines.join("\r\n");
        let lf = lines.join("\n");
        prop_assert_eq!(percent_decode(percent_encode(crlf.as_bytes()).as_bytes()), crlf.as_bytes());
        prop_assert_eq!(percent_decode(percent_encode(lf.as_bytes()).as_bytes()), lf.as_bytes());
    }

    /// Building a query string out of encoded pairs and parsing it back
    /// recovers every pair, with per-key value order preserved.
    #[test]
    fn query_string_round_trip(
        pairs in proptest::collection::vec(("[a-zA-Z0-9 %&=+_.~-]{1,12}", "[a-zA-Z0-9 %&=+_.~-]{0,12}"), 0..8)
    ) {
        let query = pairs
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    percent_encode(k.as_bytes()),
                    percent_encode(v.as_bytes())
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        let mut expected: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in &pairs {
            expected.entry(k.clone()).or_default().push(v.clone());
        }

        prop_assert_eq!(parse_query_string(&query), expected);
    }

    /// A chunked body reassembles to exactly the bytes the sender framed,
    /// in order.
    #[test]
    fn chunked_round_trip(chunks in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 1..64), 0..12)
    ) {
        let mut wire = Vec::new();
        for chunk in &chunks {
            wire.extend_from_slice(format!("{:X}\r\n", chunk.len()).as_bytes());
            wire.extend_from_slice(chunk);
            wire.extend_from_slice(b"\r\n");
        }
        wire.extend_from_slice(b"0\r\n\r\n");

        let mut stream = ChunkStream::new(
            Box::new(BufInput::new(std::io::Cursor::new(wire))),
            16 * 1024 * 1024,
        );
        let mut reassembled = Vec::new();
        for chunk in &mut stream {
            reassembled.extend_from_slice(&chunk.unwrap().data);
        }

        let sent: Vec<u8> = chunks.concat();
        prop_assert_eq!(reassembled, sent);
        prop_assert!(stream.is_exhausted());
    }

    /// Field elements aggregated across several received values equal the
    /// concatenation of each value parsed in isolation.
    #[test]
    fn elements_aggregate_like_isolation(values in proptest::collection::vec(
        "[a-z]{1,6}(;q=[0-9])?(, [a-z]{1,6})?", 1..4)
    ) {
        let mut combined = FieldMap::new();
        for value in &values {
            combined.append("x", value);
        }

        let mut isolated = Vec::new();
        for value in &values {
            let mut single = FieldMap::new();
            single.append("x", value);
            isolated.extend(single.get("x").unwrap().elements().to_vec());
        }

        prop_assert_eq!(combined.get("x").unwrap().elements(), isolated.as_slice());
    }
}

/// Iterator exhaustion is a precondition for trailers; a body that is never
/// read leaves them empty.
#[test]
fn unread_chunked_body_has_no_trailers() {
    let wire = &b"5\r\nHello\r\n0\r\nX-T: v\r\n\r\n"[..];
    let stream = ChunkStream::new(Box::new(BufInput::new(wire)), 1024);
    let body = Body::Chunked(stream);
    match body {
        Body::Chunked(stream) => assert!(stream.trailers().is_empty()),
        _ => unreachable!(),
    }
}

/// `read_bytes` then `read_line` interleave correctly across the chunk
/// boundary.
#[test]
fn input_interleaving() {
    let mut input = BufInput::new(&b"abc\r\nDEF\r\n"[..]);
    assert_eq!(input.read_bytes(3).unwrap(), b"abc");
    assert_eq!(input.read_line().unwrap(), b"\r\n");
    assert_eq!(input.read_line().unwrap(), b"DEF\r\n");
}
