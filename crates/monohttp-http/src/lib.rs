//! Wire layer for monohttp.
//!
//! This crate turns one byte stream into one [`Request`](monohttp_core::Request),
//! hands it to a dispatch function, and serializes the returned response:
//!
//! - [`query`]: percent codec and query-string splitting
//! - [`parser`]: request-line validation
//! - [`cookie`]: strict RFC 6265 request-`Cookie` parsing
//! - [`writer`]: response serialization with automatic `Date`,
//!   `Content-Length`, and `Connection` handling
//! - [`driver`]: the per-connection state machine
//! - [`listener`]: adapters producing `(input, output, label)` triples
//!
//! The driver is one-shot by design: it serves exactly one request and then
//! closes, leaving concurrency and connection reuse to the supervisor that
//! spawned the process.

#![forbid(unsafe_code)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::single_match_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::too_many_lines)]

pub mod cookie;
pub mod driver;
pub mod listener;
pub mod parser;
pub mod query;
pub mod writer;

pub use cookie::parse_cookie_header;
pub use driver::{ConnState, Driver};
pub use listener::{Endpoint, Listener, MemoryListener, SharedBuffer, StdioListener};
pub use parser::{RequestLine, parse_request_line};
pub use query::{parse_query_string, percent_decode, percent_encode};
pub use writer::ResponseWriter;
