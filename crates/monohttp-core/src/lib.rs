//! Core types for monohttp.
//!
//! This crate provides the data model shared by the wire layer and the
//! router:
//!
//! - [`Request`] and [`Response`] types
//! - [`FieldMap`] / [`Field`]: the lazy, case-insensitive header store with
//!   structured field-value parsing (RFC 9110 §5.6)
//! - [`ChunkStream`]: the chunked request-body iterator
//! - [`Logger`]: the leveled line logger shared by all components
//! - Process-global tuning knobs in [`config`]
//!
//! # Design Principles
//!
//! - One connection per process: everything here is single-threaded and
//!   blocking; laziness uses cells, not locks
//! - Parse tables are built once per process and immutable afterwards
//! - No panics outside tests; wire failures surface as typed errors

#![forbid(unsafe_code)]
// Pedantic clippy lints allowed (style suggestions, not correctness issues)
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::single_match_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]

pub mod body;
pub mod config;
mod field;
mod fieldlex;
mod fieldparse;
pub mod logging;
mod request;
mod response;
pub mod stream;

pub use body::{BodyError, Chunk, ChunkStream, ExtensionValue};
pub use field::{Field, FieldMap, parse_field_line};
pub use fieldlex::LexState;
pub use fieldparse::{Comment, CommentPart, Element, Parameter};
pub use logging::{LogCapture, LogLevel, Logger};
pub use request::{Body, Cookie, Request};
pub use response::{
    Conn, HandlerError, Response, ResponseBody, ResponseFields, WriterFn, canonical_reason,
};
pub use stream::{BufInput, InputStream, TracedInput};
