//! monohttp: a one-shot HTTP/1.1 origin server core.
//!
//! Designed for socket-activation supervisors that spawn one process per
//! accepted connection: the supervisor wires the socket to stdin/stdout, the
//! core reads one request, dispatches it to a registered handler, writes the
//! response, and exits.
//!
//! ```no_run
//! use monohttp::{Response, Server, StdioListener};
//!
//! fn main() -> std::io::Result<()> {
//!     let mut server = Server::new();
//!     server
//!         .add_route("GET", "^/hello/([a-z]+)$", |req| {
//!             let name = req.matches()[0].clone();
//!             Ok(Response::ok().body(format!("hello, {name}\n")))
//!         })
//!         .expect("valid pattern");
//!     server.run(StdioListener::new())
//! }
//! ```

#![forbid(unsafe_code)]

mod server;

pub use server::Server;

pub use monohttp_core::{
    Body, BodyError, BufInput, Chunk, ChunkStream, Comment, CommentPart, Conn, Cookie, Element,
    ExtensionValue, Field, FieldMap, HandlerError, InputStream, LogCapture, LogLevel, Logger,
    Parameter, Request, Response, ResponseBody, ResponseFields, canonical_reason, config,
};
pub use monohttp_http::{
    ConnState, Driver, Endpoint, Listener, MemoryListener, SharedBuffer, StdioListener,
    parse_query_string, percent_decode, percent_encode,
};
pub use monohttp_router::{Dispatch, RouteError, Router};
