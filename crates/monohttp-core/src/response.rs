//! HTTP response model.
//!
//! Handlers build a [`Response`]; the wire layer serializes it. Response
//! fields preserve the case first used for a name while lookups fold case,
//! and a value may be a scalar or a list (one wire line per list entry).
//!
//! A body is either absent, bytes, or a writer callback. The writer form
//! receives a [`Conn`] after the header block is flushed and owns the raw
//! output stream until it returns; this is how `101` protocol upgrades and
//! chunked responses are produced.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use crate::logging::{LogLevel, Logger};
use crate::request::Request;
use crate::stream::InputStream;

/// Error type handlers may return; the dispatch glue maps it to a status.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The streaming-body callback type.
pub type WriterFn = Box<dyn FnOnce(&mut Conn<'_>) -> io::Result<()> + Send>;

/// Response body.
pub enum ResponseBody {
    Empty,
    Bytes(Vec<u8>),
    Writer(WriterFn),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("ResponseBody::Empty"),
            Self::Bytes(b) => write!(f, "ResponseBody::Bytes({} bytes)", b.len()),
            Self::Writer(_) => f.write_str("ResponseBody::Writer"),
        }
    }
}

/// A response under construction.
#[derive(Debug)]
pub struct Response {
    status: u16,
    reason: String,
    fields: ResponseFields,
    cookies: HashMap<String, String>,
    body: ResponseBody,
}

impl Response {
    /// Creates a response with the given status and reason phrase.
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        debug_assert!((100..=599).contains(&status), "status out of range");
        Self {
            status,
            reason: reason.into(),
            fields: ResponseFields::new(),
            cookies: HashMap::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Creates a response with the canonical reason phrase for `status`.
    pub fn with_status(status: u16) -> Self {
        Self::new(status, canonical_reason(status))
    }

    /// `200 OK`.
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    /// Sets a header, replacing any existing value under that name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.set(name, value);
        self
    }

    /// Appends a header value, turning the entry into a list.
    #[must_use]
    pub fn append_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.append(name, value);
        self
    }

    /// Sets a cookie. The value is emitted verbatim after `name=`, so any
    /// attributes must already be encoded by the caller.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Sets a byte (or string) body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = ResponseBody::Bytes(body.into());
        self
    }

    /// Sets a streaming body. The callback runs after the header block is
    /// flushed and owns the output stream until it returns.
    #[must_use]
    pub fn writer(
        mut self,
        body: impl FnOnce(&mut Conn<'_>) -> io::Result<()> + Send + 'static,
    ) -> Self {
        self.body = ResponseBody::Writer(Box::new(body));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn fields(&self) -> &ResponseFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut ResponseFields {
        &mut self.fields
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn body_ref(&self) -> &ResponseBody {
        &self.body
    }

    /// Splits the response for serialization.
    pub fn into_parts(self) -> (u16, String, ResponseFields, HashMap<String, String>, ResponseBody) {
        (self.status, self.reason, self.fields, self.cookies, self.body)
    }
}

/// Response-side field storage: insertion-ordered, case-preserving, with
/// case-insensitive lookup.
#[derive(Debug, Default)]
pub struct ResponseFields {
    entries: Vec<(String, Vec<String>)>,
}

impl ResponseFields {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Sets `name` to a single value. The case of an already-present name is
    /// preserved; a new name keeps the case given here.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(at) => self.entries[at].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Appends a value under `name`; the entry becomes a list and emits one
    /// wire line per value.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(at) => self.entries[at].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Returns the values under `name`, folding case.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|at| self.entries[at].1.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns true if any value line under `name` contains `token` as a
    /// comma-separated member (case-insensitive). This inspects the
    /// unparsed list form, so `Connection: keep-alive, close` matches
    /// `close`.
    pub fn contains_value(&self, name: &str, token: &str) -> bool {
        self.get(name).is_some_and(|values| {
            values.iter().any(|value| {
                value
                    .split(',')
                    .any(|piece| piece.trim_matches([' ', '\t']).eq_ignore_ascii_case(token))
            })
        })
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The connection object handed to streaming body callbacks.
///
/// Exposes the request, the owning server, both raw streams, and the chunk
/// helpers. After a `101` response this is the upgrade surface: the callback
/// reads the raw input and writes the raw output with no further framing
/// applied. For chunked responses the [`Conn::write_chunk`] /
/// [`Conn::last_chunk`] helpers produce the wire framing.
pub struct Conn<'a> {
    request: &'a mut Request,
    server: Option<&'a (dyn Any + Send + Sync)>,
    input: Option<&'a mut (dyn InputStream + Send)>,
    output: &'a mut dyn Write,
    logger: &'a Logger,
}

impl<'a> Conn<'a> {
    pub fn new(
        request: &'a mut Request,
        server: Option<&'a (dyn Any + Send + Sync)>,
        input: Option<&'a mut (dyn InputStream + Send)>,
        output: &'a mut dyn Write,
        logger: &'a Logger,
    ) -> Self {
        Self {
            request,
            server,
            input,
            output,
            logger,
        }
    }

    pub fn request(&mut self) -> &mut Request {
        self.request
    }

    /// The server driving this connection, when one was attached. Callbacks
    /// that know the concrete type downcast it:
    ///
    /// ```ignore
    /// let server = conn.server().and_then(|s| s.downcast_ref::<Server>());
    /// ```
    pub fn server(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.server
    }

    /// The raw input stream, when the request body did not consume it.
    pub fn input(&mut self) -> Option<&mut (dyn InputStream + Send)> {
        match self.input {
            Some(ref mut s) => Some(&mut **s),
            None => None,
        }
    }

    /// The raw output stream.
    pub fn output(&mut self) -> &mut dyn Write {
        self.output
    }

    pub fn logger(&self) -> &Logger {
        self.logger
    }

    /// Writes one chunk of a chunked response body. `extensions`, when
    /// given, must be a pre-encoded suffix starting with `;`.
    pub fn write_chunk(&mut self, data: &[u8], extensions: Option<&str>) -> io::Result<()> {
        write!(self.output, "{:X}", data.len())?;
        if let Some(ext) = extensions {
            self.output.write_all(ext.as_bytes())?;
        }
        self.output.write_all(b"\r\n")?;
        self.output.write_all(data)?;
        self.output.write_all(b"\r\n")?;
        if self.logger.enabled(LogLevel::Trace) {
            self.logger
                .trace(&format!("> {}", String::from_utf8_lossy(data)));
        }
        Ok(())
    }

    /// Terminates a chunked response body, optionally with trailers.
    pub fn last_chunk(
        &mut self,
        trailers: Option<&[(&str, &str)]>,
        extensions: Option<&str>,
    ) -> io::Result<()> {
        self.output.write_all(b"0")?;
        if let Some(ext) = extensions {
            self.output.write_all(ext.as_bytes())?;
        }
        self.output.write_all(b"\r\n")?;
        if let Some(trailers) = trailers {
            for (name, value) in trailers {
                write!(self.output, "{name}: {value}\r\n")?;
            }
        }
        self.output.write_all(b"\r\n")?;
        self.output.flush()
    }
}

/// The canonical reason phrase for a status code, or `""` when there is
/// none.
pub fn canonical_reason(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        413 => "Content Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        417 => "Expectation Failed",
        426 => "Upgrade Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        505 => "HTTP Version Not Supported",
        _ => "",
    }
}
