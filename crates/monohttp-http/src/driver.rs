//! The per-connection state machine.
//!
//! One driver serves exactly one request: start line, header fields, body,
//! dispatch, response, close. The supervisor provides concurrency by running
//! one process per accepted connection, so closing here means the process is
//! done.
//!
//! The header loop is tolerant — malformed start lines and header lines are
//! logged at WARN and skipped — while body framing is strict: an unusable
//! Transfer-Encoding, a Content-Length that cannot be honored, or broken
//! chunk framing each produce a `400` and close the connection.

use std::any::Any;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use monohttp_core::{
    Body, BodyError, ChunkStream, InputStream, Logger, Request, Response, TracedInput, config,
};

use crate::cookie::parse_cookie_header;
use crate::parser::parse_request_line;
use crate::writer::ResponseWriter;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Waiting for a valid request line.
    StartLine,
    /// Reading header fields.
    HeaderField,
    /// A chunked body is in flight; trailer fields arrive through it.
    TrailerField,
    /// Writing the response.
    Response,
    /// Both streams released.
    Closed,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartLine => "START_LINE",
            Self::HeaderField => "HEADER_FIELD",
            Self::TrailerField => "TRAILER_FIELD",
            Self::Response => "RESPONSE",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// How the request body will be delivered, decided from the header fields.
enum BodyPlan {
    None,
    Fixed(usize),
    Chunked,
}

/// Coerces a `'static`-bounded trait object reference down to the caller's
/// lifetime; needed because that coercion does not reach through `Option`.
fn shorten_input<'b>(
    input: &'b mut (dyn InputStream + Send + 'static),
) -> &'b mut (dyn InputStream + Send) {
    input
}

/// Drives one connection through the request pipeline.
///
/// The dispatch function receives the parsed request and must return a
/// response; route lookup and handler-error mapping live behind it.
pub struct Driver<'s, F> {
    dispatch: F,
    logger: Arc<Logger>,
    server: Option<&'s (dyn Any + Send + Sync)>,
}

impl<'s, F> Driver<'s, F>
where
    F: FnMut(&mut Request) -> Response,
{
    pub fn new(dispatch: F, logger: Arc<Logger>) -> Self {
        Self {
            dispatch,
            logger,
            server: None,
        }
    }

    /// Attaches the owning server; streaming body callbacks reach it through
    /// [`monohttp_core::Conn::server`].
    #[must_use]
    pub fn with_server(mut self, server: &'s (dyn Any + Send + Sync)) -> Self {
        self.server = Some(server);
        self
    }

    /// Serves one request from `input` and writes the response to `output`.
    ///
    /// Returns the terminal state: always [`ConnState::Closed`] unless the
    /// peer went away before sending a request.
    pub fn run(
        &mut self,
        input: Box<dyn InputStream + Send>,
        output: &mut dyn Write,
    ) -> io::Result<ConnState> {
        let mut state = ConnState::StartLine;
        let mut input: Box<dyn InputStream + Send> =
            Box::new(TracedInput::new(input, Arc::clone(&self.logger)));

        // Tolerant of blank lines and noise ahead of the request.
        let request_line = loop {
            let line = input.read_line()?;
            if line.is_empty() {
                self.logger.debug("input closed before a request line");
                self.logger.flush();
                return Ok(ConnState::Closed);
            }
            match parse_request_line(&line) {
                Some(request_line) => break request_line,
                None => self.logger.warn(&format!(
                    "malformed start line: {:?}",
                    String::from_utf8_lossy(&line)
                )),
            }
        };
        self.advance(&mut state, ConnState::HeaderField);

        let mut request = Request::new(request_line.method.clone(), request_line.path());
        request.set_params(request_line.params());

        let mut cookie_seen = false;
        loop {
            let line = input.read_line()?;
            if line.is_empty() {
                self.logger.error("input closed inside header fields");
                return self.refuse(output, &mut request, state, "bad request");
            }
            if line == b"\r\n" {
                break;
            }
            match monohttp_core::parse_field_line(&line) {
                Some((name, value)) if name.eq_ignore_ascii_case("cookie") => {
                    if cookie_seen {
                        continue;
                    }
                    cookie_seen = true;
                    match parse_cookie_header(&value) {
                        Some(cookies) => request.set_cookies(cookies),
                        None => self
                            .logger
                            .warn(&format!("invalid cookie header: {value:?}")),
                    }
                }
                Some((name, value)) => request.headers_mut().append(&name, &value),
                None => self.logger.warn(&format!(
                    "malformed header line: {:?}",
                    String::from_utf8_lossy(&line)
                )),
            }
        }

        let mut input_slot: Option<Box<dyn InputStream + Send>> = Some(input);
        match body_plan(&request) {
            Err(error) => {
                self.logger.error(&format!("unusable request body: {error}"));
                return self.refuse(output, &mut request, state, "bad request");
            }
            Ok(BodyPlan::None) => {}
            Ok(BodyPlan::Fixed(length)) => {
                let payload = input_slot
                    .as_mut()
                    .map(|input| input.read_bytes(length))
                    .transpose();
                match payload {
                    Ok(Some(payload)) => request.set_body(Body::Bytes(payload)),
                    Ok(None) => {}
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        let error = BodyError::ShortRead { expected: length };
                        self.logger.error(&format!("unusable request body: {error}"));
                        return self.refuse(output, &mut request, state, "bad request");
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(BodyPlan::Chunked) => {
                self.advance(&mut state, ConnState::TrailerField);
                if let Some(input) = input_slot.take() {
                    request.set_body(Body::Chunked(ChunkStream::new(
                        input,
                        config::max_chunk_size(),
                    )));
                }
            }
        }

        let response = (self.dispatch)(&mut request);
        self.advance(&mut state, ConnState::Response);

        // A chunked body owned the input stream; take it back so an upgrade
        // callback can use it, and keep the collected trailers readable.
        if let Body::Chunked(stream) = request.take_body() {
            let (input, trailers) = stream.into_parts();
            request.set_trailers(trailers);
            input_slot = Some(input);
        }

        ResponseWriter::new(output, &self.logger).send(
            response,
            &mut request,
            self.server,
            input_slot.as_deref_mut().map(shorten_input),
            true,
        )?;

        self.advance(&mut state, ConnState::Closed);
        self.logger.flush();
        Ok(state)
    }

    fn advance(&self, state: &mut ConnState, to: ConnState) {
        self.logger.debug(&format!("connection {state} -> {to}"));
        *state = to;
    }

    /// Emits a `400`, closes, and reports the terminal state.
    fn refuse(
        &self,
        output: &mut dyn Write,
        request: &mut Request,
        mut state: ConnState,
        body: &str,
    ) -> io::Result<ConnState> {
        self.advance(&mut state, ConnState::Response);
        let response = Response::new(400, "Bad Request").body(body);
        ResponseWriter::new(output, &self.logger).send(response, request, self.server, None, true)?;
        self.advance(&mut state, ConnState::Closed);
        self.logger.flush();
        Ok(state)
    }
}

/// Applies the body selection rule to the parsed header fields.
fn body_plan(request: &Request) -> Result<BodyPlan, BodyError> {
    let headers = request.headers();

    if let Some(te) = headers.get("transfer-encoding") {
        if headers.contains("content-length") {
            return Err(BodyError::ConflictingLength);
        }
        let final_coding = te
            .elements()
            .last()
            .and_then(|element| element.value())
            .unwrap_or("");
        if !final_coding.eq_ignore_ascii_case("chunked") {
            return Err(BodyError::UnsupportedTransferEncoding(te.concat(", ")));
        }
        return Ok(BodyPlan::Chunked);
    }

    if let Some(cl) = headers.get("content-length") {
        // Last value wins.
        let raw = cl
            .unvalidated()
            .last()
            .map(|value| value.trim_matches([' ', '\t']))
            .unwrap_or("");
        let length: usize = raw
            .parse()
            .map_err(|_| BodyError::InvalidContentLength(raw.to_string()))?;
        if length == 0 {
            return Ok(BodyPlan::None);
        }
        return Ok(BodyPlan::Fixed(length));
    }

    Ok(BodyPlan::None)
}
