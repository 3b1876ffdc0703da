//! Response serialization.
//!
//! Emission order is status line, headers, cookies, blank line, body. Three
//! headers are inserted automatically when absent: `Date` (RFC 1123 GMT),
//! `Content-Length` (byte bodies only), and `Connection: close` whenever the
//! driver will close afterwards — except on a `101` switching-protocols
//! response, whose writer callback takes the connection over instead.

use std::any::Any;
use std::io::{self, Write};
use std::time::SystemTime;

use monohttp_core::{
    Conn, InputStream, LogLevel, Logger, Request, Response, ResponseBody,
};

/// Serializes responses onto an output stream.
pub struct ResponseWriter<'a> {
    output: &'a mut dyn Write,
    logger: &'a Logger,
}

/// Shortens the output stream's borrow (and its trait-object lifetime bound)
/// to match the other streaming-callback arguments; needed because a plain
/// reborrow only shrinks the outer reference, not the embedded bound.
fn shorten_output<'x, 'y>(output: &'x mut (dyn Write + 'x)) -> &'y mut (dyn Write + 'y)
where
    'x: 'y,
{
    output
}

/// Same shortening as [`shorten_output`], for the optional input stream.
fn shorten_input<'x, 'y>(
    input: Option<&'x mut (dyn InputStream + Send + 'x)>,
) -> Option<&'y mut (dyn InputStream + Send + 'y)>
where
    'x: 'y,
{
    match input {
        Some(i) => Some(i),
        None => None,
    }
}

impl<'a> ResponseWriter<'a> {
    pub fn new(output: &'a mut dyn Write, logger: &'a Logger) -> Self {
        Self { output, logger }
    }

    /// Writes `response` for `request` and flushes.
    ///
    /// `server` and `input` are only handed on to a streaming body callback:
    /// the server handle lets the callback reach its owner, and the input
    /// stream (when the request body did not consume it) is what protocol
    /// upgrades read from. `close` states whether the driver closes the
    /// connection after this response.
    pub fn send<'b>(
        self,
        response: Response,
        request: &'b mut Request,
        server: Option<&'b (dyn Any + Send + Sync)>,
        input: Option<&'b mut (dyn InputStream + Send)>,
        close: bool,
    ) -> io::Result<()>
    where
        'a: 'b,
    {
        let (status, reason, mut fields, cookies, body) = response.into_parts();

        let head = request.method() == "HEAD";
        let bodiless_status = matches!(status, 100..=199 | 204 | 304);
        let upgrade = status == 101 && matches!(body, ResponseBody::Writer(_));

        if !fields.contains("date") {
            fields.set("Date", httpdate::fmt_http_date(SystemTime::now()));
        }
        if let ResponseBody::Bytes(bytes) = &body {
            if !bodiless_status && !fields.contains("content-length") {
                fields.set("Content-Length", bytes.len().to_string());
            }
        }
        if close && !upgrade && !fields.contains_value("connection", "close") {
            fields.append("Connection", "close");
        }

        write!(self.output, "HTTP/1.1 {status} {reason}\r\n")?;
        for (name, values) in fields.iter() {
            for value in values {
                write!(self.output, "{name}: {value}\r\n")?;
            }
        }
        for (name, value) in &cookies {
            write!(self.output, "Set-Cookie: {name}={value}\r\n")?;
        }
        self.output.write_all(b"\r\n")?;

        match body {
            ResponseBody::Empty => {}
            ResponseBody::Bytes(bytes) => {
                if !head && !bodiless_status {
                    self.output.write_all(&bytes)?;
                    if self.logger.enabled(LogLevel::Trace) {
                        self.logger
                            .trace(&format!("> {}", String::from_utf8_lossy(&bytes)));
                    }
                }
            }
            ResponseBody::Writer(callback) => {
                if !head && (!bodiless_status || upgrade) {
                    // The callback owns the raw stream from here until it
                    // returns; no further framing is applied.
                    self.output.flush()?;
                    let mut conn = Conn::new(
                        request,
                        server,
                        shorten_input(input),
                        shorten_output(self.output),
                        self.logger,
                    );
                    callback(&mut conn)?;
                }
            }
        }

        self.output.flush()
    }
}
