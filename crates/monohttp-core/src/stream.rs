//! The accept-boundary input abstraction.
//!
//! The supervisor hands the core a byte stream that must support two reads:
//! one newline-terminated line (with the terminator included in the returned
//! bytes) and an exact number of raw bytes. [`BufInput`] adapts any
//! [`BufRead`]; [`TracedInput`] decorates another input and logs every
//! consumed line at TRACE.

use std::io::{self, BufRead, Read};
use std::sync::Arc;

use crate::logging::{LogLevel, Logger};

/// A blocking, line-oriented byte source.
pub trait InputStream {
    /// Reads one line including its terminator.
    ///
    /// Returns an empty buffer at end of input. The returned bytes end with
    /// `\n` when a terminator was seen; a final unterminated fragment is
    /// returned as-is.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Reads exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::UnexpectedEof` if the stream ends early.
    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>>;
}

impl<T: InputStream + ?Sized> InputStream for Box<T> {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_line()
    }

    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        (**self).read_bytes(len)
    }
}

impl<T: InputStream + ?Sized> InputStream for &mut T {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_line()
    }

    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        (**self).read_bytes(len)
    }
}

/// Adapts any [`BufRead`] into an [`InputStream`].
#[derive(Debug)]
pub struct BufInput<R> {
    inner: R,
}

impl<R: BufRead> BufInput<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> InputStream for BufInput<R> {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        self.inner.read_until(b'\n', &mut line)?;
        Ok(line)
    }

    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Decorator that logs every consumed line at TRACE with a `<` marker.
pub struct TracedInput {
    inner: Box<dyn InputStream + Send>,
    logger: Arc<Logger>,
}

impl TracedInput {
    pub fn new(inner: Box<dyn InputStream + Send>, logger: Arc<Logger>) -> Self {
        Self { inner, logger }
    }
}

impl InputStream for TracedInput {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let line = self.inner.read_line()?;
        if self.logger.enabled(LogLevel::Trace) {
            let text = String::from_utf8_lossy(&line);
            self.logger
                .trace(&format!("< {}", text.trim_end_matches(['\r', '\n'])));
        }
        Ok(line)
    }

    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        self.inner.read_bytes(len)
    }
}

impl<R: Read> BufInput<io::BufReader<R>> {
    /// Wraps a raw reader in a buffered input.
    pub fn buffered(inner: R) -> Self {
        Self::new(io::BufReader::new(inner))
    }
}
