//! Listener adapters.
//!
//! A listener yields `(input, output, label)` triples, one per connection.
//! Under socket activation the supervisor has already accepted the socket and
//! wired it to stdin/stdout, so the default listener yields the process's
//! standard streams exactly once. [`MemoryListener`] drives the same pipeline
//! from in-memory buffers for tests.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use monohttp_core::{BufInput, InputStream};

/// One accepted connection.
pub struct Endpoint {
    pub input: Box<dyn InputStream + Send>,
    pub output: Box<dyn Write + Send>,
    pub label: String,
}

/// Source of accepted connections.
pub trait Listener {
    /// Returns the next connection, or `None` when the listener is drained.
    fn accept(&mut self) -> Option<Endpoint>;
}

/// Yields `(stdin, stdout, "(stdio)")` exactly once.
#[derive(Debug, Default)]
pub struct StdioListener {
    served: bool,
}

impl StdioListener {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Listener for StdioListener {
    fn accept(&mut self) -> Option<Endpoint> {
        if self.served {
            return None;
        }
        self.served = true;
        Some(Endpoint {
            input: Box::new(BufInput::buffered(io::stdin())),
            output: Box::new(io::stdout()),
            label: "(stdio)".to_string(),
        })
    }
}

/// A clonable output buffer; the test half of [`MemoryListener`].
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Queues in-memory connections and exposes each connection's output buffer.
#[derive(Debug, Default)]
pub struct MemoryListener {
    queue: VecDeque<(Vec<u8>, SharedBuffer, String)>,
}

impl MemoryListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues one connection whose input is `request` and returns the
    /// buffer its response will be written to.
    pub fn push(&mut self, request: impl Into<Vec<u8>>) -> SharedBuffer {
        let output = SharedBuffer::new();
        let label = format!("(mem-{})", self.queue.len());
        self.queue.push_back((request.into(), output.clone(), label));
        output
    }
}

impl Listener for MemoryListener {
    fn accept(&mut self) -> Option<Endpoint> {
        let (request, output, label) = self.queue.pop_front()?;
        Some(Endpoint {
            input: Box::new(BufInput::new(io::Cursor::new(request))),
            output: Box::new(output),
            label,
        })
    }
}
