//! Chunked request-body decoding.
//!
//! [`ChunkStream`] owns the connection's input stream for the duration of the
//! body and yields one [`Chunk`] per wire chunk, strictly in wire order. A
//! zero-length chunk terminates the body; trailer fields are then read up to
//! the blank line and become available through [`ChunkStream::trailers`] —
//! reading trailers before exhausting the iterator yields an empty map.

use std::collections::HashMap;
use std::fmt;
use std::io;

use crate::field::{FieldMap, parse_field_line};
use crate::stream::InputStream;

/// A chunk-extension value: `;name` is a flag, `;name=v` or `;name="v"` carry
/// a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionValue {
    Flag,
    Value(String),
}

/// One decoded chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk payload.
    pub data: Vec<u8>,
    /// Parsed extensions; names may repeat, so each maps to a list.
    pub extensions: HashMap<String, Vec<ExtensionValue>>,
    /// The raw extension suffix exactly as received (empty when absent).
    pub extensions_raw: String,
}

/// Body framing failure.
#[derive(Debug)]
pub enum BodyError {
    /// The final Transfer-Encoding coding was not `chunked`.
    UnsupportedTransferEncoding(String),
    /// Both Transfer-Encoding and Content-Length were present.
    ConflictingLength,
    /// Content-Length did not parse as a decimal integer.
    InvalidContentLength(String),
    /// The stream ended before the declared Content-Length was read.
    ShortRead { expected: usize },
    /// A chunk size line did not parse as hex.
    InvalidChunkSize(String),
    /// A chunk announced a size above the configured cap.
    ChunkTooLarge { size: usize, limit: usize },
    /// Chunk data was not followed by CRLF.
    InvalidChunkTerminator,
    /// The input stream failed.
    Io(io::Error),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedTransferEncoding(coding) => {
                write!(f, "unsupported transfer-encoding {coding:?}")
            }
            Self::ConflictingLength => {
                write!(f, "both transfer-encoding and content-length present")
            }
            Self::InvalidContentLength(value) => write!(f, "invalid content-length {value:?}"),
            Self::ShortRead { expected } => {
                write!(f, "body ended before {expected} declared bytes")
            }
            Self::InvalidChunkSize(line) => write!(f, "invalid chunk size line {line:?}"),
            Self::ChunkTooLarge { size, limit } => {
                write!(f, "chunk of {size} bytes exceeds limit of {limit}")
            }
            Self::InvalidChunkTerminator => write!(f, "chunk data not terminated by CRLF"),
            Self::Io(e) => write!(f, "body read failed: {e}"),
        }
    }
}

impl std::error::Error for BodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BodyError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Lazy decoder for a chunked request body.
pub struct ChunkStream {
    input: Box<dyn InputStream + Send>,
    max_chunk_size: usize,
    trailers: FieldMap,
    done: bool,
    failed: bool,
}

impl fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkStream")
            .field("max_chunk_size", &self.max_chunk_size)
            .field("done", &self.done)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl ChunkStream {
    /// Takes ownership of the input stream until the body is exhausted.
    pub fn new(input: Box<dyn InputStream + Send>, max_chunk_size: usize) -> Self {
        Self {
            input,
            max_chunk_size,
            trailers: FieldMap::new(),
            done: false,
            failed: false,
        }
    }

    /// Trailer fields. Populated only once the iterator has yielded its
    /// terminator; empty before that.
    pub fn trailers(&self) -> &FieldMap {
        &self.trailers
    }

    /// True once the zero chunk and trailers were consumed.
    pub fn is_exhausted(&self) -> bool {
        self.done
    }

    /// True if decoding failed; the connection is no longer framed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Releases the input stream and the collected trailers.
    pub fn into_parts(self) -> (Box<dyn InputStream + Send>, FieldMap) {
        (self.input, self.trailers)
    }

    fn read_next(&mut self) -> Result<Option<Chunk>, BodyError> {
        let line = self.input.read_line()?;
        let Some(body) = line.strip_suffix(b"\r\n") else {
            return Err(BodyError::InvalidChunkSize(
                String::from_utf8_lossy(&line).into_owned(),
            ));
        };
        let body = std::str::from_utf8(body)
            .map_err(|_| BodyError::InvalidChunkSize(String::from_utf8_lossy(body).into_owned()))?;

        let (size_part, extensions_raw) = match body.find(';') {
            Some(at) => (&body[..at], &body[at..]),
            None => (body, ""),
        };
        let size = usize::from_str_radix(size_part, 16)
            .map_err(|_| BodyError::InvalidChunkSize(body.to_string()))?;
        if size > self.max_chunk_size {
            return Err(BodyError::ChunkTooLarge {
                size,
                limit: self.max_chunk_size,
            });
        }

        if size == 0 {
            self.read_trailers()?;
            self.done = true;
            return Ok(None);
        }

        let data = self.input.read_bytes(size)?;
        let terminator = self.input.read_bytes(2)?;
        if terminator != b"\r\n" {
            return Err(BodyError::InvalidChunkTerminator);
        }

        Ok(Some(Chunk {
            data,
            extensions: parse_extensions(extensions_raw),
            extensions_raw: extensions_raw.to_string(),
        }))
    }

    fn read_trailers(&mut self) -> Result<(), BodyError> {
        loop {
            let line = self.input.read_line()?;
            if line.is_empty() {
                return Err(BodyError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input ended inside trailers",
                )));
            }
            if line == b"\r\n" {
                return Ok(());
            }
            if let Some((name, value)) = parse_field_line(&line) {
                self.trailers.append(&name, &value);
            }
        }
    }
}

impl Iterator for ChunkStream {
    type Item = Result<Chunk, BodyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.failed {
            return None;
        }
        match self.read_next() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Parses the raw extension suffix (`";name" / ";name=value" /
/// ";name=\"quoted\""`, repeated) into a map. Repeated names accumulate.
/// Parsing stops at the first malformed piece; the raw suffix is preserved by
/// the caller regardless.
fn parse_extensions(raw: &str) -> HashMap<String, Vec<ExtensionValue>> {
    let mut out: HashMap<String, Vec<ExtensionValue>> = HashMap::new();
    let bytes = raw.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b';' {
            break;
        }
        i += 1;
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }

        let name_start = i;
        while i < bytes.len() && crate::fieldlex::is_tchar(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            break;
        }
        let name = &raw[name_start..i];

        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }

        if i >= bytes.len() || bytes[i] != b'=' {
            out.entry(name.to_string())
                .or_default()
                .push(ExtensionValue::Flag);
            continue;
        }
        i += 1;
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }

        let value = if i < bytes.len() && bytes[i] == b'"' {
            i += 1;
            let mut value = String::new();
            let mut closed = false;
            while i < bytes.len() {
                match bytes[i] {
                    b'"' => {
                        i += 1;
                        closed = true;
                        break;
                    }
                    b'\\' if i + 1 < bytes.len() => {
                        value.push(bytes[i + 1] as char);
                        i += 2;
                    }
                    b => {
                        value.push(b as char);
                        i += 1;
                    }
                }
            }
            if !closed {
                break;
            }
            value
        } else {
            let start = i;
            while i < bytes.len() && bytes[i] != b';' {
                i += 1;
            }
            raw[start..i].trim_end_matches([' ', '\t']).to_string()
        };

        out.entry(name.to_string())
            .or_default()
            .push(ExtensionValue::Value(value));
    }

    out
}
