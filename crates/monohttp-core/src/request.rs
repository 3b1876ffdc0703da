//! HTTP request model.

use std::collections::HashMap;
use std::fmt;

use crate::body::ChunkStream;
use crate::field::FieldMap;

/// One request cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Request body.
pub enum Body {
    /// No body.
    Empty,
    /// A fixed-length body, fully read.
    Bytes(Vec<u8>),
    /// A chunked body, consumed lazily by the handler.
    Chunked(ChunkStream),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Body::Empty"),
            Self::Bytes(b) => write!(f, "Body::Bytes({} bytes)", b.len()),
            Self::Chunked(stream) => write!(f, "Body::Chunked({stream:?})"),
        }
    }
}

impl Body {
    /// Returns the fixed-length payload, if that is what this body is.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::Chunked(_))
    }
}

/// A parsed request, as handed to handlers.
#[derive(Debug)]
pub struct Request {
    method: String,
    path: String,
    params: HashMap<String, Vec<String>>,
    version: String,
    headers: FieldMap,
    cookies: Vec<Cookie>,
    trailers: FieldMap,
    body: Body,
    matches: Vec<String>,
}

impl Request {
    /// Creates a request with no headers or body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            params: HashMap::new(),
            version: "HTTP/1.1".to_string(),
            headers: FieldMap::new(),
            cookies: Vec::new(),
            trailers: FieldMap::new(),
            body: Body::Empty,
            matches: Vec::new(),
        }
    }

    /// The method token, exactly as received.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The percent-decoded target path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Always `"HTTP/1.1"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Decoded query parameters: key to ordered values.
    pub fn params(&self) -> &HashMap<String, Vec<String>> {
        &self.params
    }

    /// The first value for a query key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn set_params(&mut self, params: HashMap<String, Vec<String>>) {
        self.params = params;
    }

    pub fn headers(&self) -> &FieldMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut FieldMap {
        &mut self.headers
    }

    /// Request cookies, empty if no valid `Cookie` header was received.
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// The first cookie named `name`.
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn set_cookies(&mut self, cookies: Vec<Cookie>) {
        self.cookies = cookies;
    }

    /// Trailer fields. For a chunked body this reads through to the stream,
    /// so it is populated exactly when the iterator has been exhausted; after
    /// the driver reclaims the stream the collected trailers stay available
    /// here.
    pub fn trailers(&self) -> &FieldMap {
        match &self.body {
            Body::Chunked(stream) => stream.trailers(),
            _ => &self.trailers,
        }
    }

    pub fn set_trailers(&mut self, trailers: FieldMap) {
        self.trailers = trailers;
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// Takes the body, leaving `Empty`.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(&mut self.body, Body::Empty)
    }

    /// Pattern captures set by the router before the handler runs.
    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    pub fn set_matches(&mut self, matches: Vec<String>) {
        self.matches = matches;
    }
}
