//! Streams a chunked request body back as a chunked response.
//!
//! ```text
//! printf 'POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHello\r\n0\r\n\r\n' \
//!     | cargo run --example chunked_echo
//! ```

use monohttp::{Body, Response, Server, StdioListener};

fn main() -> std::io::Result<()> {
    let mut server = Server::new();

    server
        .add_route("POST", "^/echo$", |req| {
            let mut chunks = Vec::new();
            if let Body::Chunked(stream) = req.body_mut() {
                for chunk in stream.by_ref() {
                    chunks.push(chunk?.data);
                }
            }
            Ok(Response::ok()
                .header("Transfer-Encoding", "chunked")
                .writer(move |conn| {
                    for chunk in &chunks {
                        conn.write_chunk(chunk, None)?;
                    }
                    conn.last_chunk(Some(&[("X-Echoed", "yes")]), None)
                }))
        })
        .expect("valid pattern");

    server.run(StdioListener::new())
}
