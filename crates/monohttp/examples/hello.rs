//! Minimal router demo.
//!
//! Run under a socket-activation supervisor, or pipe a request in by hand:
//!
//! ```text
//! printf 'GET /hello/world HTTP/1.1\r\nHost: x\r\n\r\n' | cargo run --example hello
//! ```

use monohttp::{Response, Server, StdioListener};

fn main() -> std::io::Result<()> {
    let mut server = Server::new();

    server
        .add_route("GET", "^/$", |_req| {
            Ok(Response::ok().body("try GET /hello/<name>\n"))
        })
        .expect("valid pattern");

    server
        .add_route("GET", "^/hello/([a-z]+)$", |req| {
            let name = req.matches()[0].clone();
            Ok(Response::ok()
                .header("Content-Type", "text/plain")
                .body(format!("hello, {name}\n")))
        })
        .expect("valid pattern");

    server.run(StdioListener::new())
}
