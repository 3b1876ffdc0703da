//! End-to-end tests driving the full pipeline through in-memory connections.

use std::io::Write;

use monohttp::{
    Body, InputStream, LogCapture, LogLevel, Logger, MemoryListener, Response, Server,
    SharedBuffer,
};

fn quiet_server() -> Server {
    Server::with_logger(Logger::new(
        LogLevel::Error,
        "(test)",
        Box::new(std::io::sink()),
    ))
}

fn serve(server: &Server, request: impl Into<Vec<u8>>) -> String {
    let mut listener = MemoryListener::new();
    let buffer: SharedBuffer = listener.push(request);
    server.run(listener).expect("serve");
    buffer.contents_string()
}

fn status_line(wire: &str) -> &str {
    wire.split("\r\n").next().unwrap()
}

fn body_of(wire: &str) -> &str {
    wire.split_once("\r\n\r\n").unwrap().1
}

// ============================================================================
// 1. Simple GET
// ============================================================================

#[test]
fn simple_get() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/$", |_req| Ok(Response::new(200, "ok").body("hi")))
        .unwrap();

    let wire = serve(&server, &b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"[..]);

    let mut lines = wire.split("\r\n");
    assert_eq!(lines.next().unwrap(), "HTTP/1.1 200 ok");
    let date = lines.next().unwrap();
    assert!(date.starts_with("Date: ") && date.ends_with(" GMT"));
    assert_eq!(lines.next().unwrap(), "Content-Length: 2");
    assert_eq!(lines.next().unwrap(), "Connection: close");
    assert_eq!(lines.next().unwrap(), "");
    assert_eq!(lines.next().unwrap(), "hi");
}

// ============================================================================
// 2. Missing route
// ============================================================================

#[test]
fn missing_method_is_501() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/$", |_req| Ok(Response::ok()))
        .unwrap();

    let wire = serve(&server, &b"PUT /a HTTP/1.1\r\nHost: x\r\n\r\n"[..]);
    assert_eq!(status_line(&wire), "HTTP/1.1 501 Not Implemented");
    assert!(wire.contains("Content-Length: 15\r\n"));
    assert_eq!(body_of(&wire), "not implemented");
}

#[test]
fn missing_pattern_is_404() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/$", |_req| Ok(Response::ok()))
        .unwrap();

    let wire = serve(&server, &b"GET /absent HTTP/1.1\r\nHost: x\r\n\r\n"[..]);
    assert_eq!(status_line(&wire), "HTTP/1.1 404 Not Found");
    assert_eq!(body_of(&wire), "not found");
}

// ============================================================================
// 3. Cookie parsing
// ============================================================================

#[test]
fn valid_cookie_header_parsed_in_order() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/$", |req| {
            let pairs: Vec<_> = req
                .cookies()
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect();
            Ok(Response::ok().body(pairs.join(" ")))
        })
        .unwrap();

    let wire = serve(
        &server,
        &b"GET / HTTP/1.1\r\nCookie: sessionid=abc123; user=\"john_doe\"; theme=dark\r\n\r\n"[..],
    );
    assert_eq!(body_of(&wire), "sessionid=abc123 user=john_doe theme=dark");
}

#[test]
fn invalid_cookie_header_yields_empty_cookies_and_warn() {
    let capture = LogCapture::new();
    let mut server = Server::with_logger(capture.logger(LogLevel::Warn));
    server
        .add_route("GET", "^/$", |req| {
            assert!(req.cookies().is_empty());
            Ok(Response::ok().body("none"))
        })
        .unwrap();

    let wire = serve(
        &server,
        &b"GET / HTTP/1.1\r\nCookie: sessionid=abc123 ;user=badsep\r\n\r\n"[..],
    );
    assert_eq!(body_of(&wire), "none");
    assert!(capture.contains("WARN"));
    assert!(capture.contains("invalid cookie header"));
}

// ============================================================================
// 4. Chunked body with trailers
// ============================================================================

#[test]
fn chunked_body_with_trailers() {
    let mut server = quiet_server();
    server
        .add_route("POST", "^/upload$", |req| {
            let mut seen = Vec::new();
            if let Body::Chunked(stream) = req.body_mut() {
                for chunk in stream.by_ref() {
                    let chunk = chunk?;
                    assert!(chunk.extensions.is_empty());
                    assert_eq!(chunk.extensions_raw, "");
                    seen.push(String::from_utf8(chunk.data).unwrap());
                }
            }
            assert_eq!(seen, ["Hello", " World"]);
            let trailer = req.trailers().get("x-t").unwrap().concat(", ");
            Ok(Response::ok().body(format!("{}|{}", seen.join(""), trailer)))
        })
        .unwrap();

    let wire = serve(
        &server,
        &b"POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHello\r\n6\r\n World\r\n0\r\nX-T: v\r\n\r\n"[..],
    );
    assert_eq!(body_of(&wire), "Hello World|v");
}

// ============================================================================
// 5. Repeated header collapses into one elements list
// ============================================================================

#[test]
fn repeated_accept_headers_aggregate_elements() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/$", |req| {
            let accept = req.headers().get("accept").expect("accept present");
            let elements = accept.elements();
            assert_eq!(elements.len(), 2);
            assert_eq!(elements[0].value(), Some("text/plain"));
            assert!(elements[0].params().is_empty());
            assert_eq!(elements[1].value(), Some("text/html"));
            assert_eq!(
                elements[1].param("q").and_then(|p| p.value()),
                Some("0.8")
            );
            Ok(Response::ok().body("checked"))
        })
        .unwrap();

    let wire = serve(
        &server,
        &b"GET / HTTP/1.1\r\nAccept: text/plain\r\nAccept: text/html;q=0.8\r\n\r\n"[..],
    );
    assert_eq!(body_of(&wire), "checked");
}

// ============================================================================
// 6. Malformed structured field downgrades
// ============================================================================

#[test]
fn two_bare_tokens_downgrade_to_raw_only() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/$", |req| {
            let field = req.headers().get("x").expect("x present");
            assert_eq!(field.raw(), ["a b"]);
            assert!(field.elements().is_empty());
            assert_eq!(field.concat(", "), "a b");
            Ok(Response::ok().body("downgraded"))
        })
        .unwrap();

    let wire = serve(&server, &b"GET / HTTP/1.1\r\nX: a b\r\n\r\n"[..]);
    assert_eq!(body_of(&wire), "downgraded");
}

// ============================================================================
// Further pipeline behavior
// ============================================================================

#[test]
fn query_parameters_decoded() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/search$", |req| {
            let q = req.param("q").unwrap_or("").to_string();
            let tags = req.params().get("tag").cloned().unwrap_or_default();
            Ok(Response::ok().body(format!("{q}|{}", tags.join(","))))
        })
        .unwrap();

    let wire = serve(
        &server,
        &b"GET /search?q=hello+world&tag=a&tag=b%26c HTTP/1.1\r\n\r\n"[..],
    );
    assert_eq!(body_of(&wire), "hello world|a,b&c");
}

#[test]
fn router_captures_visible_to_handler() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/items/([0-9]+)$", |req| {
            Ok(Response::ok().body(req.matches()[0].clone()))
        })
        .unwrap();

    let wire = serve(&server, &b"GET /items/42 HTTP/1.1\r\n\r\n"[..]);
    assert_eq!(body_of(&wire), "42");
}

#[test]
fn handler_error_is_500_with_cause_logged() {
    let capture = LogCapture::new();
    let mut server = Server::with_logger(capture.logger(LogLevel::Error));
    server
        .add_route("GET", "^/$", |_req| Err("database unavailable".into()))
        .unwrap();

    let wire = serve(&server, &b"GET / HTTP/1.1\r\n\r\n"[..]);
    assert_eq!(status_line(&wire), "HTTP/1.1 500 Internal Server Error");
    assert_eq!(body_of(&wire), "internal server error");
    assert!(wire.contains("Connection: close\r\n"));
    assert!(capture.contains("handler failed: database unavailable"));
}

#[test]
fn handler_body_error_is_400() {
    let capture = LogCapture::new();
    let mut server = Server::with_logger(capture.logger(LogLevel::Error));
    server
        .add_route("POST", "^/$", |req| {
            if let Body::Chunked(stream) = req.body_mut() {
                for chunk in stream.by_ref() {
                    chunk?;
                }
            }
            Ok(Response::ok())
        })
        .unwrap();

    let wire = serve(
        &server,
        &b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nnothex\r\n"[..],
    );
    assert_eq!(status_line(&wire), "HTTP/1.1 400 Bad Request");
    assert_eq!(body_of(&wire), "bad request");
    assert!(capture.contains("request body failed"));
}

#[test]
fn head_request_suppresses_body() {
    let mut server = quiet_server();
    server
        .add_route("HEAD", "^/$", |_req| Ok(Response::ok().body("hidden")))
        .unwrap();

    let wire = serve(&server, &b"HEAD / HTTP/1.1\r\n\r\n"[..]);
    assert!(wire.contains("Content-Length: 6\r\n"));
    assert_eq!(body_of(&wire), "");
}

#[test]
fn upgrade_handler_owns_the_stream() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/ws$", |_req| {
            Ok(Response::new(101, "Switching Protocols")
                .header("Connection", "Upgrade")
                .header("Upgrade", "echo-frames")
                .writer(|conn| {
                    let line = conn.input().expect("input available").read_line()?;
                    conn.output().write_all(b"frame:")?;
                    conn.output().write_all(&line)
                }))
        })
        .unwrap();

    let wire = serve(&server, &b"GET /ws HTTP/1.1\r\nUpgrade: echo-frames\r\n\r\npayload\r\n"[..]);
    assert_eq!(status_line(&wire), "HTTP/1.1 101 Switching Protocols");
    assert!(wire.contains("Connection: Upgrade\r\n"));
    assert!(!wire.contains("Connection: close"));
    assert!(wire.ends_with("\r\n\r\nframe:payload\r\n"));
}

#[test]
fn streaming_callback_can_reach_the_server() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/ws$", |_req| {
            Ok(Response::new(101, "Switching Protocols").writer(|conn| {
                let routes = conn
                    .server()
                    .and_then(|s| s.downcast_ref::<Server>())
                    .map_or(0, |server| server.route_count("GET"));
                conn.output().write_all(format!("routes:{routes}").as_bytes())
            }))
        })
        .unwrap();

    let wire = serve(&server, &b"GET /ws HTTP/1.1\r\n\r\n"[..]);
    assert!(wire.ends_with("\r\n\r\nroutes:1"));
}

#[test]
fn response_cookies_emitted() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/$", |_req| {
            Ok(Response::ok()
                .cookie("session", "abc; Path=/; HttpOnly")
                .body("ok"))
        })
        .unwrap();

    let wire = serve(&server, &b"GET / HTTP/1.1\r\n\r\n"[..]);
    assert!(wire.contains("Set-Cookie: session=abc; Path=/; HttpOnly\r\n"));
}

#[test]
fn fixed_length_body_to_handler() {
    let mut server = quiet_server();
    server
        .add_route("POST", "^/sum$", |req| {
            let total: u64 = std::str::from_utf8(req.body().bytes().unwrap_or_default())
                .unwrap_or("")
                .split('+')
                .filter_map(|n| n.trim().parse::<u64>().ok())
                .sum();
            Ok(Response::ok().body(total.to_string()))
        })
        .unwrap();

    let wire = serve(
        &server,
        &b"POST /sum HTTP/1.1\r\nContent-Length: 7\r\n\r\n19+23+0"[..],
    );
    assert_eq!(body_of(&wire), "42");
}

#[test]
fn multiple_connections_served_in_sequence() {
    let mut server = quiet_server();
    server
        .add_route("GET", "^/n/([0-9]+)$", |req| {
            Ok(Response::ok().body(req.matches()[0].clone()))
        })
        .unwrap();

    let mut listener = MemoryListener::new();
    let first = listener.push(&b"GET /n/1 HTTP/1.1\r\n\r\n"[..]);
    let second = listener.push(&b"GET /n/2 HTTP/1.1\r\n\r\n"[..]);
    server.run(listener).unwrap();

    assert!(first.contents_string().ends_with("\r\n\r\n1"));
    assert!(second.contents_string().ends_with("\r\n\r\n2"));
}
