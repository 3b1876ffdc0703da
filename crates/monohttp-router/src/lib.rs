//! Regex route table with first-match dispatch.
//!
//! Routes are registered per method in insertion order. Dispatch walks the
//! method's list and the first pattern producing a non-empty match wins; its
//! capture groups are stored in [`Request::matches`] before the handler runs.
//! Patterns carry their own anchors (`"^/items/([0-9]+)$"`).

#![forbid(unsafe_code)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]

use std::collections::HashMap;
use std::fmt;

use monohttp_core::{HandlerError, Request, Response};
use regex::Regex;

/// A registered handler.
pub type Handler = Box<dyn Fn(&mut Request) -> Result<Response, HandlerError> + Send + Sync>;

/// Route registration failure: the pattern did not compile.
#[derive(Debug)]
pub struct RouteError {
    pattern: String,
    source: regex::Error,
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid route pattern {:?}: {}", self.pattern, self.source)
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Outcome of a dispatch attempt.
pub enum Dispatch {
    /// A route matched; this is the handler's result.
    Handled(Result<Response, HandlerError>),
    /// No routes exist for the request method.
    NoMethod,
    /// Routes exist for the method but none matched the path.
    NoMatch,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handled(Ok(r)) => write!(f, "Dispatch::Handled(status {})", r.status()),
            Self::Handled(Err(e)) => write!(f, "Dispatch::Handled(error {e})"),
            Self::NoMethod => f.write_str("Dispatch::NoMethod"),
            Self::NoMatch => f.write_str("Dispatch::NoMatch"),
        }
    }
}

struct Route {
    pattern: Regex,
    handler: Handler,
}

/// Per-method ordered route lists.
#[derive(Default)]
pub struct Router {
    routes: HashMap<String, Vec<Route>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (method, routes) in &self.routes {
            map.entry(
                method,
                &routes
                    .iter()
                    .map(|r| r.pattern.as_str())
                    .collect::<Vec<_>>(),
            );
        }
        map.finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. `method` is matched case-exactly; `pattern` is a
    /// regex tried against the decoded request path.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] if the pattern does not compile.
    pub fn add_route<H>(&mut self, method: &str, pattern: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Request) -> Result<Response, HandlerError> + Send + Sync + 'static,
    {
        let pattern = Regex::new(pattern).map_err(|source| RouteError {
            pattern: pattern.to_string(),
            source,
        })?;
        self.routes.entry(method.to_string()).or_default().push(Route {
            pattern,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Returns the number of routes registered for `method`.
    pub fn route_count(&self, method: &str) -> usize {
        self.routes.get(method).map_or(0, Vec::len)
    }

    /// Dispatches a request to the first matching route.
    pub fn dispatch(&self, request: &mut Request) -> Dispatch {
        let Some(routes) = self.routes.get(request.method()) else {
            return Dispatch::NoMethod;
        };
        for route in routes {
            let Some(captures) = route.pattern.captures(request.path()) else {
                continue;
            };
            let whole = captures.get(0).map_or("", |m| m.as_str());
            if whole.is_empty() {
                continue;
            }
            let matches = captures
                .iter()
                .skip(1)
                .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect();
            request.set_matches(matches);
            return Dispatch::Handled((route.handler)(request));
        }
        Dispatch::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_with_body(body: &'static str) -> Handler {
        Box::new(move |_req| Ok(Response::ok().body(body)))
    }

    fn dispatch_status(router: &Router, method: &str, path: &str) -> Option<u16> {
        let mut request = Request::new(method, path);
        match router.dispatch(&mut request) {
            Dispatch::Handled(Ok(response)) => Some(response.status()),
            _ => None,
        }
    }

    #[test]
    fn first_match_wins_in_insertion_order() {
        let mut router = Router::new();
        router
            .add_route("GET", "^/items/special$", |_req| {
                Ok(Response::with_status(204))
            })
            .unwrap();
        router
            .add_route("GET", "^/items/.*$", |_req| Ok(Response::ok()))
            .unwrap();

        assert_eq!(dispatch_status(&router, "GET", "/items/special"), Some(204));
        assert_eq!(dispatch_status(&router, "GET", "/items/other"), Some(200));
    }

    #[test]
    fn captures_stored_on_request() {
        let mut router = Router::new();
        router
            .add_route("GET", "^/users/([0-9]+)/posts/([0-9]+)$", |req| {
                let matches = req.matches().to_vec();
                Ok(Response::ok().body(matches.join(",")))
            })
            .unwrap();

        let mut request = Request::new("GET", "/users/42/posts/7");
        match router.dispatch(&mut request) {
            Dispatch::Handled(Ok(response)) => {
                assert!(matches!(response.body_ref(),
                    monohttp_core::ResponseBody::Bytes(b) if b == b"42,7"));
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
        assert_eq!(request.matches(), ["42", "7"]);
    }

    #[test]
    fn no_routes_for_method() {
        let mut router = Router::new();
        router.add_route("GET", "^/$", ok_with_body("hi")).unwrap();
        let mut request = Request::new("PUT", "/");
        assert!(matches!(router.dispatch(&mut request), Dispatch::NoMethod));
    }

    #[test]
    fn no_pattern_match() {
        let mut router = Router::new();
        router.add_route("GET", "^/$", ok_with_body("hi")).unwrap();
        let mut request = Request::new("GET", "/missing");
        assert!(matches!(router.dispatch(&mut request), Dispatch::NoMatch));
    }

    #[test]
    fn method_is_case_exact() {
        let mut router = Router::new();
        router.add_route("GET", "^/$", ok_with_body("hi")).unwrap();
        let mut request = Request::new("get", "/");
        assert!(matches!(router.dispatch(&mut request), Dispatch::NoMethod));
    }

    #[test]
    fn empty_match_is_skipped() {
        let mut router = Router::new();
        router.add_route("GET", "x*", ok_with_body("empty")).unwrap();
        router.add_route("GET", "^/$", ok_with_body("root")).unwrap();
        // "x*" matches the empty string at position 0; the non-empty rule
        // passes it over and the second route serves the request.
        assert_eq!(dispatch_status(&router, "GET", "/"), Some(200));
        let mut request = Request::new("GET", "/");
        router.dispatch(&mut request);
        assert!(request.matches().is_empty());
    }

    #[test]
    fn handler_error_propagates() {
        let mut router = Router::new();
        router
            .add_route("GET", "^/$", |_req| Err("boom".into()))
            .unwrap();
        let mut request = Request::new("GET", "/");
        assert!(matches!(
            router.dispatch(&mut request),
            Dispatch::Handled(Err(_))
        ));
    }

    #[test]
    fn invalid_pattern_rejected() {
        let mut router = Router::new();
        let err = router.add_route("GET", "^(/$", ok_with_body("x")).unwrap_err();
        assert!(err.to_string().contains("invalid route pattern"));
    }
}
