//! Server wiring: routes, logger, and the dispatch glue between them.

use std::io;
use std::sync::Arc;

use monohttp_core::{BodyError, HandlerError, LogLevel, Logger, Request, Response};
use monohttp_http::{ConnState, Driver, Endpoint, Listener};
use monohttp_router::{Dispatch, RouteError, Router};

/// A route table plus a logger, serving one connection at a time.
pub struct Server {
    router: Router,
    logger: Logger,
}

impl Server {
    /// Creates a server logging to stderr at INFO.
    pub fn new() -> Self {
        Self::with_logger(Logger::stderr(LogLevel::Info))
    }

    pub fn with_logger(logger: Logger) -> Self {
        Self {
            router: Router::new(),
            logger,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Registers a handler for `method` and a regex path `pattern`.
    /// Registration order is dispatch order.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] if the pattern does not compile.
    pub fn add_route<H>(&mut self, method: &str, pattern: &str, handler: H) -> Result<(), RouteError>
    where
        H: Fn(&mut Request) -> Result<Response, HandlerError> + Send + Sync + 'static,
    {
        self.router.add_route(method, pattern, handler)
    }

    /// Serves every connection the listener yields, then returns.
    pub fn run(&self, mut listener: impl Listener) -> io::Result<()> {
        while let Some(endpoint) = listener.accept() {
            self.handle(endpoint)?;
        }
        Ok(())
    }

    /// Returns the number of routes registered for `method`. Useful to
    /// streaming body callbacks that downcast
    /// [`Conn::server`](monohttp_core::Conn::server) back to this type.
    pub fn route_count(&self, method: &str) -> usize {
        self.router.route_count(method)
    }

    /// Serves one connection.
    pub fn handle(&self, endpoint: Endpoint) -> io::Result<ConnState> {
        let logger = Arc::new(self.logger.with_label(&endpoint.label));
        let dispatch_logger = Arc::clone(&logger);
        let mut output = endpoint.output;
        let mut driver = Driver::new(
            move |request: &mut Request| dispatch(&self.router, &dispatch_logger, request),
            logger,
        )
        .with_server(self);
        driver.run(endpoint.input, &mut output)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps router outcomes and handler failures to responses.
fn dispatch(router: &Router, logger: &Logger, request: &mut Request) -> Response {
    match router.dispatch(request) {
        Dispatch::Handled(Ok(response)) => response,
        Dispatch::Handled(Err(error)) => handler_failure(logger, error),
        Dispatch::NoMethod => {
            logger.info(&format!("no routes for method {}", request.method()));
            Response::new(501, "Not Implemented").body("not implemented")
        }
        Dispatch::NoMatch => {
            logger.info(&format!("no route matched {}", request.path()));
            Response::new(404, "Not Found").body("not found")
        }
    }
}

fn handler_failure(logger: &Logger, error: HandlerError) -> Response {
    if let Some(body_error) = error.downcast_ref::<BodyError>() {
        logger.error(&format!("request body failed: {body_error}"));
        return Response::new(400, "Bad Request").body("bad request");
    }
    logger.error(&format!("handler failed: {error}"));
    Response::new(500, "Internal Server Error").body("internal server error")
}
