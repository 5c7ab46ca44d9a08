//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store exact and pattern routes per method
//! - Resolve a method and path to one handler
//! - Attach pattern captures to the request before calling the handler
//!
//! # Design Decisions
//! - Built once before serving, read-only afterwards
//! - Exact lookup always precedes the pattern scan
//! - Patterns are tried in registration order, first match wins
//! - A default handler always exists; the built-in one answers 404

use std::collections::HashMap;

use http::Method;
use tracing::debug;

use crate::http::{Request, Response};
use crate::routing::handler::{Handler, HandlerError};
use crate::routing::matcher::{PathPattern, RouteMatch};
use crate::routing::RouteError;

/// Which table produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Exact,
    Pattern,
    Default,
}

/// Outcome of a route lookup.
pub struct Resolution<'r> {
    pub handler: &'r Handler,
    pub route_match: Option<RouteMatch>,
    pub kind: RouteKind,
}

pub struct Router {
    exact: HashMap<Method, HashMap<String, Handler>>,
    patterns: HashMap<Method, Vec<(PathPattern, Handler)>>,
    default: Handler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            exact: HashMap::new(),
            patterns: HashMap::new(),
            default: Box::new(|_: &Request| Ok(Response::not_found())),
        }
    }

    /// Route `method path` to `handler`, replacing an earlier registration.
    pub fn register<F>(&mut self, method: Method, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<Response, HandlerError> + 'static,
    {
        self.exact
            .entry(method)
            .or_default()
            .insert(path.into(), Box::new(handler));
        self
    }

    pub fn get<F>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<Response, HandlerError> + 'static,
    {
        self.register(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<Response, HandlerError> + 'static,
    {
        self.register(Method::POST, path, handler)
    }

    /// Append a regex route, tried after every earlier pattern for `method`.
    pub fn register_pattern<F>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request) -> Result<Response, HandlerError> + 'static,
    {
        let pattern = PathPattern::new(pattern)?;
        self.patterns
            .entry(method)
            .or_default()
            .push((pattern, Box::new(handler)));
        Ok(self)
    }

    /// Replace the handler used when nothing else matches.
    pub fn set_default<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<Response, HandlerError> + 'static,
    {
        self.default = Box::new(handler);
        self
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        if let Some(handler) = self.exact.get(method).and_then(|routes| routes.get(path)) {
            return Resolution {
                handler,
                route_match: None,
                kind: RouteKind::Exact,
            };
        }
        let found = self.patterns.get(method).and_then(|routes| {
            routes
                .iter()
                .find_map(|(pattern, handler)| pattern.matches(path).map(|m| (handler, m)))
        });
        match found {
            Some((handler, route_match)) => Resolution {
                handler,
                route_match: Some(route_match),
                kind: RouteKind::Pattern,
            },
            None => Resolution {
                handler: &self.default,
                route_match: None,
                kind: RouteKind::Default,
            },
        }
    }

    /// Resolve and run the handler for `request`.
    pub fn dispatch(&self, request: &mut Request) -> Result<Response, HandlerError> {
        let Resolution {
            handler,
            route_match,
            kind,
        } = self.resolve(request.method(), request.path());
        debug!(method = %request.method(), path = request.path(), ?kind, "Dispatching request");
        if let Some(route_match) = route_match {
            request.set_route_match(route_match);
        }
        handler(&*request)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let exact: usize = self.exact.values().map(HashMap::len).sum();
        let patterns: usize = self.patterns.values().map(Vec::len).sum();
        f.debug_struct("Router")
            .field("exact", &exact)
            .field("patterns", &patterns)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::http::Body;

    fn request(method: Method, path: &str) -> Request {
        Request::new(method, path, "127.0.0.1:9000".parse().unwrap())
    }

    fn body_text(response: &Response) -> &str {
        match response.body() {
            Body::Buffered(text) => text,
            Body::Streaming(_) => panic!("expected buffered body"),
        }
    }

    #[test]
    fn exact_route_or_default() {
        let mut router = Router::new();
        router.get("/", |_| Ok(Response::ok("home")));

        let response = router.dispatch(&mut request(Method::GET, "/")).unwrap();
        assert_eq!(body_text(&response), "home");

        let response = router.dispatch(&mut request(Method::GET, "/x")).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn method_is_part_of_the_key() {
        let mut router = Router::new();
        router.get("/pins", |_| Ok(Response::ok("list")));
        let resolution = router.resolve(&Method::POST, "/pins");
        assert_eq!(resolution.kind, RouteKind::Default);
    }

    #[test]
    fn exact_beats_pattern() {
        let mut router = Router::new();
        router
            .register_pattern(Method::GET, "/pins", |_| Ok(Response::ok("pattern")))
            .unwrap();
        router.get("/pins", |_| Ok(Response::ok("exact")));
        let response = router.dispatch(&mut request(Method::GET, "/pins")).unwrap();
        assert_eq!(body_text(&response), "exact");
    }

    #[test]
    fn first_registered_pattern_wins() {
        let mut router = Router::new();
        router
            .register_pattern(Method::GET, "/static/", |_| Ok(Response::ok("any")))
            .unwrap()
            .register_pattern(Method::GET, "/static/img/", |_| Ok(Response::ok("img")))
            .unwrap();
        let response = router
            .dispatch(&mut request(Method::GET, "/static/img/a.png"))
            .unwrap();
        assert_eq!(body_text(&response), "any");
    }

    #[test]
    fn captures_reach_the_handler() {
        let mut router = Router::new();
        router
            .register_pattern(Method::POST, r"/pins/(\w+)", |req| {
                let id = req.route_match().and_then(|m| m.group(1)).unwrap_or("");
                Ok(Response::ok(id.to_string()))
            })
            .unwrap();
        let response = router
            .dispatch(&mut request(Method::POST, "/pins/btn3"))
            .unwrap();
        assert_eq!(body_text(&response), "btn3");
    }

    #[test]
    fn custom_default() {
        let mut router = Router::new();
        router.set_default(|_| Ok(Response::ok("fallback").with_status(StatusCode::GONE)));
        let response = router.dispatch(&mut request(Method::GET, "/nope")).unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
    }
}
