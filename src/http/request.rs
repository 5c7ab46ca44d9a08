//! Parsed request value.
//!
//! # Responsibilities
//! - Hold everything the reader extracted from one connection
//! - Expose read-only accessors to handlers
//! - Produce a log snapshot for failure reports
//!
//! # Design Decisions
//! - Immutable after parsing; the only later addition is the route match
//!   attached by the dispatcher
//! - Header keys keep their received case

use std::net::SocketAddr;

use http::Method;

use crate::http::headers::Headers;
use crate::http::query::Query;
use crate::routing::RouteMatch;

/// One HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Query,
    headers: Headers,
    client_address: SocketAddr,
    body: Option<String>,
    route_match: Option<RouteMatch>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>, client_address: SocketAddr) -> Self {
        Self {
            method,
            path: path.into(),
            query: Query::new(),
            headers: Headers::new(),
            client_address,
            body: None,
            route_match: None,
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub(crate) fn set_route_match(&mut self, route_match: RouteMatch) {
        self.route_match = Some(route_match);
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn client_address(&self) -> SocketAddr {
        self.client_address
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Capture groups, present when a pattern route matched.
    pub fn route_match(&self) -> Option<&RouteMatch> {
        self.route_match.as_ref()
    }

    /// Field values as `name: value` lines for failure reports.
    pub fn snapshot(&self) -> Vec<String> {
        let mut lines = vec![
            format!("method: {}", self.method),
            format!("path: {:?}", self.path),
            format!("client_address: {}", self.client_address),
        ];
        if !self.query.is_empty() {
            lines.push("query:".to_string());
            for (key, values) in self.query.iter() {
                lines.push(format!("  {key:?}: {values:?}"));
            }
        }
        if !self.headers.is_empty() {
            lines.push("headers:".to_string());
            for (key, value) in self.headers.iter() {
                lines.push(format!("  {key:?}: {value:?}"));
            }
        }
        if let Some(body) = &self.body {
            lines.push(format!("body_bytes: {}", body.len()));
        }
        lines
    }
}
