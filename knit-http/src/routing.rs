// Route table abstraction and the default router

use crate::{Exchange, HttpMethod, HttpRequest, HttpResponse};
use futures_util::future::BoxFuture;
use knit_core::logging::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of running a route handler
#[derive(Debug)]
pub enum Outcome {
    Respond(HttpResponse),
    /// Continue with the next matching route
    Next,
}

/// A route handler function type
pub type RouteHandler = Arc<dyn Fn(Exchange) -> BoxFuture<'static, Outcome> + Send + Sync>;

/// Anything routes can be registered on
pub trait RouteTable {
    fn add_route(&mut self, method: HttpMethod, path: &str, handler: RouteHandler);
}

/// Route definition with handler
#[derive(Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub handler: RouteHandler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Ordered route list that dispatches requests to the first matching route
#[derive(Default, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch a request.
    ///
    /// Routes are tried in registration order. A handler answering
    /// [`Outcome::Next`] hands the request to the next matching route; when
    /// nothing answers the result is a 404.
    pub async fn dispatch(&self, mut request: HttpRequest) -> HttpResponse {
        let (path, query) = match request.path.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (request.path.clone(), None),
        };
        if let Some(query) = query {
            request.query_params.extend(parse_query_string(&query));
        }
        request.path = path;

        for route in &self.routes {
            if route.method != request.method {
                continue;
            }
            let Some(params) = match_path(&route.path, &request.path) else {
                continue;
            };

            trace!(method = %route.method, route = %route.path, "Route matched");
            let mut matched = request.clone();
            matched.path_params = params;

            match (route.handler)(Exchange::new(matched)).await {
                Outcome::Respond(response) => return response,
                Outcome::Next => continue,
            }
        }

        debug!(method = %request.method, path = %request.path, "No route answered request");
        HttpResponse::json_error(
            404,
            &format!("Route {}:{} not found", request.method, request.path),
        )
    }
}

impl RouteTable for Router {
    fn add_route(&mut self, method: HttpMethod, path: &str, handler: RouteHandler) {
        self.routes.push(Route {
            method,
            path: normalize_path(path),
            handler,
        });
    }
}

/// Join a base path and a route path into a normalised absolute path
pub fn join_paths(base: &str, path: &str) -> String {
    normalize_path(&format!("{}/{}", base, path))
}

/// Collapse repeated slashes and drop any trailing slash
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Match a route path pattern against a request path.
/// Returns Some(params) if matched, None otherwise
fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            params.insert(param_name.to_string(), decode(path_part));
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

/// Parse a query string into a map of decoded parameters.
/// The first occurrence of a repeated key wins.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for part in query.split('&').filter(|part| !part.is_empty()) {
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        params
            .entry(decode(&key.replace('+', " ")))
            .or_insert_with(|| decode(&value.replace('+', " ")));
    }
    params
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
