// Mock utilities for testing

use knit_http::{HttpMethod, RouteHandler, RouteTable};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records calls and hands out a canned return value.
///
/// Clones share their call log, so a mock provided to a container can be
/// inspected from the test that created it.
pub struct MockService<T> {
    calls: Arc<Mutex<Vec<String>>>,
    return_value: Arc<Mutex<Option<T>>>,
}

impl<T> MockService<T> {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            return_value: Arc::new(Mutex::new(None)),
        }
    }

    /// Set the return value
    pub fn with_return(self, value: T) -> Self {
        *self.return_value.lock() = Some(value);
        self
    }

    /// Record a method call
    pub fn record_call(&self, method: &str) {
        self.calls.lock().push(method.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.calls.lock().iter().any(|call| call == method)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn get_return(&self) -> Option<T>
    where
        T: Clone,
    {
        self.return_value.lock().clone()
    }
}

impl<T> Clone for MockService<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
            return_value: Arc::clone(&self.return_value),
        }
    }
}

impl<T> Default for MockService<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Route table that keeps every added route for inspection
#[derive(Default, Clone)]
pub struct RecordingRouteTable {
    routes: Vec<(HttpMethod, String, RouteHandler)>,
}

impl RecordingRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(method, path)` pairs in the order they were added
    pub fn bindings(&self) -> Vec<(HttpMethod, String)> {
        self.routes
            .iter()
            .map(|(method, path, _)| (*method, path.clone()))
            .collect()
    }

    /// Handler recorded for `method` and `path`
    pub fn handler(&self, method: HttpMethod, path: &str) -> Option<RouteHandler> {
        self.routes
            .iter()
            .find(|(m, p, _)| *m == method && p == path)
            .map(|(_, _, handler)| Arc::clone(handler))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteTable for RecordingRouteTable {
    fn add_route(&mut self, method: HttpMethod, path: &str, handler: RouteHandler) {
        self.routes.push((method, path.to_string(), handler));
    }
}
