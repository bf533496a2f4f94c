// Test HTTP client that dispatches straight into a router

use knit_http::{HttpMethod, HttpRequest, HttpResponse, Router};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Client for making requests against a router without a socket
#[derive(Clone)]
pub struct TestClient {
    router: Arc<Router>,
}

impl TestClient {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(HttpMethod::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request(HttpMethod::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request(HttpMethod::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(HttpMethod::DELETE, path, None).await
    }

    pub async fn patch(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request(HttpMethod::PATCH, path, Some(body)).await
    }

    /// Make a request with custom method
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> TestResponse {
        let request = HttpRequest::new(method, path).with_body(body.unwrap_or_default());
        self.send(request).await
    }

    /// Dispatch a fully built request
    pub async fn send(&self, request: HttpRequest) -> TestResponse {
        TestResponse(self.router.dispatch(request).await)
    }
}

/// Builder for test requests
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    method: HttpMethod,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    query: Vec<(String, String)>,
}

impl TestRequestBuilder {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Set JSON body
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, knit_http::Error> {
        self.body = serde_json::to_vec(data)?;
        self.headers
            .push(("Content-Type".to_string(), knit_http::JSON_CONTENT_TYPE.to_string()));
        Ok(self)
    }

    /// Add a query parameter; encoded when the request is built
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> HttpRequest {
        let mut target = self.path;
        if !self.query.is_empty() {
            let pairs: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            target = format!("{}?{}", target, pairs.join("&"));
        }

        self.headers.into_iter().fold(
            HttpRequest::new(self.method, target).with_body(self.body),
            |request, (key, value)| request.with_header(key, value),
        )
    }

    /// Build and dispatch through `client`
    pub async fn send(self, client: &TestClient) -> TestResponse {
        client.send(self.build()).await
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse(pub HttpResponse);

impl TestResponse {
    pub fn status(&self) -> u16 {
        self.0.status
    }

    pub fn body_string(&self) -> Option<String> {
        self.0.body_string()
    }

    /// Get the response body as JSON
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_slice(&self.0.body).map_err(|e| format!("Deserialization error: {}", e))
    }

    /// Header value by case-insensitive name
    pub fn header(&self, key: &str) -> Option<&str> {
        self.0
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn into_inner(self) -> HttpResponse {
        self.0
    }
}
