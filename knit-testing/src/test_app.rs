// Test application builder

use crate::TestClient;
use knit_core::{Container, Injectable, Lifecycle, Token};
use knit_http::{Controller, RouteBinder, Router};
use std::any::Any;
use std::sync::Arc;

/// A container and the router its controllers were bound onto
pub struct TestApp {
    container: Container,
    router: Arc<Router>,
}

impl TestApp {
    pub fn new(container: Container, router: Router) -> Self {
        Self {
            container,
            router: Arc::new(router),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Resolve a service from the application's container
    pub fn get<T: Any + Send + Sync>(&self) -> knit_core::Result<Arc<T>> {
        self.container.resolve::<T>()
    }

    /// Create a test client for making requests
    pub fn client(&self) -> TestClient {
        TestClient::new(Arc::clone(&self.router))
    }
}

/// Builds a [`TestApp`] on a fresh container.
///
/// Registration steps record their first failure; [`TestAppBuilder::build`]
/// reports it.
pub struct TestAppBuilder {
    container: Container,
    router: Router,
    error: Option<knit_core::Error>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            container: Container::new(),
            router: Router::new(),
            error: None,
        }
    }

    /// Use an existing container instead of a fresh one
    pub fn with_container(self, container: Container) -> Self {
        Self { container, ..self }
    }

    /// Register an injectable type
    pub fn register<T: Injectable>(mut self, lifecycle: Lifecycle) -> Self {
        if self.error.is_none()
            && let Err(err) = self.container.register::<T>(lifecycle)
        {
            self.error = Some(err);
        }
        self
    }

    /// Provide a ready-made value, typically a mock, under `token`
    pub fn provide_value<T: Send + Sync + 'static>(
        mut self,
        token: impl Into<Token>,
        value: T,
    ) -> Self {
        if self.error.is_none()
            && let Err(err) = self.container.provide_value(token, value)
        {
            self.error = Some(err);
        }
        self
    }

    /// Bind the routes of controller `C`
    pub fn controller<C: Controller>(mut self) -> Self {
        if self.error.is_none()
            && let Err(err) =
                RouteBinder::new(self.container.clone()).bind::<C, _>(&mut self.router)
        {
            self.error = Some(err);
        }
        self
    }

    pub fn build(self) -> knit_core::Result<TestApp> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(TestApp::new(self.container, self.router)),
        }
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
