// Controller trait and route declarations

use crate::{Error, Exchange, HttpMethod, Reply};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use knit_core::Injectable;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type-erased controller handler bound to its controller type
pub type ControllerHandler<C> =
    Arc<dyn Fn(Arc<C>, Exchange) -> BoxFuture<'static, Result<Reply, Error>> + Send + Sync>;

/// A controller whose routes can be bound onto a route table.
///
/// The controller itself is constructed by the container, so its services are
/// declared through [`Injectable`].
///
/// # Example
///
/// ```ignore
/// struct Greeter;
///
/// impl Injectable for Greeter {
///     fn construct(_: &mut Dependencies) -> knit_core::Result<Self> {
///         Ok(Greeter)
///     }
/// }
///
/// impl Controller for Greeter {
///     fn base_path() -> &'static str {
///         "/api/v1"
///     }
///
///     fn routes() -> Vec<RouteDeclaration<Self>> {
///         vec![RouteDeclaration::get("/hello", "hello", Self::hello)]
///     }
/// }
/// ```
pub trait Controller: Injectable {
    /// Prefix joined in front of every route path
    fn base_path() -> &'static str {
        ""
    }

    /// Route declarations, bound in the order returned
    fn routes() -> Vec<RouteDeclaration<Self>>;
}

/// One route on a controller: method, path and the handler it invokes.
pub struct RouteDeclaration<C> {
    pub method: HttpMethod,
    pub path: &'static str,
    /// Name of the handler, used in logs
    pub handler_name: &'static str,
    handler: ControllerHandler<C>,
}

impl<C: Send + Sync + 'static> RouteDeclaration<C> {
    /// Declare a route.
    ///
    /// The handler may return anything convertible into a [`Reply`] and any
    /// error convertible into the HTTP [`Error`].
    pub fn new<F, Fut, R, E>(
        method: HttpMethod,
        path: &'static str,
        handler_name: &'static str,
        handler: F,
    ) -> Self
    where
        F: Fn(Arc<C>, Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply> + 'static,
        E: Into<Error> + 'static,
    {
        let handler: ControllerHandler<C> = Arc::new(move |controller, exchange| {
            handler(controller, exchange)
                .map(|result| -> Result<Reply, Error> {
                    result.map(Into::into).map_err(Into::into)
                })
                .boxed()
        });
        Self {
            method,
            path,
            handler_name,
            handler,
        }
    }

    pub fn get<F, Fut, R, E>(path: &'static str, handler_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<C>, Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply> + 'static,
        E: Into<Error> + 'static,
    {
        Self::new(HttpMethod::GET, path, handler_name, handler)
    }

    pub fn post<F, Fut, R, E>(path: &'static str, handler_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<C>, Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply> + 'static,
        E: Into<Error> + 'static,
    {
        Self::new(HttpMethod::POST, path, handler_name, handler)
    }

    pub fn put<F, Fut, R, E>(path: &'static str, handler_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<C>, Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply> + 'static,
        E: Into<Error> + 'static,
    {
        Self::new(HttpMethod::PUT, path, handler_name, handler)
    }

    pub fn patch<F, Fut, R, E>(path: &'static str, handler_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<C>, Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply> + 'static,
        E: Into<Error> + 'static,
    {
        Self::new(HttpMethod::PATCH, path, handler_name, handler)
    }

    pub fn delete<F, Fut, R, E>(path: &'static str, handler_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<C>, Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply> + 'static,
        E: Into<Error> + 'static,
    {
        Self::new(HttpMethod::DELETE, path, handler_name, handler)
    }

    pub fn head<F, Fut, R, E>(path: &'static str, handler_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<C>, Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply> + 'static,
        E: Into<Error> + 'static,
    {
        Self::new(HttpMethod::HEAD, path, handler_name, handler)
    }

    pub fn options<F, Fut, R, E>(path: &'static str, handler_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<C>, Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply> + 'static,
        E: Into<Error> + 'static,
    {
        Self::new(HttpMethod::OPTIONS, path, handler_name, handler)
    }

    /// Invoke the handler on a controller instance
    pub fn call(
        &self,
        controller: Arc<C>,
        exchange: Exchange,
    ) -> BoxFuture<'static, Result<Reply, Error>> {
        (self.handler)(controller, exchange)
    }

    pub(crate) fn handler(&self) -> ControllerHandler<C> {
        Arc::clone(&self.handler)
    }
}

impl<C> Clone for RouteDeclaration<C> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            path: self.path,
            handler_name: self.handler_name,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for RouteDeclaration<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDeclaration")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler_name", &self.handler_name)
            .finish_non_exhaustive()
    }
}
