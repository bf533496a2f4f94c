// knit - object-graph construction with controller route binding
//
// Types declare their constructor dependencies, the container builds them as
// singletons or prototypes, and controllers resolved from the container are
// bound onto HTTP routes.

pub use knit_core;
pub use knit_http;

pub use knit_core::{
    Container, Dependencies, DependencyDeclaration, DependencyResolver, Error, Factory,
    Injectable, Instance, Lifecycle, Provider, ProviderRegistry, Resolver, Result, Token,
    logging,
};

pub use knit_http::{
    BoundServer, Controller, Exchange, HttpError, HttpMethod, HttpRequest, HttpResponse,
    HttpServer, Outcome, Reply, RouteBinder, RouteDeclaration, RouteHandler, RouteTable, Router,
};

#[cfg(feature = "config")]
pub use knit_config;

#[cfg(feature = "testing")]
pub use knit_testing;

#[cfg(feature = "util")]
pub use knit_util;

/// Common imports.
///
/// ```
/// use knit::prelude::*;
///
/// let router = Router::new();
/// let request = HttpRequest::new(HttpMethod::GET, "/nothing");
/// let response = tokio_test::block_on(router.dispatch(request));
/// assert_eq!(response.status, 404);
/// ```
pub mod prelude {
    pub use crate::{
        Container, Controller, Dependencies, DependencyDeclaration, Exchange, HttpError,
        HttpMethod, HttpRequest, HttpResponse, HttpServer, Injectable, Lifecycle, Reply,
        RouteBinder, RouteDeclaration, Router, Token,
    };

    #[cfg(feature = "config")]
    pub use knit_config::{ConfigManager, bind_config, bind_env, register_config};

    #[cfg(feature = "util")]
    pub use knit_util::{track, track_async};
}
