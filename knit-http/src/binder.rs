// Binds container-managed controllers onto a route table

use crate::controller::Controller;
use crate::routing::{Outcome, RouteHandler, RouteTable, join_paths};
use crate::{Error, Exchange, HttpResponse, Reply};
use futures_util::FutureExt;
use knit_core::logging::{debug, error, warn};
use knit_core::{Container, Lifecycle};
use std::any::{Any, type_name};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Resolves controllers through a container and registers their routes.
#[derive(Clone, Debug)]
pub struct RouteBinder {
    container: Container,
}

impl RouteBinder {
    pub fn new(container: Container) -> Self {
        Self { container }
    }

    /// Binder over [`Container::global`]
    pub fn with_default_container() -> Self {
        Self::new(Container::global().clone())
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Bind every route of `C` onto `table`.
    ///
    /// `C` is registered as a singleton when the container does not know it
    /// yet, then resolved once; every route shares that instance. Returns the
    /// number of routes bound. Construction errors are returned before any
    /// route is added.
    pub fn bind<C, T>(&self, table: &mut T) -> knit_core::Result<usize>
    where
        C: Controller,
        T: RouteTable + ?Sized,
    {
        if !self.container.has::<C>() {
            self.container.register::<C>(Lifecycle::Singleton)?;
        }
        let controller = self.container.resolve::<C>()?;

        let routes = C::routes();
        for route in &routes {
            let path = join_paths(C::base_path(), route.path);
            debug!(
                controller = type_name::<C>(),
                method = %route.method,
                path = %path,
                handler = route.handler_name,
                "Binding route"
            );
            table.add_route(
                route.method,
                &path,
                adapt(Arc::clone(&controller), route.handler(), route.handler_name),
            );
        }

        debug!(
            controller = type_name::<C>(),
            routes = routes.len(),
            "Controller bound"
        );
        Ok(routes.len())
    }
}

/// Wrap a controller handler into a route handler that turns whatever the
/// handler produced into a response.
fn adapt<C: Send + Sync + 'static>(
    controller: Arc<C>,
    handler: crate::controller::ControllerHandler<C>,
    handler_name: &'static str,
) -> RouteHandler {
    Arc::new(move |exchange: Exchange| {
        let controller = Arc::clone(&controller);
        let handler = Arc::clone(&handler);
        async move {
            // Covers panics raised while building the future as well as while polling it
            let result = AssertUnwindSafe(async move { handler(controller, exchange).await })
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(reply)) => into_outcome(reply),
                Ok(Err(err)) => error_response(handler_name, err),
                Err(panic) => {
                    error!(
                        handler = handler_name,
                        panic = %panic_message(&*panic),
                        "Route handler panicked"
                    );
                    Outcome::Respond(HttpResponse::json_error(500, "Internal Server Error"))
                }
            }
        }
        .boxed()
    })
}

fn into_outcome(reply: Reply) -> Outcome {
    match reply {
        Reply::Response(response) => Outcome::Respond(response),
        Reply::Json(value) => match HttpResponse::ok().with_json(&value) {
            Ok(response) => Outcome::Respond(response),
            Err(err) => Outcome::Respond(HttpResponse::json_error(500, &err.message())),
        },
        Reply::Empty => Outcome::Respond(HttpResponse::no_content()),
        Reply::Next => Outcome::Next,
    }
}

fn error_response(handler_name: &'static str, err: Error) -> Outcome {
    let status = err.status_code();
    if err.is_server_error() {
        error!(handler = handler_name, status, error = %err, "Route handler failed");
    } else {
        warn!(handler = handler_name, status, error = %err, "Route handler rejected request");
    }
    Outcome::Respond(HttpResponse::json_error(status, &err.message()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Router;
    use crate::{HttpError, HttpMethod, HttpRequest, RouteDeclaration};
    use knit_core::{Dependencies, DependencyDeclaration, Injectable};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        hits: AtomicUsize,
    }

    impl Injectable for Counter {
        fn construct(_: &mut Dependencies) -> knit_core::Result<Self> {
            Ok(Counter {
                hits: AtomicUsize::new(0),
            })
        }
    }

    struct Stats {
        counter: Arc<Counter>,
    }

    impl Injectable for Stats {
        fn dependencies() -> DependencyDeclaration {
            DependencyDeclaration::new().param::<Counter>()
        }

        fn construct(deps: &mut Dependencies) -> knit_core::Result<Self> {
            Ok(Stats {
                counter: deps.next()?,
            })
        }
    }

    impl Stats {
        async fn hit(self: Arc<Self>, _exchange: Exchange) -> Result<Reply, Error> {
            let hits = self.counter.hits.fetch_add(1, Ordering::SeqCst) + 1;
            Reply::json(&serde_json::json!({ "hits": hits }))
        }

        async fn reset(self: Arc<Self>, _exchange: Exchange) -> Result<(), Error> {
            self.counter.hits.store(0, Ordering::SeqCst);
            Ok(())
        }

        async fn fail(self: Arc<Self>, exchange: Exchange) -> Result<Reply, Error> {
            match exchange.query("kind") {
                Some("http") => Err(HttpError::new(418, "teapot").into()),
                Some("panic") => panic!("handler exploded"),
                _ => Err(Error::internal("boom")),
            }
        }
    }

    impl Controller for Stats {
        fn base_path() -> &'static str {
            "/stats/"
        }

        fn routes() -> Vec<RouteDeclaration<Self>> {
            vec![
                RouteDeclaration::post("/hit", "hit", Self::hit),
                RouteDeclaration::delete("/", "reset", Self::reset),
                RouteDeclaration::get("/fail", "fail", Self::fail),
            ]
        }
    }

    #[tokio::test]
    async fn test_bind_registers_and_shares_controller() {
        let container = Container::new();
        container.register::<Counter>(Lifecycle::Singleton).unwrap();
        let binder = RouteBinder::new(container.clone());
        let mut router = Router::new();

        assert_eq!(binder.bind::<Stats, _>(&mut router).unwrap(), 3);
        assert!(container.has::<Stats>());
        let stats = container.resolve::<Stats>().unwrap();
        let counter = container.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&stats.counter, &counter));

        let paths: Vec<_> = router.routes().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/stats/hit", "/stats", "/stats/fail"]);

        for expected in 1..=2 {
            let response = router
                .dispatch(HttpRequest::new(HttpMethod::POST, "/stats/hit"))
                .await;
            assert_eq!(response.status, 200);
            assert_eq!(
                response.body_string().unwrap(),
                format!(r#"{{"hits":{}}}"#, expected)
            );
        }

        let response = router
            .dispatch(HttpRequest::new(HttpMethod::DELETE, "/stats"))
            .await;
        assert_eq!(response.status, 204);
        assert_eq!(counter.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_failures_become_json_errors() {
        let container = Container::new();
        container.register::<Counter>(Lifecycle::Singleton).unwrap();
        let mut router = Router::new();
        RouteBinder::new(container).bind::<Stats, _>(&mut router).unwrap();

        let response = router
            .dispatch(HttpRequest::new(HttpMethod::GET, "/stats/fail"))
            .await;
        assert_eq!(response.status, 500);
        assert_eq!(
            response.body_string().unwrap(),
            r#"{"statusCode":500,"error":"boom"}"#
        );

        let response = router
            .dispatch(HttpRequest::new(HttpMethod::GET, "/stats/fail?kind=http"))
            .await;
        assert_eq!(response.status, 418);
        assert!(response.body_string().unwrap().contains("teapot"));

        let response = router
            .dispatch(HttpRequest::new(HttpMethod::GET, "/stats/fail?kind=panic"))
            .await;
        assert_eq!(response.status, 500);
    }

    #[test]
    fn test_bind_fails_when_dependency_missing() {
        let mut router = Router::new();
        let err = RouteBinder::new(Container::new())
            .bind::<Stats, _>(&mut router)
            .unwrap_err();
        assert!(matches!(err, knit_core::Error::UnresolvedToken { .. }));
        assert!(router.is_empty());
    }
}
