// HTTP server serving a router of bound controllers

use crate::controller::Controller;
use crate::routing::Router;
use crate::{HttpMethod, HttpRequest, HttpResponse, Result, RouteBinder};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming as IncomingBody;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use knit_core::Container;
use knit_core::logging::{debug, error, info, warn};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};

/// A container plus the router its controllers are bound onto
pub struct HttpServer {
    container: Container,
    router: Router,
}

impl HttpServer {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            router: Router::new(),
        }
    }

    /// Server over [`Container::global`]
    pub fn with_default_container() -> Self {
        Self::new(Container::global().clone())
    }

    /// Bind the routes of controller `C`
    pub fn api<C: Controller>(mut self) -> knit_core::Result<Self> {
        RouteBinder::new(self.container.clone()).bind::<C, _>(&mut self.router)?;
        Ok(self)
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind a TCP listener; use port 0 to let the OS pick one.
    pub async fn bind(self, addr: impl ToSocketAddrs) -> Result<BoundServer> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(BoundServer {
            listener,
            local_addr,
            router: Arc::new(self.router),
        })
    }
}

/// A server with a bound listener, ready to accept connections
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Arc<Router>,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process is stopped
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` completes. Connections already accepted keep
    /// running on their own tasks.
    pub async fn serve_with_shutdown<S>(self, signal: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        info!(addr = %self.local_addr, routes = self.router.len(), "Server listening");
        tokio::pin!(signal);

        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut signal => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(error = %err, "Failed to accept connection");
                        continue;
                    }
                },
            };

            debug!(peer = %peer, "Accepted connection");
            let io = TokioIo::new(stream);
            let router = Arc::clone(&self.router);

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let router = Arc::clone(&router);
                    async move { handle_request(req, router).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, error = %err, "Error serving connection");
                }
            });
        }

        info!(addr = %self.local_addr, "Server stopped");
        Ok(())
    }
}

/// Convert a hyper request, route it and convert the response back
async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
) -> std::result::Result<Response<Full<bytes::Bytes>>, hyper::Error> {
    let Some(method) = HttpMethod::from_str(req.method().as_str()) else {
        let message = format!("Method {} not allowed", req.method());
        return Ok(to_hyper(HttpResponse::json_error(405, &message)));
    };
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::new(method, target);
    request.headers = collect_headers(req.headers());

    request.body = req.collect().await?.to_bytes().to_vec();

    let response = router.dispatch(request).await;
    Ok(to_hyper(response))
}

/// Flatten request headers, joining repeated values with `, `
fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .keys()
        .filter_map(|name| {
            let values: Vec<&str> = headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect();
            (!values.is_empty()).then(|| (name.as_str().to_string(), values.join(", ")))
        })
        .collect()
}

fn to_hyper(response: HttpResponse) -> Response<Full<bytes::Bytes>> {
    let mut hyper_response = Response::new(Full::new(bytes::Bytes::from(response.body)));
    *hyper_response.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let headers = hyper_response.headers_mut();
    for (key, value) in response.headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => error!(header = %key, "Dropping invalid response header"),
        }
    }
    hyper_response
}
