// HTTP binding layer for knit
// Controllers resolved through the container, bound onto routers and served with hyper

pub mod binder;
pub mod controller;
pub mod error;
pub mod exchange;
pub mod http;
pub mod routing;
pub mod server;

pub use binder::RouteBinder;
pub use controller::{Controller, ControllerHandler, RouteDeclaration};
pub use error::{Error, HttpError, Result};
pub use exchange::{Exchange, Reply};
pub use http::*;
pub use routing::{Outcome, Route, RouteHandler, RouteTable, Router, join_paths, normalize_path};
pub use server::{BoundServer, HttpServer};
