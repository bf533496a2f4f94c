//! Testing utilities for knit applications.
//!
//! - **TestAppBuilder / TestApp** - container plus bound controllers
//! - **TestClient** - dispatches requests into a router without a socket
//! - **MockService** - call recording for hand-written mocks
//! - **RecordingRouteTable** - route table that only records bindings
//! - **Assertions** - status, header and body checks
//!
//! ## Quick Start
//!
//! ```
//! use knit_core::{Dependencies, Injectable};
//! use knit_http::{Controller, Exchange, Reply, RouteDeclaration};
//! use knit_testing::*;
//! use std::sync::Arc;
//!
//! struct Ping;
//!
//! impl Injectable for Ping {
//!     fn construct(_: &mut Dependencies) -> knit_core::Result<Self> {
//!         Ok(Ping)
//!     }
//! }
//!
//! impl Ping {
//!     async fn ping(self: Arc<Self>, _exchange: Exchange) -> knit_http::Result<Reply> {
//!         Reply::json(&serde_json::json!({ "pong": true }))
//!     }
//! }
//!
//! impl Controller for Ping {
//!     fn routes() -> Vec<RouteDeclaration<Self>> {
//!         vec![RouteDeclaration::get("/ping", "ping", Self::ping)]
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let app = TestAppBuilder::new().controller::<Ping>().build().unwrap();
//! let response = app.client().get("/ping").await;
//! assert_status(&response, 200);
//! assert_json(&response, &serde_json::json!({ "pong": true }));
//! # });
//! ```

pub mod assertions;
pub mod mock;
pub mod test_app;
pub mod test_client;

pub use assertions::*;
pub use mock::{MockService, RecordingRouteTable};
pub use test_app::{TestApp, TestAppBuilder};
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};
