//! Greeter service
//!
//! Run with `cargo run --example greeter --features config,util`, then
//! `curl 'http://127.0.0.1:3000/api/v1/hello?who=World'`.
//!
//! `GREETING` changes the greeting word and `APP_PORT` the listening port.
//! Both are read through environment bindings in the container.

use knit::knit_config::{ConfigManager, bind_config, bind_env, env_token, register_config};
use knit::knit_http;
use knit::knit_util::track;
use knit::logging::{LogConfig, info};
use knit::prelude::*;
use serde::Serialize;
use std::sync::Arc;

struct GreetingService {
    greeting: Arc<String>,
}

impl Injectable for GreetingService {
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new().inject(0, env_token("GREETING"))
    }

    fn construct(deps: &mut Dependencies) -> knit::Result<Self> {
        Ok(GreetingService {
            greeting: deps.next()?,
        })
    }
}

impl GreetingService {
    fn greet(&self, who: &str) -> String {
        format!("{} {}", self.greeting, who)
    }
}

struct Greeter {
    service: Arc<GreetingService>,
}

#[derive(Serialize)]
struct Message {
    message: String,
}

impl Injectable for Greeter {
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new().param::<GreetingService>()
    }

    fn construct(deps: &mut Dependencies) -> knit::Result<Self> {
        Ok(Greeter {
            service: deps.next()?,
        })
    }
}

impl Greeter {
    async fn hello(self: Arc<Self>, exchange: Exchange) -> knit_http::Result<Reply> {
        let who = exchange.query("who").unwrap_or("Nobody");
        let message = track("greeter.hello", || self.service.greet(who));
        Reply::json(&Message { message })
    }

    async fn missing(self: Arc<Self>, _exchange: Exchange) -> Result<Reply, HttpError> {
        Err(HttpError::not_found("No result found"))
    }
}

impl Controller for Greeter {
    fn base_path() -> &'static str {
        "/api/v1"
    }

    fn routes() -> Vec<RouteDeclaration<Self>> {
        vec![
            RouteDeclaration::get("/hello", "hello", Self::hello),
            RouteDeclaration::get("/missing", "missing", Self::missing),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::from_env().init()?;

    let config = ConfigManager::new();
    config.set("service_name", "greeter")?;

    let container = Container::new();
    register_config(&container, config)?;
    bind_env(&container, "GREETING", Some("Hello"));
    let port = bind_env(&container, "APP_PORT", Some("3000"));
    let name = bind_config::<String>(&container, "service_name", Lifecycle::Singleton)?;
    container.register::<GreetingService>(Lifecycle::Singleton)?;

    let port: u16 = container.resolve_token::<String>(&port)?.parse()?;
    let name = container.resolve_token::<String>(&name)?;

    let server = HttpServer::new(container)
        .api::<Greeter>()?
        .bind(("127.0.0.1", port))
        .await?;
    info!(service = %name, addr = %server.local_addr(), "Listening");

    server
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
