//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use routeway::config::RouterConfig;
use routeway::http::{Filter, HttpServer, Next, RequestContext, ServerBuilder, WebResult};
use routeway::lifecycle::Shutdown;
use routeway::routing::{Action, ControllerError, RouteParams, RouteRegistry, RoutingError};

/// Routes used across the integration tests.
pub fn app_routes(registry: &mut RouteRegistry) -> Result<(), RoutingError> {
    registry.route("/hello/:name", "greet")?;
    registry.route("/users/new", "users.new")?;
    registry.route("/users/:id", "users.show")?;
    registry.route("/assets/*rest", "assets")?;
    registry.route("/visits", "visits")?;
    registry.route("/boom", "boom")?;
    registry.route("/go/:name", "go")?;

    registry.handle_fn("greet", |ctx: RequestContext| async move {
        Ok::<_, ControllerError>(WebResult::text(format!("hello {}", ctx.param("name").unwrap_or(""))))
    });
    registry.handle_fn("users.new", |_ctx: RequestContext| async move {
        Ok::<_, ControllerError>(WebResult::text("new user form"))
    });
    registry.handle_fn("users.show", |ctx: RequestContext| async move {
        Ok::<_, ControllerError>(WebResult::json(json!({ "id": ctx.param("id") })))
    });
    registry.handle_fn("assets", |ctx: RequestContext| async move {
        Ok::<_, ControllerError>(WebResult::text(ctx.param("rest").unwrap_or("").to_string()))
    });
    registry.handle_fn("visits", |ctx: RequestContext| async move {
        let visits = ctx.session().get_as::<u64>("visits")?.unwrap_or(0) + 1;
        ctx.session().insert("visits", visits)?;
        Ok::<_, ControllerError>(WebResult::text(visits.to_string()))
    });
    registry.handle_fn("boom", |_ctx: RequestContext| async move {
        if true {
            panic!("controller exploded");
        }
        Ok::<_, ControllerError>(WebResult::text("unreachable"))
    });
    registry.handle_fn("go", |ctx: RequestContext| async move {
        let params = RouteParams::from([("name".to_string(), ctx.param("name").unwrap_or("").to_string())]);
        Ok::<_, ControllerError>(WebResult::route_redirect("greet", params))
    });
    Ok(())
}

/// Builder preloaded with [`app_routes`].
pub fn builder(config: RouterConfig) -> ServerBuilder {
    HttpServer::builder(config).routes(app_routes)
}

/// Filter that records its pre and post hooks.
#[allow(dead_code)]
pub struct Recorder {
    pub name: &'static str,
    pub log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Filter for Recorder {
    async fn filter(&self, ctx: RequestContext, next: Next<'_>) -> Result<WebResult, ControllerError> {
        self.log.lock().unwrap().push(format!("{}:pre", self.name));
        let result = next.run(ctx).await;
        self.log.lock().unwrap().push(format!("{}:post", self.name));
        result
    }
}

/// Filter rejecting requests without an `authorization` header.
#[allow(dead_code)]
pub struct RequireAuth;

#[async_trait]
impl Filter for RequireAuth {
    async fn filter(&self, ctx: RequestContext, next: Next<'_>) -> Result<WebResult, ControllerError> {
        if ctx.headers().contains_key("authorization") {
            next.run(ctx).await
        } else {
            Ok(WebResult::empty(StatusCode::UNAUTHORIZED))
        }
    }
}

/// Controller counting its invocations.
#[allow(dead_code)]
pub struct Counting(pub Arc<AtomicUsize>);

#[async_trait]
impl Action for Counting {
    async fn call(&self, _ctx: RequestContext) -> Result<WebResult, ControllerError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(WebResult::text("counted"))
    }
}

/// Run `server` on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_server(server: HttpServer) -> (SocketAddr, Shutdown, JoinHandle<std::io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, rx));
    (addr, shutdown, handle)
}
