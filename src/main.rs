//! routeway demo server
//!
//! Serves a handful of demo routes through the full dispatch pipeline.
//!
//! ```text
//!     Client Request
//!     ──▶ axum (request id, timeout, body limit, trace)
//!     ──▶ dispatcher ──▶ route registry (match / synthetic not-found)
//!                    ──▶ session store (load)
//!                    ──▶ filter chain ──▶ controller
//!                    ──▶ WebResult::apply (reverse routing for redirects)
//!                    ──▶ session store (save if mutated)
//!     ◀── Client Response
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::{json, Map};
use tokio::net::TcpListener;

use routeway::config::{load_config, RouterConfig};
use routeway::http::{HttpServer, RequestContext, WebResult};
use routeway::lifecycle::signals::spawn_signal_handler;
use routeway::lifecycle::{ServerEvent, Shutdown};
use routeway::observability::{init_logging, metrics};
use routeway::routing::{ControllerError, RouteParams, RouteRegistry, RoutingError};

#[derive(Parser)]
#[command(name = "routeway")]
#[command(about = "HTTP routing and dispatch engine", long_about = None, version)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn demo_routes(registry: &mut RouteRegistry) -> Result<(), RoutingError> {
    registry.route("/", "home")?;
    registry.route("/hello/:name", "greet")?;
    registry.alias("hello", "greet");
    registry.route("/assets/*path", "assets")?;
    registry.route("/visits", "visits")?;

    registry.handle_fn("home", |ctx: RequestContext| async move {
        let params = RouteParams::from([("name".to_string(), "world".to_string())]);
        Ok::<_, ControllerError>(WebResult::json(json!({
            "hello": ctx.url_for("hello", &params)?,
            "absolute": ctx.absolute_url("hello", &params)?.to_string(),
            "menu": ctx.data("menu", &Map::new()),
        })))
    });
    registry.handle_fn("greet", |ctx: RequestContext| async move {
        Ok::<_, ControllerError>(WebResult::text(format!("Hello, {}!", ctx.param("name").unwrap_or("stranger"))))
    });
    registry.handle_fn("assets", |ctx: RequestContext| async move {
        Ok::<_, ControllerError>(WebResult::text(ctx.param("path").unwrap_or("").to_string()))
    });
    registry.handle_fn("visits", |ctx: RequestContext| async move {
        let visits = ctx.session().get_as::<u64>("visits")?.unwrap_or(0) + 1;
        ctx.session().insert("visits", visits)?;
        Ok::<_, ControllerError>(WebResult::json(json!({ "visits": visits })).no_cache())
    });
    registry.handle_data("menu", |ctx: &RequestContext, _params: &RouteParams| {
        json!(["home", "hello", "visits"]
            .iter()
            .filter_map(|name| ctx.url_for(name, &RouteParams::from([("name".to_string(), "you".to_string())])).ok())
            .collect::<Vec<_>>())
    });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "routeway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.router.path,
        config_routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(err) = metrics::init_metrics(addr) {
                    tracing::error!(error = %err, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::builder(config)
        .routes(demo_routes)
        .on_event(|event: ServerEvent| tracing::info!(?event, "Lifecycle event"))
        .build()?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
