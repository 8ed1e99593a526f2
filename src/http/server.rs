//! Startup phase and HTTP transport.
//!
//! # Responsibilities
//! - Collect route modules, config routes, filters and collaborators
//! - Validate the routing table once, before any connection is accepted
//! - Wire the dispatcher into Axum with the transport middleware
//!   (tracing, request ID, timeout, body limit)
//! - Run the accept loop between the lifecycle events
//!
//! # Design Decisions
//! - Registration is single-threaded and consumes the builder; the result
//!   is frozen behind `Arc`s
//! - Module routes are registered before config routes, so modules win ties
//! - Every path goes to the dispatcher through the Axum fallback

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
    ServiceBuilderExt,
};

use crate::config::validation::validate_config;
use crate::config::{ConfigError, RouterConfig};
use crate::http::dispatcher::Dispatcher;
use crate::http::filter::{Filter, FilterChain};
use crate::http::request::X_REQUEST_ID;
use crate::http::template::TemplateEngine;
use crate::lifecycle::{shutdown, EventRouter, LifecycleListener, ServerEvent};
use crate::routing::error::RoutingError;
use crate::routing::registry::{RouteRegistry, RoutesModule};
use crate::routing::reverse::{BaseUrl, ReverseRouter};
use crate::session::{run_purge, CookieOptions, MemorySessionStore, SessionStore};

/// Fatal errors raised before serving starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("route configuration rejected: {0}")]
    Routing(#[from] RoutingError),

    #[error("routes[{index}]: invalid method {method:?}")]
    InvalidMethod { index: usize, method: String },
}

/// Collects everything the server needs, then validates it in one go.
pub struct ServerBuilder {
    config: RouterConfig,
    modules: Vec<Box<dyn RoutesModule>>,
    filters: Vec<Arc<dyn Filter>>,
    sessions: Option<Arc<dyn SessionStore>>,
    engine: Option<Arc<dyn TemplateEngine>>,
    events: EventRouter,
}

impl ServerBuilder {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            modules: Vec::new(),
            filters: Vec::new(),
            sessions: None,
            engine: None,
            events: EventRouter::new(),
        }
    }

    /// Add a module contributing routes and handlers.
    pub fn routes(mut self, module: impl RoutesModule + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Append one filter to the chain.
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Append the filters of a provider, in the provider's order.
    pub fn filters<I>(mut self, provider: impl FnOnce() -> I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Filter>>,
    {
        self.filters.extend(provider());
        self
    }

    /// Replace the default in-memory session store.
    pub fn session_store(mut self, store: impl SessionStore + 'static) -> Self {
        self.sessions = Some(Arc::new(store));
        self
    }

    pub fn template_engine(mut self, engine: impl TemplateEngine + 'static) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Listen for `Starting` / `Stopped`.
    pub fn on_event(mut self, listener: impl LifecycleListener + 'static) -> Self {
        self.events.subscribe(Arc::new(listener));
        self
    }

    /// Register everything and validate the result.
    pub fn build(self) -> Result<HttpServer, StartupError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;

        let mut registry = RouteRegistry::new();
        for module in &self.modules {
            module.routes(&mut registry)?;
        }
        register_config_routes(&self.config, &mut registry)?;
        registry.validate()?;

        let routes = registry.routes().len();
        let reverse = ReverseRouter::new(BaseUrl::from(&self.config.router), Arc::new(registry));
        let sessions: Arc<dyn SessionStore> = self
            .sessions
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new(CookieOptions::from(&self.config.session))));
        let filters = FilterChain::new(self.filters);

        tracing::info!(
            routes,
            filters = filters.len(),
            base_path = %reverse.base().path(),
            "Routing table built"
        );

        let dispatcher = Dispatcher::new(reverse, filters, sessions.clone())
            .with_session_name(self.config.session.name.clone())
            .with_engine(self.engine)
            .with_templates(self.config.templates.clone())
            .with_debug(self.config.debug_mode);

        Ok(HttpServer {
            dispatcher: Arc::new(dispatcher),
            sessions,
            events: self.events,
            config: self.config,
        })
    }
}

fn register_config_routes(config: &RouterConfig, registry: &mut RouteRegistry) -> Result<(), StartupError> {
    for (index, route) in config.routes.iter().enumerate() {
        if route.methods.is_empty() {
            registry.route(&route.path, &route.controller)?;
        } else {
            let methods = route
                .methods
                .iter()
                .map(|m| {
                    m.to_ascii_uppercase()
                        .parse::<Method>()
                        .map_err(|_| StartupError::InvalidMethod {
                            index,
                            method: m.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            registry.route_with_methods(&route.path, &route.controller, methods)?;
        }

        if let Some(name) = route.name.as_deref().filter(|n| !n.is_empty()) {
            registry.alias(name, &route.controller);
        }
    }
    Ok(())
}

/// HTTP server driving the dispatcher.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<dyn SessionStore>,
    events: EventRouter,
    config: RouterConfig,
}

impl HttpServer {
    pub fn builder(config: RouterConfig) -> ServerBuilder {
        ServerBuilder::new(config)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Reverse router for building URLs outside a request.
    pub fn reverse(&self) -> &ReverseRouter {
        self.dispatcher.reverse()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.timeouts.request_secs)))
            .map_response_body(Body::new)
            .layer(RequestBodyLimitLayer::new(self.config.security.max_body_size));

        Router::new()
            .fallback(dispatch_handler)
            .with_state(self.dispatcher.clone())
            .layer(middleware)
    }

    /// Run the accept loop until `shutdown` fires.
    ///
    /// `ServerEvent::Starting` is emitted before the first accept and
    /// `ServerEvent::Stopped` after the loop has drained. Expired sessions
    /// are purged in the background while the loop runs.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let app = self.router();
        let purge = tokio::spawn(run_purge(
            self.sessions.clone(),
            Duration::from_secs(self.config.session.purge_interval_secs),
            shutdown.resubscribe(),
        ));

        self.events.emit(ServerEvent::Starting);
        tracing::info!(address = %addr, "HTTP server starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await;
        purge.abort();

        self.events.emit(ServerEvent::Stopped);
        tracing::info!("HTTP server stopped");
        result
    }
}

async fn dispatch_handler(State(dispatcher): State<Arc<Dispatcher>>, request: Request<Body>) -> Response {
    match dispatcher.dispatch(request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "Failed to apply result");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
