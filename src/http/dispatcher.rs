//! Per-request dispatch.
//!
//! # Data Flow
//! ```text
//! Request
//!     → strip base path, RouteRegistry::match_request
//!         (no match → synthetic "web.notfound" handler)
//!     → SessionStore::load
//!     → FilterChain → controller action
//!         (error or panic → 500 result)
//!     → WebResult::apply
//!     → SessionStore::save (only if the session was mutated)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Every request yields exactly one result, unmatched ones included
//! - Controller failures never escape; they become server-error results
//! - The dispatcher has no timeout of its own; the transport layer owns deadlines

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures_util::FutureExt;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::Instrument;

use crate::config::TemplateConfig;
use crate::http::filter::FilterChain;
use crate::http::request::RequestContext;
use crate::http::response::{ApplyEnv, ApplyError, WebResult};
use crate::http::template::TemplateEngine;
use crate::observability::metrics;
use crate::routing::error::RoutingError;
use crate::routing::handler::{Action, ControllerError};
use crate::routing::pattern::RouteParams;
use crate::routing::registry::data_params;
use crate::routing::reverse::ReverseRouter;
use crate::session::{Session, SessionStore};

/// Handler name used for requests no route matches.
///
/// Registering an action under this name customizes the not-found page.
pub const NOT_FOUND_HANDLER: &str = "web.notfound";

/// A controller panicked while handling a request.
#[derive(Debug, Error)]
#[error("controller panicked: {0}")]
pub struct ControllerPanic(pub String);

/// Built-in not-found controller.
struct NotFound;

#[async_trait]
impl Action for NotFound {
    async fn call(&self, ctx: RequestContext) -> Result<WebResult, ControllerError> {
        Ok(WebResult::not_found(&format!(
            "no route matches {} {}",
            ctx.method(),
            ctx.uri().path()
        )))
    }
}

/// Routes requests through filters to controllers and applies their results.
pub struct Dispatcher {
    reverse: ReverseRouter,
    filters: FilterChain,
    sessions: Arc<dyn SessionStore>,
    session_name: String,
    engine: Option<Arc<dyn TemplateEngine>>,
    templates: TemplateConfig,
    debug: bool,
}

impl Dispatcher {
    pub fn new(reverse: ReverseRouter, filters: FilterChain, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            reverse,
            filters,
            sessions,
            session_name: crate::config::SessionConfig::default().name,
            engine: None,
            templates: TemplateConfig::default(),
            debug: false,
        }
    }

    /// Cookie name the session is stored under.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    pub fn with_engine(mut self, engine: Option<Arc<dyn TemplateEngine>>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_templates(mut self, templates: TemplateConfig) -> Self {
        self.templates = templates;
        self
    }

    /// Expose detailed error text in error responses.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn reverse(&self) -> &ReverseRouter {
        &self.reverse
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Handle one request.
    ///
    /// Errors are only returned when the result cannot be turned into a
    /// response (e.g. a redirect to an unknown route).
    pub async fn dispatch(&self, request: Request<Body>) -> Result<Response<Body>, ApplyError> {
        let start = Instant::now();
        let registry = self.reverse.registry().clone();

        let matched = strip_base(request.uri().path(), self.reverse.base().prefix())
            .and_then(|path| registry.match_request(request.method(), path))
            .map(|m| (m.handler.to_string(), m.params));
        let (handler, params) = matched.unwrap_or_else(|| {
            tracing::debug!(method = %request.method(), path = %request.uri().path(), "No route matched");
            (NOT_FOUND_HANDLER.to_string(), RouteParams::new())
        });

        let (parts, body) = request.into_parts();
        let session = self.load_session(&parts.headers).await;
        let request = Request::from_parts(parts, body);

        let ctx = RequestContext::new(request, handler.clone(), params, session.clone(), self.reverse.clone());
        let span = ctx.span().clone();

        let endpoint: Arc<dyn Action> = match registry.handler(&handler).and_then(|h| h.action()) {
            Some(action) => action.clone(),
            None => Arc::new(NotFound),
        };

        let outcome = AssertUnwindSafe(self.filters.run(ctx, endpoint.as_ref()))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let result = span.in_scope(|| match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                metrics::record_controller_failure(&handler);
                WebResult::server_error(&*err)
            }
            Err(panic) => {
                metrics::record_controller_failure(&handler);
                WebResult::server_error(&ControllerPanic(panic_message(panic.as_ref())))
            }
        });

        let env = ApplyEnv {
            reverse: &self.reverse,
            engine: self.engine.as_deref(),
            templates: &self.templates,
            debug: self.debug,
        };
        let mut response = match span.in_scope(|| result.apply(&env)) {
            Ok(response) => response,
            Err(err) => {
                metrics::record_dispatch(&handler, StatusCode::INTERNAL_SERVER_ERROR.as_u16(), start);
                return Err(err);
            }
        };

        if session.is_dirty() {
            if let Err(err) = self
                .sessions
                .save(response.headers_mut(), &self.session_name, &session)
                .instrument(span.clone())
                .await
            {
                span.in_scope(|| tracing::warn!(error = %err, "Failed to save session"));
            }
        }

        metrics::record_dispatch(&handler, response.status().as_u16(), start);
        span.in_scope(|| {
            tracing::debug!(
                status = response.status().as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request dispatched"
            )
        });
        Ok(response)
    }

    async fn load_session(&self, headers: &axum::http::HeaderMap) -> Session {
        match self.sessions.load(headers, &self.session_name).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load session, starting a new one");
                Session::new()
            }
        }
    }

    /// Invoke a handler's data capability, bypassing filters and transport.
    pub fn try_data(
        &self,
        ctx: &RequestContext,
        handler: &str,
        params: &Map<String, Value>,
    ) -> Result<Value, RoutingError> {
        self.reverse.registry().try_data(ctx, handler, &data_params(params))
    }

    /// Invoke a handler's data capability, bypassing filters and transport.
    ///
    /// # Panics
    /// If `handler` does not exist or has no data capability.
    pub fn data(&self, ctx: &RequestContext, handler: &str, params: &Map<String, Value>) -> Value {
        self.reverse.registry().data(ctx, handler, &data_params(params))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.reverse.registry().routes().len())
            .field("filters", &self.filters.len())
            .field("session_name", &self.session_name)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Remove the base path prefix; `None` if `path` lies outside it.
fn strip_base<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(prefix) {
        Some("") => Some("/"),
        Some(rest) if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
