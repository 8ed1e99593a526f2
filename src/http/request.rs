//! Request-scoped context handed to filters and controllers.
//!
//! # Responsibilities
//! - Carry the transport request and the extracted path parameters
//! - Carry the session handle and the per-request tracing span
//! - Give controllers reverse routing and data resolution
//!
//! # Design Decisions
//! - Created fresh per request by the dispatcher, owned by the chain
//! - Request ID assigned by the transport layer as early as possible
//! - TLS is signalled by the transport through the `TlsInfo` extension

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::{Extensions, HeaderMap, HeaderName, Method, Request, Uri};
use serde_json::{Map, Value};
use url::Url;

use crate::routing::error::RoutingError;
use crate::routing::pattern::RouteParams;
use crate::routing::registry::data_params;
use crate::routing::reverse::ReverseRouter;
use crate::session::Session;

/// Header carrying the request id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request extension inserted by transports that terminate TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsInfo;

/// Everything a controller sees about one request.
#[derive(Debug)]
pub struct RequestContext {
    request: Request<Body>,
    handler: String,
    params: RouteParams,
    session: Session,
    reverse: ReverseRouter,
    request_id: String,
    span: tracing::Span,
}

impl RequestContext {
    pub fn new(
        request: Request<Body>,
        handler: impl Into<String>,
        params: RouteParams,
        session: Session,
        reverse: ReverseRouter,
    ) -> Self {
        let handler = handler.into();
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
            handler = %handler,
        );

        Self {
            request,
            handler,
            params,
            session,
            reverse,
            request_id,
            span,
        }
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn extensions(&self) -> &Extensions {
        self.request.extensions()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        self.request.extensions_mut()
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    /// Take the request body, leaving an empty one behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(self.request.body_mut())
    }

    /// Name of the handler this request was routed to.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut RouteParams {
        &mut self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn reverse(&self) -> &ReverseRouter {
        &self.reverse
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The per-request tracing scope.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Whether the request arrived over TLS.
    pub fn is_tls(&self) -> bool {
        self.request.uri().scheme_str() == Some("https")
            || self.request.extensions().get::<TlsInfo>().is_some()
    }

    /// Host from the `Host` header, falling back to the URI authority.
    pub fn host(&self) -> Option<&str> {
        self.request
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.request.uri().authority().map(|a| a.as_str()))
    }

    /// Root-relative URL for a route name (see [`ReverseRouter::relative`]).
    pub fn url_for(&self, to: &str, params: &RouteParams) -> Result<String, RoutingError> {
        self.reverse.relative(to, params)
    }

    /// Absolute URL for a route name, using this request for scheme/host.
    pub fn absolute_url(&self, to: &str, params: &RouteParams) -> Result<Url, RoutingError> {
        self.reverse.absolute(Some(self), to, params)
    }

    /// Resolve data from another handler's data capability.
    pub fn try_data(&self, handler: &str, params: &Map<String, Value>) -> Result<Value, RoutingError> {
        self.reverse
            .registry()
            .try_data(self, handler, &data_params(params))
    }

    /// Resolve data from another handler's data capability.
    ///
    /// # Panics
    /// If `handler` does not exist or has no data capability.
    pub fn data(&self, handler: &str, params: &Map<String, Value>) -> Value {
        self.reverse.registry().data(self, handler, &data_params(params))
    }
}
