//! Controller results and how they are applied to the transport.
//!
//! # Responsibilities
//! - Describe what a controller produced (bytes, JSON, template, redirect,
//!   error page) without touching the transport
//! - Turn that description into an HTTP response at apply time
//!
//! # Design Decisions
//! - Route redirects are resolved lazily through the reverse router, so a
//!   broken target surfaces as an apply error, never as a silent bad URL
//! - Render results fall back to JSON when no engine or template is set
//! - Error bodies carry `{code, error}`; the detailed error text is only
//!   exposed in debug mode, and 5xx bodies otherwise show the status reason

use std::fmt;

use axum::body::{Body, Bytes};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, InvalidHeaderValue, LOCATION,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::TemplateConfig;
use crate::http::template::{TemplateEngine, TemplateError};
use crate::routing::error::RoutingError;
use crate::routing::pattern::RouteParams;
use crate::routing::reverse::ReverseRouter;

const JSON_UTF8: &str = "application/json; charset=utf-8";
const HTML_UTF8: &str = "text/html; charset=utf-8";
const TEXT_UTF8: &str = "text/plain; charset=utf-8";

/// Errors raised while applying a result.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("redirect target could not be resolved: {0}")]
    Reverse(#[from] RoutingError),

    #[error("could not encode JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template {template:?} failed to render: {source}")]
    Template {
        template: String,
        #[source]
        source: TemplateError,
    },

    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Which configured template an error page uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPage {
    Forbidden,
    NotFound,
    Unavailable,
    WithCode,
}

impl ErrorPage {
    fn template(self, templates: &TemplateConfig) -> &str {
        match self {
            ErrorPage::Forbidden => &templates.forbidden,
            ErrorPage::NotFound => &templates.not_found,
            ErrorPage::Unavailable => &templates.unavailable,
            ErrorPage::WithCode => &templates.error_with_code,
        }
    }
}

/// Body description of a [`WebResult`].
#[derive(Debug, Clone)]
pub enum ResultBody {
    Empty,
    Bytes(Bytes),
    Json(Value),
    Template { name: String, data: Value },
    RouteRedirect { to: String, params: RouteParams },
    Redirect(String),
    Error {
        page: ErrorPage,
        message: String,
        detail: String,
    },
}

/// What a controller or filter produced.
#[derive(Debug, Clone)]
pub struct WebResult {
    status: StatusCode,
    headers: HeaderMap,
    body: ResultBody,
}

impl WebResult {
    fn new(status: StatusCode, body: ResultBody) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Raw response with the given status and body.
    pub fn http(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, ResultBody::Bytes(body.into()))
    }

    /// `200 OK` plain text.
    pub fn text(body: impl Into<String>) -> Self {
        Self::http(StatusCode::OK, body.into()).with_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_UTF8))
    }

    /// Status only, no body.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, ResultBody::Empty)
    }

    /// `200 OK` JSON data.
    pub fn json(data: Value) -> Self {
        Self::new(StatusCode::OK, ResultBody::Json(data))
    }

    /// Render `template` with `data` (JSON when no engine is available).
    pub fn render(template: impl Into<String>, data: Value) -> Self {
        Self::new(
            StatusCode::OK,
            ResultBody::Template {
                name: template.into(),
                data,
            },
        )
    }

    /// `303 See Other` to a route, resolved when the result is applied.
    pub fn route_redirect(to: impl Into<String>, params: RouteParams) -> Self {
        Self::new(
            StatusCode::SEE_OTHER,
            ResultBody::RouteRedirect {
                to: to.into(),
                params,
            },
        )
    }

    /// `303 See Other` to a fixed URL.
    pub fn url_redirect(url: impl Into<String>) -> Self {
        Self::new(StatusCode::SEE_OTHER, ResultBody::Redirect(url.into()))
    }

    /// File download; `force` selects `attachment` over `inline`.
    pub fn download(data: impl Into<Bytes>, content_type: &str, file_name: &str, force: bool) -> Result<Self, InvalidHeaderValue> {
        let disposition = if force { "attachment" } else { "inline" };
        Ok(Self::http(StatusCode::OK, data)
            .with_header(CONTENT_TYPE, HeaderValue::from_str(content_type)?)
            .with_header(
                CONTENT_DISPOSITION,
                HeaderValue::from_str(&format!("{disposition}; filename={file_name}"))?,
            ))
    }

    /// Error page with an explicit status.
    pub fn error_with_code<E: fmt::Display + fmt::Debug + ?Sized>(err: &E, status: StatusCode) -> Self {
        tracing::error!(error = %err, status = %status, "Error response");
        Self::error_page(ErrorPage::WithCode, status, public_message(err, status), format!("{err:#?}"))
    }

    fn error_page(page: ErrorPage, status: StatusCode, message: String, detail: String) -> Self {
        Self::new(status, ResultBody::Error { page, message, detail })
    }

    /// `500 Internal Server Error`.
    pub fn server_error<E: fmt::Display + fmt::Debug + ?Sized>(err: &E) -> Self {
        Self::error_with_code(err, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// `503 Service Unavailable`.
    pub fn unavailable<E: fmt::Display + fmt::Debug + ?Sized>(err: &E) -> Self {
        tracing::error!(error = %err, "Service unavailable");
        let status = StatusCode::SERVICE_UNAVAILABLE;
        Self::error_page(ErrorPage::Unavailable, status, public_message(err, status), format!("{err:#?}"))
    }

    /// `404 Not Found`.
    pub fn not_found<E: fmt::Display + fmt::Debug + ?Sized>(err: &E) -> Self {
        tracing::warn!(error = %err, "Not found");
        Self::error_page(ErrorPage::NotFound, StatusCode::NOT_FOUND, err.to_string(), format!("{err:#?}"))
    }

    /// `403 Forbidden`.
    pub fn forbidden<E: fmt::Display + fmt::Debug + ?Sized>(err: &E) -> Self {
        tracing::warn!(error = %err, "Forbidden");
        Self::error_page(ErrorPage::Forbidden, StatusCode::FORBIDDEN, err.to_string(), format!("{err:#?}"))
    }

    /// `501 Not Implemented`.
    pub fn not_implemented() -> Self {
        Self::empty(StatusCode::NOT_IMPLEMENTED)
    }

    /// Turn a redirect into a permanent one (`301`).
    pub fn permanent(mut self) -> Self {
        if matches!(self.body, ResultBody::RouteRedirect { .. } | ResultBody::Redirect(_)) {
            self.status = StatusCode::MOVED_PERMANENTLY;
        }
        self
    }

    pub fn no_cache(self) -> Self {
        self.with_header(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, max-age=0, must-revalidate, no-store"),
        )
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &ResultBody {
        &self.body
    }

    /// Produce the transport response.
    pub fn apply(self, env: &ApplyEnv<'_>) -> Result<Response<Body>, ApplyError> {
        let mut headers = self.headers;

        let body = match self.body {
            ResultBody::Empty => Body::empty(),
            ResultBody::Bytes(bytes) => Body::from(bytes),
            ResultBody::Json(data) => json_body(&mut headers, &data)?,
            ResultBody::Template { name, data } => render_body(env, &mut headers, &name, &data)?,
            ResultBody::RouteRedirect { to, params } => {
                let location = env.reverse.relative(&to, &params)?;
                headers.insert(LOCATION, HeaderValue::from_str(&location)?);
                Body::empty()
            }
            ResultBody::Redirect(url) => {
                headers.insert(LOCATION, HeaderValue::from_str(&url)?);
                Body::empty()
            }
            ResultBody::Error { page, message, detail } => {
                let error = if env.debug { detail } else { message };
                let data = json!({ "code": self.status.as_u16(), "error": error });
                render_body(env, &mut headers, page.template(env.templates), &data)?
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Collaborators needed to apply a result.
#[derive(Clone, Copy)]
pub struct ApplyEnv<'a> {
    pub reverse: &'a ReverseRouter,
    pub engine: Option<&'a dyn TemplateEngine>,
    pub templates: &'a TemplateConfig,
    pub debug: bool,
}

/// Text shown outside debug mode. Server failures never expose the error.
fn public_message<E: fmt::Display + ?Sized>(err: &E, status: StatusCode) -> String {
    if status.is_server_error() {
        status.canonical_reason().unwrap_or("Server Error").to_string()
    } else {
        err.to_string()
    }
}

fn json_body(headers: &mut HeaderMap, data: &Value) -> Result<Body, ApplyError> {
    let bytes = serde_json::to_vec(data)?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    Ok(Body::from(bytes))
}

fn render_body(
    env: &ApplyEnv<'_>,
    headers: &mut HeaderMap,
    template: &str,
    data: &Value,
) -> Result<Body, ApplyError> {
    match env.engine {
        Some(engine) if !template.is_empty() => {
            let bytes = engine.render(template, data).map_err(|source| ApplyError::Template {
                template: template.to_string(),
                source,
            })?;
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_UTF8));
            Ok(Body::from(bytes))
        }
        _ => json_body(headers, data),
    }
}
