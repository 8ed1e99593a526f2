//! Reverse URL resolution for application code and results.
//!
//! # Design Decisions
//! - Paths are always prefixed with the configured base path
//! - A target starting with `/` bypasses the registry
//! - Scheme and host come from configuration first, then from the request

use std::sync::Arc;

use url::Url;

use crate::config::BaseUrlConfig;
use crate::http::request::RequestContext;
use crate::routing::error::RoutingError;
use crate::routing::pattern::RouteParams;
use crate::routing::registry::RouteRegistry;

/// Normalised base URL: the path always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    scheme: String,
    host: String,
    path: String,
}

impl BaseUrl {
    pub fn new(scheme: &str, host: &str, path: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            path: format!("{}/", path.trim_end_matches('/')),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Base path, ending with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Base path without its trailing `/` (empty for the root).
    pub fn prefix(&self) -> &str {
        self.path.trim_end_matches('/')
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self::new("", "", "/")
    }
}

impl From<&BaseUrlConfig> for BaseUrl {
    fn from(config: &BaseUrlConfig) -> Self {
        Self::new(&config.scheme, &config.host, &config.path)
    }
}

/// Builds relative and absolute URLs from route names.
///
/// Cheap to clone; shares the frozen registry.
#[derive(Debug, Clone)]
pub struct ReverseRouter {
    base: BaseUrl,
    registry: Arc<RouteRegistry>,
}

impl ReverseRouter {
    pub fn new(base: BaseUrl, registry: Arc<RouteRegistry>) -> Self {
        Self { base, registry }
    }

    pub fn base(&self) -> &BaseUrl {
        &self.base
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    /// Root-relative path for `to`.
    ///
    /// An empty `to` yields the base path; a `to` starting with `/` is used
    /// verbatim under the base path; anything else is reversed through the
    /// registry.
    pub fn relative(&self, to: &str, params: &RouteParams) -> Result<String, RoutingError> {
        if to.is_empty() {
            return Ok(self.base.path.clone());
        }

        let path = if to.starts_with('/') {
            to.to_string()
        } else {
            self.registry.reverse(to, params)?
        };

        Ok(format!("{}{}", self.base.path, path.trim_start_matches('/')))
    }

    /// Absolute URL for `to`, with scheme and host.
    ///
    /// Blank configuration falls back to the request: a TLS request means
    /// `https`, and the `Host` header supplies the host.
    pub fn absolute(
        &self,
        req: Option<&RequestContext>,
        to: &str,
        params: &RouteParams,
    ) -> Result<Url, RoutingError> {
        let scheme = if !self.base.scheme.is_empty() {
            self.base.scheme.clone()
        } else if req.is_some_and(|r| r.is_tls()) {
            "https".to_string()
        } else {
            "http".to_string()
        };

        let host = if !self.base.host.is_empty() {
            self.base.host.clone()
        } else {
            req.and_then(|r| r.host()).unwrap_or_default().to_string()
        };

        let path = self.relative(to, params)?;
        let raw = format!("{scheme}://{host}{path}");

        if host.is_empty() {
            return Err(RoutingError::InvalidUrl {
                url: raw,
                reason: "no host configured and none on the request".to_string(),
            });
        }

        Url::parse(&raw).map_err(|e| RoutingError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }
}
