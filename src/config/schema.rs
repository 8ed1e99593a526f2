//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Base URL used by reverse routing and request path stripping.
    pub router: BaseUrlConfig,

    /// Routes defined in configuration, registered after module routes.
    pub routes: Vec<RouteConfig>,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Templates used by error results.
    pub templates: TemplateConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Transport hardening.
    pub security: SecurityConfig,

    /// Elaborate server error messages in response bodies.
    pub debug_mode: bool,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Base URL configuration. Blank scheme/host are inferred per request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BaseUrlConfig {
    pub scheme: String,
    pub host: String,
    pub path: String,
}

impl Default for BaseUrlConfig {
    fn default() -> Self {
        Self {
            scheme: String::new(),
            host: String::new(),
            path: "/".to_string(),
        }
    }
}

/// A route declared in configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path template, e.g. `/hello/:name`.
    pub path: String,

    /// Handler name serving the route.
    pub controller: String,

    /// Optional alias for reverse routing.
    #[serde(default)]
    pub name: Option<String>,

    /// Allowed methods; empty means any.
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie name carrying the session id.
    pub name: String,

    /// Mark the cookie `Secure`.
    pub secure: bool,

    /// Cookie path.
    pub path: String,

    /// Cookie and backend lifetime in seconds.
    pub max_age_secs: u64,

    /// How often the default in-memory store drops expired sessions.
    pub purge_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "routeway".to_string(),
            secure: true,
            path: "/".to_string(),
            max_age_secs: 60 * 60 * 24 * 30,
            purge_interval_secs: 300,
        }
    }
}

/// Error page templates. Empty names render the error as JSON.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TemplateConfig {
    pub forbidden: String,
    pub not_found: String,
    pub unavailable: String,
    pub error_with_code: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout enforced by the transport, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
