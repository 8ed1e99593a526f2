//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that configured route templates compile
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::routing::pattern::RoutePattern;

/// Upper bound for `session.max_age_secs` (ten years).
pub const MAX_SESSION_AGE_SECS: u64 = 60 * 60 * 24 * 365 * 10;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("router.path {0:?} must start with '/'")]
    BasePath(String),

    #[error("router.scheme {0:?} must be http or https")]
    Scheme(String),

    #[error("routes[{index}]: {reason}")]
    Route { index: usize, reason: String },

    #[error("session.name must not be empty")]
    SessionName,

    #[error("session.max_age_secs {0} exceeds the ten year limit")]
    SessionMaxAge(u64),

    #[error("session.purge_interval_secs must be greater than zero")]
    SessionPurgeInterval,

    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,

    #[error("observability.log_format {0:?} must be pretty or json")]
    LogFormat(String),
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if !config.router.path.is_empty() && !config.router.path.starts_with('/') {
        errors.push(ValidationError::BasePath(config.router.path.clone()));
    }

    if !matches!(config.router.scheme.as_str(), "" | "http" | "https") {
        errors.push(ValidationError::Scheme(config.router.scheme.clone()));
    }

    for (index, route) in config.routes.iter().enumerate() {
        if let Err(e) = RoutePattern::parse(&route.path) {
            errors.push(ValidationError::Route {
                index,
                reason: e.to_string(),
            });
        }
        if route.controller.trim().is_empty() {
            errors.push(ValidationError::Route {
                index,
                reason: "controller must not be empty".to_string(),
            });
        }
        for method in &route.methods {
            if method.parse::<Method>().is_err() {
                errors.push(ValidationError::Route {
                    index,
                    reason: format!("invalid method {method:?}"),
                });
            }
        }
    }

    if config.session.name.is_empty() {
        errors.push(ValidationError::SessionName);
    }

    if config.session.max_age_secs > MAX_SESSION_AGE_SECS {
        errors.push(ValidationError::SessionMaxAge(config.session.max_age_secs));
    }

    if config.session.purge_interval_secs == 0 {
        errors.push(ValidationError::SessionPurgeInterval);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(config.observability.log_format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&RouterConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = RouterConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.router.scheme = "ftp".into();
        config.timeouts.request_secs = 0;
        config.routes.push(RouteConfig {
            path: "/a/*x/b".into(),
            controller: "a".into(),
            name: None,
            methods: vec!["GET".into(), "NOT A METHOD".into()],
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::RequestTimeout));
        assert!(errors.contains(&ValidationError::Scheme("ftp".into())));
    }

    #[test]
    fn test_session_bounds() {
        let mut config = RouterConfig::default();
        config.session.max_age_secs = u64::MAX;
        config.session.purge_interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::SessionMaxAge(u64::MAX),
                ValidationError::SessionPurgeInterval,
            ]
        );

        config.session.max_age_secs = MAX_SESSION_AGE_SECS;
        config.session.purge_interval_secs = 1;
        assert_eq!(validate_config(&config), Ok(()));
    }
}
