//! Routing error taxonomy.

use thiserror::Error;

/// Errors raised while compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// Template does not start with `/`.
    #[error("route template {0:?} must start with '/'")]
    NotRooted(String),

    /// A `:` or `*` marker without a name after it (bare `*` is allowed).
    #[error("route template {template:?} has an unnamed parameter")]
    EmptyParameterName { template: String },

    /// The same parameter name appears twice.
    #[error("route template {template:?} declares parameter {name:?} twice")]
    DuplicateParameter { template: String, name: String },

    /// A wildcard segment that is not the last segment.
    #[error("route template {template:?} has a wildcard before its last segment")]
    WildcardNotLast { template: String },
}

/// Errors surfaced by forward and reverse routing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// No registered route, alias or handler matches.
    #[error("no route found for {0:?}")]
    RouteNotFound(String),

    /// Reverse render invoked without a value the pattern requires.
    #[error("missing parameter {param:?} for route {template:?}")]
    MissingParameter { template: String, param: String },

    /// Reverse render given a value the pattern cannot carry.
    #[error("invalid value for parameter {param:?} of route {template:?}: {reason}")]
    InvalidParameter {
        template: String,
        param: String,
        reason: &'static str,
    },

    /// A handler name bound to several distinct patterns without an alias.
    #[error("handler {name:?} is bound to {} distinct patterns ({}), register an alias", .patterns.len(), .patterns.join(", "))]
    AmbiguousReverse { name: String, patterns: Vec<String> },

    /// A route whose handler has no usable controller entry.
    #[error("the handler {handler:?} has no controller, registered for path {path:?}")]
    MisconfiguredHandler { handler: String, path: String },

    /// A handler exists but lacks the capability being invoked.
    #[error("{handler:?} is not {capability} controller")]
    MissingCapability { handler: String, capability: &'static str },

    /// Template compilation failed.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Absolute URL could not be assembled.
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}
