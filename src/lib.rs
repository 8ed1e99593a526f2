//! Routing and dispatch engine for HTTP applications.
//!
//! Route templates map request paths to named handlers; the same templates
//! render URLs back from handler names and parameters.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;
pub mod session;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::RouterConfig;
pub use http::{Filter, HttpServer, Next, RequestContext, ServerBuilder, WebResult};
pub use lifecycle::{ServerEvent, Shutdown};
pub use routing::{ControllerError, RouteParams, RouteRegistry, RoutingError};
