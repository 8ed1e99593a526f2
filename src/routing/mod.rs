//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (single-threaded):
//!     RoutesModule[] + config routes
//!     → registry.rs (compile patterns, aliases, handlers)
//!     → validate (every route has a controller)
//!     → Freeze as Arc<RouteRegistry>
//!
//! Forward:
//!     (method, path) → registry.rs (first match wins)
//!     → pattern.rs (match + extract params)
//!     → handler name + params
//!
//! Reverse:
//!     (name, params) → reverse.rs (base path, scheme/host)
//!     → registry.rs (alias / handler lookup)
//!     → pattern.rs (render)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod error;
pub mod handler;
pub mod pattern;
pub mod registry;
pub mod reverse;

pub use error::{PatternError, RoutingError};
pub use handler::{Action, ControllerError, DataAction, HandlerEntry};
pub use pattern::{RouteParams, RoutePattern, WILDCARD_KEY};
pub use registry::{data_params, RouteEntry, RouteMatch, RouteRegistry, RoutesModule};
pub use reverse::{BaseUrl, ReverseRouter};
