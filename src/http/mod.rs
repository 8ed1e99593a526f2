//! HTTP dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request ID, timeout, body limit, tracing)
//!     → dispatcher.rs (match, session, filters, panic recovery)
//!     → filter.rs (onion chain) → controller action
//!     → response.rs (WebResult::apply, redirects via reverse routing)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod filter;
pub mod request;
pub mod response;
pub mod server;
pub mod template;

pub use dispatcher::{Dispatcher, NOT_FOUND_HANDLER};
pub use filter::{Filter, FilterChain, Next};
pub use request::{RequestContext, TlsInfo, X_REQUEST_ID};
pub use response::{ApplyError, WebResult};
pub use server::{HttpServer, ServerBuilder, StartupError};
pub use template::TemplateEngine;
