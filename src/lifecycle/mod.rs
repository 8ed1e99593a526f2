//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (http::server::ServerBuilder):
//!     Register routes → Validate → Build dispatcher → Bind listener
//!
//! Events (events.rs):
//!     ServerEvent::Starting → accept loop → ServerEvent::Stopped
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT or Shutdown::trigger → stop accepting → drain → Stopped
//! ```
//!
//! # Design Decisions
//! - Events are fire-and-forget; listeners cannot veto startup
//! - Listeners run synchronously, in registration order

pub mod events;
pub mod shutdown;
pub mod signals;

pub use events::{EventRouter, LifecycleListener, ServerEvent};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
