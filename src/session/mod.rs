//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Request (Cookie header)
//!     → store.rs SessionStore::load (lazily creates a fresh session)
//!     → Session handle in the request context
//!     → controllers read/write values (marks the session dirty)
//!     → SessionStore::save only when dirty (adds Set-Cookie)
//! ```
//!
//! # Design Decisions
//! - Backend-agnostic: the dispatcher only sees the `SessionStore` trait
//! - One session per request, shared by clone (Arc inside)
//! - memory.rs is the default backend; persistent backends live outside

pub mod memory;
pub mod store;

pub use memory::MemorySessionStore;
pub use store::{cookie_value, run_purge, CookieOptions, Session, SessionError, SessionStore};
