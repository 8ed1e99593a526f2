//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → consumed once by the startup phase
//! ```
//!
//! # Design Decisions
//! - Config is read once; the route table it feeds is frozen afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BaseUrlConfig, ListenerConfig, ObservabilityConfig, RouteConfig, RouterConfig,
    SecurityConfig, SessionConfig, TemplateConfig, TimeoutConfig,
};
