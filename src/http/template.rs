//! Template rendering boundary.
//!
//! The router does not define template syntax. Anything that can turn a
//! template name and a data value into bytes can back render results.

use axum::body::Bytes;
use serde_json::Value;

/// Error type returned by template engines.
pub type TemplateError = Box<dyn std::error::Error + Send + Sync>;

/// Renders named templates.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, data: &Value) -> Result<Bytes, TemplateError>;
}

impl<F> TemplateEngine for F
where
    F: Fn(&str, &Value) -> Result<Bytes, TemplateError> + Send + Sync,
{
    fn render(&self, template: &str, data: &Value) -> Result<Bytes, TemplateError> {
        (self)(template, data)
    }
}
