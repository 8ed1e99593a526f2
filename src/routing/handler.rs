//! Handler table: controller capabilities keyed by handler name.
//!
//! # Design Decisions
//! - An entry has an action, a data capability, or both
//! - Closures are accepted directly through blanket impls
//! - Entries are `Arc`ed so the frozen table is shared without locks

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::http::request::RequestContext;
use crate::http::response::WebResult;
use crate::routing::pattern::RouteParams;

/// Error type returned by controllers and filters.
pub type ControllerError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP action capability of a controller.
#[async_trait]
pub trait Action: Send + Sync {
    /// Handle a matched request.
    async fn call(&self, ctx: RequestContext) -> Result<WebResult, ControllerError>;
}

#[async_trait]
impl<F, Fut> Action for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<WebResult, ControllerError>> + Send + 'static,
{
    async fn call(&self, ctx: RequestContext) -> Result<WebResult, ControllerError> {
        (self)(ctx).await
    }
}

/// Data-only capability, used to resolve values outside the HTTP flow
/// (template includes and the like).
pub trait DataAction: Send + Sync {
    fn call(&self, ctx: &RequestContext, params: &RouteParams) -> Value;
}

impl<F> DataAction for F
where
    F: Fn(&RequestContext, &RouteParams) -> Value + Send + Sync,
{
    fn call(&self, ctx: &RequestContext, params: &RouteParams) -> Value {
        (self)(ctx, params)
    }
}

/// A named controller.
#[derive(Clone, Default)]
pub struct HandlerEntry {
    action: Option<Arc<dyn Action>>,
    data: Option<Arc<dyn DataAction>>,
}

impl HandlerEntry {
    pub fn action(&self) -> Option<&Arc<dyn Action>> {
        self.action.as_ref()
    }

    pub fn data(&self) -> Option<&Arc<dyn DataAction>> {
        self.data.as_ref()
    }
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("action", &self.action.is_some())
            .field("data", &self.data.is_some())
            .finish()
    }
}

/// Handler name → controller entry.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    entries: HashMap<String, HandlerEntry>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or replace) the action capability of `name`.
    pub fn set_action(&mut self, name: impl Into<String>, action: Arc<dyn Action>) {
        self.entries.entry(name.into()).or_default().action = Some(action);
    }

    /// Bind (or replace) the data capability of `name`.
    pub fn set_data(&mut self, name: impl Into<String>, data: Arc<dyn DataAction>) {
        self.entries.entry(name.into()).or_default().data = Some(data);
    }

    pub fn get(&self, name: &str) -> Option<&HandlerEntry> {
        self.entries.get(name)
    }
}
