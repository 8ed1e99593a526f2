//! Filter chain around controller invocation.
//!
//! # Responsibilities
//! - Run filters in registration order on the way in
//! - Unwind in reverse order on the way out
//! - Let any filter short-circuit with its own result
//!
//! # Design Decisions
//! - The chain is a frozen slice plus an index; `Next` is a cursor into it
//! - No closures capturing mutable state: ordering is data
//! - Filters are shared read-only by all concurrent requests

use std::sync::Arc;

use async_trait::async_trait;

use crate::http::request::RequestContext;
use crate::http::response::WebResult;
use crate::routing::handler::{Action, ControllerError};

/// A request/response interceptor.
#[async_trait]
pub trait Filter: Send + Sync {
    /// Inspect or modify the request, call `next` (or not), then inspect or
    /// modify the result.
    async fn filter(&self, ctx: RequestContext, next: Next<'_>) -> Result<WebResult, ControllerError>;
}

/// Continuation to the rest of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    filters: &'a [Arc<dyn Filter>],
    index: usize,
    endpoint: &'a dyn Action,
}

impl<'a> Next<'a> {
    /// Invoke the next filter, or the controller at the end of the chain.
    pub async fn run(self, ctx: RequestContext) -> Result<WebResult, ControllerError> {
        match self.filters.get(self.index) {
            Some(filter) => {
                let next = Next {
                    index: self.index + 1,
                    ..self
                };
                filter.filter(ctx, next).await
            }
            None => self.endpoint.call(ctx).await,
        }
    }
}

/// Ordered, immutable list of filters.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Arc<[Arc<dyn Filter>]>,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self {
            filters: filters.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run `ctx` through every filter and finally `endpoint`.
    pub async fn run(&self, ctx: RequestContext, endpoint: &dyn Action) -> Result<WebResult, ControllerError> {
        Next {
            filters: &self.filters,
            index: 0,
            endpoint,
        }
        .run(ctx)
        .await
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}
