//! Route registry: ordered pattern bindings, aliases and handlers.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Forward lookup: first structural (and method) match wins
//! - Reverse lookup: alias, then handler name, then render
//! - Validate that every route resolves to a controller before serving
//!
//! # Design Decisions
//! - Built single-threaded at startup, frozen behind an `Arc` afterwards
//! - O(n) scan in registration order (precedence is data, not heuristics)
//! - A handler bound to several distinct patterns is never reversed by
//!   guessing; it needs an alias

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use serde_json::{Map, Value};

use crate::http::request::RequestContext;
use crate::http::response::WebResult;
use crate::routing::error::RoutingError;
use crate::routing::handler::{Action, ControllerError, DataAction, HandlerEntry, HandlerTable};
use crate::routing::pattern::{RouteParams, RoutePattern};

/// Binding of a compiled pattern to a handler name.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pattern: RoutePattern,
    handler: String,
    methods: Option<Vec<Method>>,
}

impl RouteEntry {
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Methods this route is restricted to; `None` accepts any method.
    pub fn methods(&self) -> Option<&[Method]> {
        self.methods.as_deref()
    }

    fn accepts(&self, method: &Method) -> bool {
        match &self.methods {
            Some(methods) => methods.contains(method),
            None => true,
        }
    }
}

/// Result of a successful forward lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub handler: &'a str,
    pub params: RouteParams,
}

#[derive(Debug, Clone)]
enum AliasTarget {
    /// Index of a concrete route entry.
    Route(usize),
    /// Handler with no route at alias time; resolved like a handler name.
    Handler(String),
}

/// Something that contributes routes and handlers at startup.
pub trait RoutesModule: Send + Sync {
    fn routes(&self, registry: &mut RouteRegistry) -> Result<(), RoutingError>;
}

impl<F> RoutesModule for F
where
    F: Fn(&mut RouteRegistry) -> Result<(), RoutingError> + Send + Sync,
{
    fn routes(&self, registry: &mut RouteRegistry) -> Result<(), RoutingError> {
        (self)(registry)
    }
}

/// The routing table.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<RouteEntry>,
    aliases: HashMap<String, AliasTarget>,
    handlers: HandlerTable,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `template` and bind it to `handler` for any method.
    pub fn route(&mut self, template: &str, handler: impl Into<String>) -> Result<(), RoutingError> {
        self.push(template, handler.into(), None)
    }

    /// Compile `template` and bind it to `handler` for the given methods only.
    pub fn route_with_methods(
        &mut self,
        template: &str,
        handler: impl Into<String>,
        methods: impl IntoIterator<Item = Method>,
    ) -> Result<(), RoutingError> {
        self.push(template, handler.into(), Some(methods.into_iter().collect()))
    }

    fn push(
        &mut self,
        template: &str,
        handler: String,
        methods: Option<Vec<Method>>,
    ) -> Result<(), RoutingError> {
        let pattern = RoutePattern::parse(template)?;
        tracing::debug!(template = %pattern, handler = %handler, "Route registered");
        self.routes.push(RouteEntry {
            pattern,
            handler,
            methods,
        });
        Ok(())
    }

    /// Register `name` as a reverse-lookup key for `handler`.
    ///
    /// The alias binds to the most recently registered route of `handler`.
    /// If `handler` has no route yet, the alias is resolved by handler name
    /// at reverse time. An existing alias is never overwritten.
    pub fn alias(&mut self, name: impl Into<String>, handler: &str) {
        let name = name.into();
        if self.aliases.contains_key(&name) {
            tracing::warn!(alias = %name, handler, "Alias already registered, keeping first");
            return;
        }

        let target = self
            .routes
            .iter()
            .rposition(|r| r.handler == handler)
            .map(AliasTarget::Route)
            .unwrap_or_else(|| AliasTarget::Handler(handler.to_string()));
        self.aliases.insert(name, target);
    }

    /// Bind an action controller to `name`.
    pub fn handle_action<A: Action + 'static>(&mut self, name: impl Into<String>, action: A) {
        self.handlers.set_action(name, Arc::new(action));
    }

    /// Bind an async closure as the action controller of `name`.
    pub fn handle_fn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<WebResult, ControllerError>> + Send + 'static,
    {
        self.handle_action(name, f);
    }

    /// Bind a data controller to `name`.
    pub fn handle_data<D: DataAction + 'static>(&mut self, name: impl Into<String>, data: D) {
        self.handlers.set_data(name, Arc::new(data));
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn handler(&self, name: &str) -> Option<&HandlerEntry> {
        self.handlers.get(name)
    }

    /// Find the first route matching `method` and `path`.
    pub fn match_request(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            if !route.accepts(method) {
                return None;
            }
            route.pattern.matches(path).map(|params| RouteMatch {
                handler: &route.handler,
                params,
            })
        })
    }

    /// Render the path registered under `name` (alias or handler name).
    pub fn reverse(&self, name: &str, params: &RouteParams) -> Result<String, RoutingError> {
        let route = match self.aliases.get(name) {
            Some(AliasTarget::Route(index)) => &self.routes[*index],
            Some(AliasTarget::Handler(handler)) => self.unique_route(name, handler)?,
            None => self.unique_route(name, name)?,
        };
        route.pattern.render(params)
    }

    fn unique_route(&self, name: &str, handler: &str) -> Result<&RouteEntry, RoutingError> {
        let mut bound = self.routes.iter().filter(|r| r.handler == handler);
        let first = bound
            .next()
            .ok_or_else(|| RoutingError::RouteNotFound(name.to_string()))?;

        let mut patterns = vec![first.pattern.template().to_string()];
        for route in bound {
            let template = route.pattern.template();
            if !patterns.iter().any(|p| p == template) {
                patterns.push(template.to_string());
            }
        }

        if patterns.len() > 1 {
            return Err(RoutingError::AmbiguousReverse {
                name: name.to_string(),
                patterns,
            });
        }
        Ok(first)
    }

    /// Check that every route resolves to a controller with an action.
    ///
    /// Called once after registration; any error is a startup failure.
    pub fn validate(&self) -> Result<(), RoutingError> {
        for route in &self.routes {
            let path = route.pattern.template().to_string();
            match self.handlers.get(&route.handler) {
                None => {
                    return Err(RoutingError::MisconfiguredHandler {
                        handler: route.handler.clone(),
                        path,
                    });
                }
                Some(entry) if entry.action().is_none() => {
                    return Err(RoutingError::MissingCapability {
                        handler: route.handler.clone(),
                        capability: "an action",
                    });
                }
                Some(_) => {}
            }
        }

        for (alias, target) in &self.aliases {
            if let AliasTarget::Handler(handler) = target {
                if !self.routes.iter().any(|r| &r.handler == handler) {
                    tracing::warn!(alias = %alias, handler = %handler, "Alias points to a handler without routes");
                }
            }
        }

        Ok(())
    }

    /// Invoke the data capability of `handler`.
    pub fn try_data(
        &self,
        ctx: &RequestContext,
        handler: &str,
        params: &RouteParams,
    ) -> Result<Value, RoutingError> {
        let _span = tracing::debug_span!("router.data", handler).entered();

        let entry = self
            .handlers
            .get(handler)
            .ok_or_else(|| RoutingError::RouteNotFound(handler.to_string()))?;
        let data = entry.data().ok_or_else(|| RoutingError::MissingCapability {
            handler: handler.to_string(),
            capability: "a data",
        })?;
        Ok(data.call(ctx, params))
    }

    /// Invoke the data capability of `handler`.
    ///
    /// # Panics
    /// If `handler` is not registered or has no data capability. Both are
    /// wiring mistakes, not runtime conditions.
    pub fn data(&self, ctx: &RequestContext, handler: &str, params: &RouteParams) -> Value {
        match self.try_data(ctx, handler, params) {
            Ok(value) => value,
            Err(RoutingError::RouteNotFound(_)) => panic!("data controller {handler:?} not found"),
            Err(e) => panic!("{e}"),
        }
    }
}

/// Coerce loosely typed data parameters into route parameters.
///
/// Strings pass through, numbers are formatted in decimal, everything else
/// is dropped.
pub fn data_params(params: &Map<String, Value>) -> RouteParams {
    params
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_end_to_end_match_and_reverse() {
        let mut registry = RouteRegistry::new();
        registry.route("/hello/:name", "greet").unwrap();

        let m = registry.match_request(&Method::GET, "/hello/world").unwrap();
        assert_eq!(m.handler, "greet");
        assert_eq!(m.params, params(&[("name", "world")]));

        let path = registry.reverse("greet", &params(&[("name", "world")])).unwrap();
        assert_eq!(path, "/hello/world");
    }

    #[test]
    fn test_registration_order_precedence() {
        let mut registry = RouteRegistry::new();
        registry.route("/users/new", "users.new").unwrap();
        registry.route("/users/:id", "users.show").unwrap();

        let m = registry.match_request(&Method::GET, "/users/new").unwrap();
        assert_eq!(m.handler, "users.new");
        assert!(m.params.is_empty());

        let m = registry.match_request(&Method::GET, "/users/7").unwrap();
        assert_eq!(m.handler, "users.show");
        assert_eq!(m.params, params(&[("id", "7")]));
    }

    #[test]
    fn test_precedence_follows_registration_order() {
        let mut registry = RouteRegistry::new();
        registry.route("/users/:id", "users.show").unwrap();
        registry.route("/users/new", "users.new").unwrap();

        let m = registry.match_request(&Method::GET, "/users/new").unwrap();
        assert_eq!(m.handler, "users.show");
    }

    #[test]
    fn test_method_restriction() {
        let mut registry = RouteRegistry::new();
        registry
            .route_with_methods("/items", "items.create", [Method::POST])
            .unwrap();
        registry.route("/items", "items.list").unwrap();

        assert_eq!(
            registry.match_request(&Method::POST, "/items").unwrap().handler,
            "items.create"
        );
        assert_eq!(
            registry.match_request(&Method::GET, "/items").unwrap().handler,
            "items.list"
        );
    }

    #[test]
    fn test_no_match() {
        let mut registry = RouteRegistry::new();
        registry.route("/a", "a").unwrap();
        assert!(registry.match_request(&Method::GET, "/b").is_none());
    }

    #[test]
    fn test_reverse_unknown_name() {
        let registry = RouteRegistry::new();
        assert_eq!(
            registry.reverse("nope", &RouteParams::new()),
            Err(RoutingError::RouteNotFound("nope".into()))
        );
    }

    #[test]
    fn test_ambiguous_reverse() {
        let mut registry = RouteRegistry::new();
        registry.route("/articles/:id", "article").unwrap();
        registry.route("/a/:id", "article").unwrap();

        let err = registry.reverse("article", &params(&[("id", "1")])).unwrap_err();
        assert!(matches!(err, RoutingError::AmbiguousReverse { ref patterns, .. } if patterns.len() == 2));
    }

    #[test]
    fn test_alias_disambiguates() {
        let mut registry = RouteRegistry::new();
        registry.route("/articles/:id", "article").unwrap();
        registry.alias("article.long", "article");
        registry.route("/a/:id", "article").unwrap();
        registry.alias("article.short", "article");

        let p = params(&[("id", "5")]);
        assert_eq!(registry.reverse("article.long", &p).unwrap(), "/articles/5");
        assert_eq!(registry.reverse("article.short", &p).unwrap(), "/a/5");
        assert!(registry.reverse("article", &p).is_err());
    }

    #[test]
    fn test_same_pattern_different_methods_is_not_ambiguous() {
        let mut registry = RouteRegistry::new();
        registry
            .route_with_methods("/form", "form", [Method::GET])
            .unwrap();
        registry
            .route_with_methods("/form/", "form", [Method::POST])
            .unwrap();

        assert_eq!(registry.reverse("form", &RouteParams::new()).unwrap(), "/form");
    }

    #[test]
    fn test_alias_first_registration_wins() {
        let mut registry = RouteRegistry::new();
        registry.route("/one", "one").unwrap();
        registry.route("/two", "two").unwrap();
        registry.alias("home", "one");
        registry.alias("home", "two");

        assert_eq!(registry.reverse("home", &RouteParams::new()).unwrap(), "/one");
    }

    #[test]
    fn test_alias_before_route_resolves_by_handler() {
        let mut registry = RouteRegistry::new();
        registry.alias("start", "home");
        registry.route("/", "home").unwrap();

        assert_eq!(registry.reverse("start", &RouteParams::new()).unwrap(), "/");
    }

    #[test]
    fn test_reverse_missing_parameter() {
        let mut registry = RouteRegistry::new();
        registry.route("/hello/:name", "greet").unwrap();
        assert!(matches!(
            registry.reverse("greet", &RouteParams::new()),
            Err(RoutingError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let mut registry = RouteRegistry::new();
        assert!(matches!(
            registry.route("/a/*x/b", "h"),
            Err(RoutingError::Pattern(_))
        ));
        assert!(registry.routes().is_empty());
    }

    #[test]
    fn test_validate_missing_handler() {
        let mut registry = RouteRegistry::new();
        registry.route("/hello/:name", "greet").unwrap();

        assert_eq!(
            registry.validate(),
            Err(RoutingError::MisconfiguredHandler {
                handler: "greet".into(),
                path: "/hello/:name".into(),
            })
        );

        registry.handle_fn("greet", |_ctx| async { Ok(WebResult::text("hi")) });
        assert_eq!(registry.validate(), Ok(()));
    }

    #[test]
    fn test_validate_data_only_handler_on_route() {
        let mut registry = RouteRegistry::new();
        registry.route("/menu", "menu").unwrap();
        registry.handle_data("menu", |_ctx: &RequestContext, _p: &RouteParams| json!([]));

        assert!(matches!(
            registry.validate(),
            Err(RoutingError::MissingCapability { .. })
        ));
    }

    #[test]
    fn test_data_params_coercion() {
        let input = json!({
            "s": "text",
            "i": 42,
            "f": 1.5,
            "b": true,
            "n": null,
        });
        let out = data_params(input.as_object().unwrap());
        assert_eq!(out, params(&[("s", "text"), ("i", "42"), ("f", "1.5")]));
    }
}
