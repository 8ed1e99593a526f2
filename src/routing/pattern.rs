//! Compiled path templates.
//!
//! # Template Syntax
//! - `/users/new`: literal segments, decoded once at parse time and
//!   compared against the decoded request segment
//! - `/users/:id`: `:` binds exactly one segment to `id`
//! - `/assets/*rest`: trailing `*` binds the remaining path to `rest`;
//!   a bare `*` binds it to [`WILDCARD_KEY`]
//!
//! # Design Decisions
//! - Matching and rendering are inverses: a parameter set accepted by
//!   [`RoutePattern::render`] is re-extracted unchanged by
//!   [`RoutePattern::matches`]
//! - One trailing `/` is ignored on both templates and request paths
//! - Empty named values never match and never render
//! - No regex: matching is a single pass over the segments

use std::collections::HashMap;
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::routing::error::{PatternError, RoutingError};

/// Parameters extracted from, or rendered into, a path.
pub type RouteParams = HashMap<String, String>;

/// Parameter key used by a bare `*` wildcard.
pub const WILDCARD_KEY: &str = "*";

/// Characters escaped inside a single rendered path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

/// A path template compiled once at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a template such as `/hello/:name` or `/static/*path`.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        if !template.starts_with('/') {
            return Err(PatternError::NotRooted(template.to_string()));
        }

        let parts = split_path(template);
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::EmptyParameterName {
                        template: template.to_string(),
                    });
                }
                Segment::Param(name.to_string())
            } else if let Some(name) = part.strip_prefix('*') {
                if i + 1 != parts.len() {
                    return Err(PatternError::WildcardNotLast {
                        template: template.to_string(),
                    });
                }
                let name = if name.is_empty() { WILDCARD_KEY } else { name };
                Segment::Wildcard(name.to_string())
            } else {
                Segment::Literal(decode(part))
            };

            if let Segment::Param(name) | Segment::Wildcard(name) = &segment {
                let taken = segments.iter().any(|s| {
                    matches!(s, Segment::Param(n) | Segment::Wildcard(n) if n == name)
                });
                if taken {
                    return Err(PatternError::DuplicateParameter {
                        template: template.to_string(),
                        name: name.clone(),
                    });
                }
            }

            segments.push(segment);
        }

        Ok(Self {
            template: format!("/{}", parts.join("/")),
            segments,
        })
    }

    /// The normalised template string (no trailing slash).
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names of all parameters, in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) | Segment::Wildcard(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path, returning the extracted parameters.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts = split_path(path);
        let mut params = RouteParams::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if decode(parts.get(i)?) != *literal {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = decode(parts.get(i)?);
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), value);
                }
                Segment::Wildcard(name) => {
                    // every earlier segment consumed one part, so i <= parts.len()
                    let rest = parts[i..]
                        .iter()
                        .map(|p| decode(p))
                        .collect::<Vec<_>>()
                        .join("/");
                    if !rest.is_empty() {
                        params.insert(name.clone(), rest);
                    }
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Render the pattern with the given parameters.
    ///
    /// Named values are percent-escaped. The wildcard is optional and is
    /// escaped per `/`-separated piece; a trailing `/` in it is rejected
    /// since matching would drop it. Unknown keys are ignored.
    pub fn render(&self, params: &RouteParams) -> Result<String, RoutingError> {
        let mut parts = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => parts.push(utf8_percent_encode(literal, SEGMENT).to_string()),
                Segment::Param(name) => match params.get(name) {
                    Some(value) if !value.is_empty() => {
                        parts.push(utf8_percent_encode(value, SEGMENT).to_string());
                    }
                    _ => {
                        return Err(RoutingError::MissingParameter {
                            template: self.template.clone(),
                            param: name.clone(),
                        });
                    }
                },
                Segment::Wildcard(name) => {
                    if let Some(value) = params.get(name).filter(|v| !v.is_empty()) {
                        if value.ends_with('/') {
                            return Err(RoutingError::InvalidParameter {
                                template: self.template.clone(),
                                param: name.clone(),
                                reason: "a wildcard value cannot end with '/'",
                            });
                        }
                        let escaped = value
                            .split('/')
                            .map(|piece| utf8_percent_encode(piece, SEGMENT).to_string())
                            .collect::<Vec<_>>()
                            .join("/");
                        parts.push(escaped);
                    }
                }
            }
        }

        Ok(format!("/{}", parts.join("/")))
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Split a path into segments, ignoring the leading and one trailing `/`.
fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn decode(part: &str) -> String {
    percent_decode_str(part).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_literal_match() {
        let pattern = RoutePattern::parse("/users/new").unwrap();
        assert_eq!(pattern.matches("/users/new"), Some(RouteParams::new()));
        assert_eq!(pattern.matches("/users/old"), None);
        assert_eq!(pattern.matches("/users"), None);
        assert_eq!(pattern.matches("/users/new/extra"), None);
    }

    #[test]
    fn test_named_parameter() {
        let pattern = RoutePattern::parse("/hello/:name").unwrap();
        assert_eq!(pattern.matches("/hello/world"), Some(params(&[("name", "world")])));
        assert_eq!(pattern.matches("/hello/"), None);
        assert_eq!(pattern.matches("/hello"), None);
    }

    #[test]
    fn test_trailing_slash_equivalence() {
        let pattern = RoutePattern::parse("/foo").unwrap();
        assert_eq!(pattern.matches("/foo"), pattern.matches("/foo/"));
        assert!(pattern.matches("/foo/").is_some());

        let slashed = RoutePattern::parse("/foo/").unwrap();
        assert_eq!(slashed.template(), "/foo");
        assert!(slashed.matches("/foo").is_some());
    }

    #[test]
    fn test_root_pattern() {
        let pattern = RoutePattern::parse("/").unwrap();
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("").is_some());
        assert!(pattern.matches("/x").is_none());
        assert_eq!(pattern.render(&RouteParams::new()).unwrap(), "/");
    }

    #[test]
    fn test_wildcard_capture() {
        let pattern = RoutePattern::parse("/assets/*rest").unwrap();
        assert_eq!(
            pattern.matches("/assets/css/app.css"),
            Some(params(&[("rest", "css/app.css")]))
        );
        assert_eq!(pattern.matches("/assets"), Some(RouteParams::new()));
        assert_eq!(pattern.matches("/other/css"), None);
    }

    #[test]
    fn test_bare_wildcard_uses_reserved_key() {
        let pattern = RoutePattern::parse("/files/*").unwrap();
        assert_eq!(
            pattern.matches("/files/a/b"),
            Some(params(&[(WILDCARD_KEY, "a/b")]))
        );
        assert_eq!(
            pattern.render(&params(&[(WILDCARD_KEY, "a/b")])).unwrap(),
            "/files/a/b"
        );
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            RoutePattern::parse("users"),
            Err(PatternError::NotRooted(_))
        ));
        assert!(matches!(
            RoutePattern::parse("/a/*rest/b"),
            Err(PatternError::WildcardNotLast { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/a/:id/:id"),
            Err(PatternError::DuplicateParameter { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/a/:id/*id"),
            Err(PatternError::DuplicateParameter { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/a/:"),
            Err(PatternError::EmptyParameterName { .. })
        ));
    }

    #[test]
    fn test_render() {
        let pattern = RoutePattern::parse("/hello/:name").unwrap();
        assert_eq!(
            pattern.render(&params(&[("name", "world")])).unwrap(),
            "/hello/world"
        );
        assert_eq!(
            pattern.render(&params(&[("name", "a b/c")])).unwrap(),
            "/hello/a%20b%2Fc"
        );
        assert!(matches!(
            pattern.render(&RouteParams::new()),
            Err(RoutingError::MissingParameter { ref param, .. }) if param == "name"
        ));
        assert!(pattern.render(&params(&[("name", "")])).is_err());
    }

    #[test]
    fn test_render_optional_wildcard() {
        let pattern = RoutePattern::parse("/assets/*rest").unwrap();
        assert_eq!(pattern.render(&RouteParams::new()).unwrap(), "/assets");
        assert_eq!(
            pattern.render(&params(&[("rest", "css/my app.css")])).unwrap(),
            "/assets/css/my%20app.css"
        );
    }

    #[test]
    fn test_match_render_inverse() {
        let cases: Vec<(&str, RouteParams)> = vec![
            ("/", params(&[])),
            ("/users/:id", params(&[("id", "42")])),
            ("/users/:id", params(&[("id", "with space")])),
            ("/users/:id", params(&[("id", "slash/inside")])),
            ("/users/:id", params(&[("id", "100%")])),
            ("/users/:id", params(&[("id", "ünïcødé")])),
            ("/users/:id", params(&[("id", "q?x=1#frag")])),
            ("/a/:x/b/:y", params(&[("x", "1"), ("y", "two")])),
            ("/assets/*rest", params(&[("rest", "css/app.css")])),
            ("/assets/*rest", params(&[("rest", "deep/nested/dir/file name.js")])),
            ("/assets/*rest", params(&[])),
            ("/u/:id/*tail", params(&[("id", "7"), ("tail", "x/y")])),
            ("/*", params(&[(WILDCARD_KEY, "any/thing")])),
            ("/assets/*rest", params(&[("rest", "/leading")])),
            ("/assets/*rest", params(&[("rest", "a//b")])),
            ("/caf%C3%A9/:id", params(&[("id", "x")])),
            ("/with%2Fslash", params(&[])),
        ];

        for (template, set) in cases {
            let pattern = RoutePattern::parse(template).unwrap();
            let rendered = pattern.render(&set).unwrap();
            let extracted = pattern.matches(&rendered);
            assert_eq!(
                extracted.as_ref(),
                Some(&set),
                "template {template} rendered {rendered}"
            );
        }

        // values that cannot survive a round trip are refused instead
        let rejected: Vec<(&str, RouteParams)> = vec![
            ("/assets/*rest", params(&[("rest", "a/")])),
            ("/assets/*rest", params(&[("rest", "/")])),
            ("/users/:id", params(&[("id", "")])),
        ];
        for (template, set) in rejected {
            let pattern = RoutePattern::parse(template).unwrap();
            assert!(pattern.render(&set).is_err(), "template {template} with {set:?}");
        }
    }

    #[test]
    fn test_wildcard_trailing_slash_is_rejected() {
        let pattern = RoutePattern::parse("/assets/*rest").unwrap();
        for value in ["a/", "/", "css/app/"] {
            assert!(
                matches!(
                    pattern.render(&params(&[("rest", value)])),
                    Err(RoutingError::InvalidParameter { ref param, .. }) if param == "rest"
                ),
                "value {value:?}"
            );
        }
    }

    #[test]
    fn test_escaped_literal_matches_its_rendering() {
        let pattern = RoutePattern::parse("/caf%C3%A9/:id").unwrap();
        assert_eq!(pattern.template(), "/caf%C3%A9/:id");

        let rendered = pattern.render(&params(&[("id", "1")])).unwrap();
        assert_eq!(rendered, "/caf%C3%A9/1");
        assert_eq!(pattern.matches(&rendered), Some(params(&[("id", "1")])));
        assert_eq!(pattern.matches("/café/1"), Some(params(&[("id", "1")])));

        let root = RoutePattern::parse("/a%20b").unwrap();
        assert_eq!(root.render(&RouteParams::new()).unwrap(), "/a%20b");
        assert_eq!(root.matches("/a%20b"), Some(RouteParams::new()));
    }

    #[test]
    fn test_param_names() {
        let pattern = RoutePattern::parse("/u/:id/posts/:post/*rest").unwrap();
        assert_eq!(
            pattern.param_names().collect::<Vec<_>>(),
            vec!["id", "post", "rest"]
        );
    }
}
