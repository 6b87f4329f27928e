//! # Path Template Binding
//!
//! This module compiles `google.api.http` path templates and binds them against the
//! fields of a request message.
//!
//! ## Template grammar
//!
//! ```text
//! Template = Segment { "/" Segment } [ ":" Verb ]
//! Segment  = LITERAL | Variable
//! Variable = "{" FieldPath [ "=" Pattern ] "}"
//! Pattern  = ( LITERAL | "*" | "**" ) { "/" ( LITERAL | "*" | "**" ) }
//! ```
//!
//! A bare `{name}` behaves like `{name=*}`. Values are inserted as they are, without any
//! percent-encoding, so a value holding `/` characters spans several path segments.
//!
//! ## Example
//!
//! ```rust
//! use httprule_core::binding::{BindingInput, build_url};
//!
//! let mut params = BindingInput::from([
//!     ("name".to_string(), "projects/p1/events/e1".to_string()),
//!     ("force".to_string(), "true".to_string()),
//! ]);
//!
//! let path = build_url("/v1/{name=projects/*/events/*}:cancel", &mut params).unwrap();
//!
//! assert_eq!(path, "/v1/projects/p1/events/e1:cancel");
//! // Bound fields are consumed, the rest stays available for the body or query string.
//! assert_eq!(params.len(), 1);
//! assert!(params.contains_key("force"));
//! ```
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Field name (dotted for nested fields) to string value.
pub type BindingInput = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unclosed variable in path template '{0}'")]
    UnclosedVariable(String),
    #[error("Unexpected '}}' in path template '{0}'")]
    UnexpectedClosingBrace(String),
    #[error("Nested variables are not allowed in path template '{0}'")]
    NestedVariable(String),
    #[error("Variable segment '{segment}' must span the whole path segment in '{template}'")]
    PartialSegmentVariable { template: String, segment: String },
    #[error("Variable with an empty field name in path template '{0}'")]
    EmptyFieldName(String),
    #[error("Variable '{field}' has an empty pattern in path template '{template}'")]
    EmptyPattern { template: String, field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("input parameter {0} is required")]
    MissingParameter(String),
}

/// A piece of a variable's match pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    Literal(String),
    /// `*`, one path segment.
    Wildcard,
    /// `**`, any number of trailing path segments.
    DoubleWildcard,
}

/// A `{field=pattern}` path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub field: String,
    /// Empty for a bare `{field}`.
    pub pattern: Vec<PatternSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(Variable),
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
    verb: Option<String>,
}

/// The outcome of binding a template: the concrete path and the fields it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub path: String,
    /// Field names in the order they were bound.
    pub consumed: Vec<String>,
}

/// Compiles `template` and binds it against `params`, removing every bound field from `params`.
///
/// Fails with [`BindingError::MissingParameter`] as soon as a variable references a field
/// that is not present.
pub fn build_url(template: &str, params: &mut BindingInput) -> Result<String, BindingError> {
    let template = PathTemplate::parse(template)?;
    let expansion = template.expand(params)?;

    for field in &expansion.consumed {
        params.remove(field);
    }

    Ok(expansion.path)
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let (path, verb) = split_verb(template)?;

        let segments = split_top_level(path, '/')
            .into_iter()
            .map(|segment| parse_segment(template, segment))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            segments,
            verb: verb.map(str::to_string),
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    /// Names of the fields bound by this template, left to right.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable(variable) => Some(variable.field.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Binds the template against `params` without modifying them.
    pub fn expand(&self, params: &BindingInput) -> Result<Expansion, BindingError> {
        let mut parts = Vec::with_capacity(self.segments.len());
        let mut consumed = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => parts.push(text.clone()),
                Segment::Variable(variable) => {
                    let value = params
                        .get(&variable.field)
                        .ok_or_else(|| BindingError::MissingParameter(variable.field.clone()))?;

                    parts.push(render(&variable.pattern, value));
                    consumed.push(variable.field.clone());
                }
            }
        }

        let mut path = parts.join("/");

        if let Some(verb) = &self.verb {
            path.push(':');
            path.push_str(verb);
        }

        Ok(Expansion { path, consumed })
    }
}

impl Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Variable(variable) => write!(f, "{variable}")?,
            }
        }

        if let Some(verb) = &self.verb {
            write!(f, ":{verb}")?;
        }

        Ok(())
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pattern.is_empty() {
            return write!(f, "{{{}}}", self.field);
        }

        let pattern = self
            .pattern
            .iter()
            .map(|segment| match segment {
                PatternSegment::Literal(text) => text.as_str(),
                PatternSegment::Wildcard => "*",
                PatternSegment::DoubleWildcard => "**",
            })
            .collect::<Vec<_>>()
            .join("/");

        write!(f, "{{{}={}}}", self.field, pattern)
    }
}

/// Flattens a JSON object into dotted `key`/`value` pairs.
///
/// Nested objects produce `parent.child` keys, array elements are keyed by their index
/// (`tags.0`, `tags.1`) and `null` values are dropped. Strings are emitted raw, other scalars as their JSON text.
pub fn flatten(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Value::Object(map) = value {
        for (key, value) in map {
            flatten_into(&mut out, key, value);
        }
    }
    out
}

fn flatten_into(out: &mut Vec<(String, String)>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push((key.to_string(), s.clone())),
        Value::Object(map) => {
            for (child, value) in map {
                flatten_into(out, &format!("{key}.{child}"), value);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(out, &format!("{key}.{index}"), item);
            }
        }
        scalar => out.push((key.to_string(), scalar.to_string())),
    }
}

fn render(pattern: &[PatternSegment], value: &str) -> String {
    if pattern.is_empty() || matches_pattern(pattern, value) {
        return value.to_string();
    }

    let wildcards = pattern
        .iter()
        .filter(|s| !matches!(s, PatternSegment::Literal(_)))
        .count();

    if wildcards != 1 {
        return value.to_string();
    }

    pattern
        .iter()
        .map(|segment| match segment {
            PatternSegment::Literal(text) => text.as_str(),
            PatternSegment::Wildcard | PatternSegment::DoubleWildcard => value,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn matches_pattern(pattern: &[PatternSegment], value: &str) -> bool {
    let parts: Vec<&str> = value.split('/').collect();

    match pattern
        .iter()
        .position(|s| *s == PatternSegment::DoubleWildcard)
    {
        None => parts.len() == pattern.len() && segments_match(pattern, &parts),
        Some(at) => {
            let (head, tail) = (&pattern[..at], &pattern[at + 1..]);
            parts.len() > head.len() + tail.len()
                && segments_match(head, &parts[..head.len()])
                && segments_match(tail, &parts[parts.len() - tail.len()..])
        }
    }
}

fn segments_match(pattern: &[PatternSegment], parts: &[&str]) -> bool {
    pattern.iter().zip(parts).all(|(segment, part)| match segment {
        PatternSegment::Literal(text) => text == part,
        _ => !part.is_empty(),
    })
}

/// Splits off a trailing `:verb` that sits outside any variable and after the last `/`.
fn split_verb(template: &str) -> Result<(&str, Option<&str>), TemplateError> {
    let mut depth = 0usize;
    let mut verb_at = None;

    for (i, c) in template.char_indices() {
        match c {
            '{' if depth > 0 => return Err(TemplateError::NestedVariable(template.to_string())),
            '{' => depth += 1,
            '}' if depth == 0 => {
                return Err(TemplateError::UnexpectedClosingBrace(template.to_string()));
            }
            '}' => depth -= 1,
            '/' if depth == 0 => verb_at = None,
            ':' if depth == 0 && verb_at.is_none() => verb_at = Some(i),
            _ => {}
        }
    }

    if depth > 0 {
        return Err(TemplateError::UnclosedVariable(template.to_string()));
    }

    Ok(match verb_at {
        Some(i) => (&template[..i], Some(&template[i + 1..])),
        None => (template, None),
    })
}

/// Splits on `sep` outside of `{...}`. Braces have already been validated.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    parts.push(&text[start..]);
    parts
}

fn parse_segment(template: &str, segment: &str) -> Result<Segment, TemplateError> {
    let Some(body) = segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        if segment.contains(['{', '}']) {
            return Err(TemplateError::PartialSegmentVariable {
                template: template.to_string(),
                segment: segment.to_string(),
            });
        }
        return Ok(Segment::Literal(segment.to_string()));
    };

    let (field, pattern) = match body.split_once('=') {
        Some((field, pattern)) => (field.trim(), Some(pattern.trim())),
        None => (body.trim(), None),
    };

    if field.is_empty() {
        return Err(TemplateError::EmptyFieldName(template.to_string()));
    }

    let pattern = match pattern {
        None => Vec::new(),
        Some("") => {
            return Err(TemplateError::EmptyPattern {
                template: template.to_string(),
                field: field.to_string(),
            });
        }
        Some(pattern) => pattern
            .split('/')
            .map(|part| match part {
                "*" => PatternSegment::Wildcard,
                "**" => PatternSegment::DoubleWildcard,
                literal => PatternSegment::Literal(literal.to_string()),
            })
            .collect(),
    };

    Ok(Segment::Variable(Variable {
        field: field.to_string(),
        pattern,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> BindingInput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_url_without_parameters() {
        assert_eq!(build_url("/foo/bar", &mut params(&[])).unwrap(), "/foo/bar");
    }

    #[test]
    fn test_literal_template_ignores_unrelated_parameters() {
        let mut input = params(&[("a", "1"), ("b.c", "2")]);

        assert_eq!(build_url("/foo/bar/", &mut input).unwrap(), "/foo/bar/");
        assert_eq!(input.len(), 2);
    }

    #[test]
    fn test_build_url_with_simple_parameters() {
        let mut input = params(&[("bar", "testing")]);

        assert_eq!(
            build_url("/foo/{bar}/baz", &mut input).unwrap(),
            "/foo/testing/baz"
        );
        assert!(input.is_empty());
    }

    #[test]
    fn test_build_url_with_verb() {
        assert_eq!(
            build_url("/foo/bar:baz", &mut params(&[])).unwrap(),
            "/foo/bar:baz"
        );
    }

    #[test]
    fn test_build_url_with_variable_near_verb() {
        assert_eq!(
            build_url("/foo/{bar}:baz", &mut params(&[("bar", "qux")])).unwrap(),
            "/foo/qux:baz"
        );
    }

    #[test]
    fn test_build_url_with_complex_parameters() {
        let mut input = params(&[("bar", "projects/foo/events/bar")]);

        assert_eq!(
            build_url("/foo/{bar=projects/*/events/*}/baz", &mut input).unwrap(),
            "/foo/projects/foo/events/bar/baz"
        );
    }

    #[test]
    fn test_build_url_with_missing_parameters() {
        let err = build_url("/foo/{bar=projects/*}/baz", &mut params(&[("other", "foo")]))
            .unwrap_err();

        assert_eq!(err, BindingError::MissingParameter("bar".to_string()));
        assert_eq!(err.to_string(), "input parameter bar is required");
    }

    #[test]
    fn test_single_wildcard_wraps_bare_value() {
        assert_eq!(
            build_url("/v1/{name=projects/*}", &mut params(&[("name", "p1")])).unwrap(),
            "/v1/projects/p1"
        );
        assert_eq!(
            build_url("/v1/{name=projects/*}", &mut params(&[("name", "projects/p1")]))
                .unwrap(),
            "/v1/projects/p1"
        );
    }

    #[test]
    fn test_double_wildcard_matches_trailing_segments() {
        assert_eq!(
            build_url("/v1/{path=files/**}", &mut params(&[("path", "files/a/b/c")])).unwrap(),
            "/v1/files/a/b/c"
        );
    }

    #[test]
    fn test_value_with_slashes_is_inserted_unescaped() {
        assert_eq!(
            build_url("/v1/{name}", &mut params(&[("name", "a/b c")])).unwrap(),
            "/v1/a/b c"
        );
    }

    #[test]
    fn test_nested_field_path() {
        let mut input = params(&[("book.name", "shelves/1/books/2"), ("book.title", "x")]);

        assert_eq!(
            build_url("/v1/{book.name=shelves/*/books/*}", &mut input).unwrap(),
            "/v1/shelves/1/books/2"
        );
        assert_eq!(input, params(&[("book.title", "x")]));
    }

    #[test]
    fn test_expand_is_idempotent() {
        let template = PathTemplate::parse("/v1/{parent=shelves/*}/books/{id}:publish").unwrap();
        let input = params(&[("parent", "shelves/3"), ("id", "9")]);

        let first = template.expand(&input).unwrap();
        let second = template.expand(&input).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.path, "/v1/shelves/3/books/9:publish");
        assert_eq!(first.consumed, vec!["parent", "id"]);
    }

    #[test]
    fn test_parse_is_deterministic_and_displays_back() {
        let text = "/v1/{name=projects/*/events/**}/items/{id}:cancel";
        let template = PathTemplate::parse(text).unwrap();

        assert_eq!(template, PathTemplate::parse(text).unwrap());
        assert_eq!(template.to_string(), text);
        assert_eq!(template.verb(), Some("cancel"));
        assert_eq!(template.fields().collect::<Vec<_>>(), vec!["name", "id"]);
    }

    #[test]
    fn test_colon_before_a_slash_is_literal() {
        let template = PathTemplate::parse("/v1/a:b/c").unwrap();

        assert_eq!(template.verb(), None);
        assert_eq!(template.expand(&params(&[])).unwrap().path, "/v1/a:b/c");
    }

    #[test]
    fn test_malformed_templates() {
        assert!(matches!(
            PathTemplate::parse("/v1/{name"),
            Err(TemplateError::UnclosedVariable(_))
        ));
        assert!(matches!(
            PathTemplate::parse("/v1/name}"),
            Err(TemplateError::UnexpectedClosingBrace(_))
        ));
        assert!(matches!(
            PathTemplate::parse("/v1/{a={b}}"),
            Err(TemplateError::NestedVariable(_))
        ));
        assert!(matches!(
            PathTemplate::parse("/v1/x{name}"),
            Err(TemplateError::PartialSegmentVariable { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/v1/{}"),
            Err(TemplateError::EmptyFieldName(_))
        ));
        assert!(matches!(
            PathTemplate::parse("/v1/{name=}"),
            Err(TemplateError::EmptyPattern { .. })
        ));
    }

    #[test]
    fn test_flatten_nested_objects() {
        let value = json!({
            "name": "shelves/1",
            "page": { "size": 10, "token": "abc", "filter": { "deleted": false } },
            "tags": ["a", "b"],
            "missing": null
        });

        let mut flat = flatten(&value);
        flat.sort();

        assert_eq!(
            flat,
            vec![
                ("name".to_string(), "shelves/1".to_string()),
                ("page.filter.deleted".to_string(), "false".to_string()),
                ("page.size".to_string(), "10".to_string()),
                ("page.token".to_string(), "abc".to_string()),
                ("tags.0".to_string(), "a".to_string()),
                ("tags.1".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_flatten_arrays_of_messages() {
        let value = json!({ "books": [{ "title": "Dune" }, { "title": "Emma", "tags": [] }] });

        assert_eq!(
            flatten(&value),
            vec![
                ("books.0.title".to_string(), "Dune".to_string()),
                ("books.1.title".to_string(), "Emma".to_string()),
            ]
        );
    }
}
