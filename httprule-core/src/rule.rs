//! # HTTP Rules
//!
//! Support for the `google.api.http` method option, which binds a gRPC method to an HTTP
//! verb and a path template:
//!
//! ```proto
//! rpc GetBook(GetBookRequest) returns (Book) {
//!   option (google.api.http) = { get: "/v1/{name=shelves/*/books/*}" };
//! }
//! ```
//!
//! The rule is read straight from the encoded method options, so it is found whether or not
//! the descriptor pool carries the `google/api/annotations.proto` extension definition.
use prost::Message;
use prost_reflect::MethodDescriptor;
use std::fmt::{self, Display};

/// Field number of the `google.api.http` extension on `google.protobuf.MethodOptions`.
pub const HTTP_RULE_EXTENSION: u32 = 72295728;

/// `google.api.HttpRule`: maps a gRPC method to an HTTP REST endpoint.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HttpRule {
    /// Selects a method to which this rule applies.
    #[prost(string, tag = "1")]
    pub selector: ::prost::alloc::string::String,
    /// The name of the request field whose value is mapped to the HTTP request
    /// body, or `*` for mapping all request fields, or omitted for not having any
    /// HTTP request body.
    #[prost(string, tag = "7")]
    pub body: ::prost::alloc::string::String,
    /// The name of the response field whose value is mapped to the HTTP response body.
    #[prost(string, tag = "12")]
    pub response_body: ::prost::alloc::string::String,
    /// Additional HTTP bindings for the selector.
    #[prost(message, repeated, tag = "11")]
    pub additional_bindings: ::prost::alloc::vec::Vec<HttpRule>,
    /// Determines the URL pattern is matched by this rule.
    #[prost(oneof = "http_rule::Pattern", tags = "2, 3, 4, 5, 6, 8")]
    pub pattern: ::core::option::Option<http_rule::Pattern>,
}

/// Nested message and enum types in `HttpRule`.
pub mod http_rule {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Pattern {
        #[prost(string, tag = "2")]
        Get(::prost::alloc::string::String),
        #[prost(string, tag = "3")]
        Put(::prost::alloc::string::String),
        #[prost(string, tag = "4")]
        Post(::prost::alloc::string::String),
        #[prost(string, tag = "5")]
        Delete(::prost::alloc::string::String),
        #[prost(string, tag = "6")]
        Patch(::prost::alloc::string::String),
        #[prost(message, tag = "8")]
        Custom(super::CustomHttpPattern),
    }
}

/// A custom pattern is used for defining custom HTTP verb.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CustomHttpPattern {
    /// The name of this custom HTTP verb.
    #[prost(string, tag = "1")]
    pub kind: ::prost::alloc::string::String,
    /// The path matched by this custom verb.
    #[prost(string, tag = "2")]
    pub path: ::prost::alloc::string::String,
}

/// The slice of `google.protobuf.MethodOptions` we care about. Every other option is skipped
/// by the decoder.
#[derive(Clone, PartialEq, ::prost::Message)]
struct HttpMethodOptions {
    #[prost(message, optional, tag = "72295728")]
    http: ::core::option::Option<HttpRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Method has no google.api.http option")]
    Missing,
    #[error("HTTP rule does not define a pattern")]
    NoPattern,
    #[error("Unsupported method binding: '{0}'")]
    UnsupportedVerb(String),
}

/// The HTTP verbs a rule may bind a method to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn method(self) -> http::Method {
        match self {
            HttpVerb::Get => http::Method::GET,
            HttpVerb::Post => http::Method::POST,
            HttpVerb::Put => http::Method::PUT,
            HttpVerb::Delete => http::Method::DELETE,
        }
    }
}

impl Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method().as_str())
    }
}

/// Where the request message travels besides the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// The whole message is sent as the JSON request body.
    Body,
    /// The message is flattened into query string parameters.
    Query,
}

/// A resolved HTTP binding: verb, raw path template and body mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub verb: HttpVerb,
    pub template: String,
    pub body: BodyMode,
}

impl Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.template)?;
        if self.body == BodyMode::Body {
            f.write_str(" (body)")?;
        }
        Ok(())
    }
}

impl HttpRule {
    /// Reads the `google.api.http` option of `method`, if any.
    pub fn for_method(method: &MethodDescriptor) -> Option<HttpRule> {
        let options = method.options().encode_to_vec();

        HttpMethodOptions::decode(options.as_slice())
            .ok()
            .and_then(|options| options.http)
    }

    /// Resolves the verb and path template of this rule.
    ///
    /// Only `get`, `post`, `put` and `delete` bindings are supported.
    pub fn route(&self) -> Result<Route, RuleError> {
        use http_rule::Pattern;

        let (verb, template) = match self.pattern.as_ref().ok_or(RuleError::NoPattern)? {
            Pattern::Get(path) => (HttpVerb::Get, path),
            Pattern::Post(path) => (HttpVerb::Post, path),
            Pattern::Put(path) => (HttpVerb::Put, path),
            Pattern::Delete(path) => (HttpVerb::Delete, path),
            Pattern::Patch(_) => return Err(RuleError::UnsupportedVerb("patch".to_string())),
            Pattern::Custom(custom) => return Err(RuleError::UnsupportedVerb(custom.kind.clone())),
        };

        let body = if self.body.is_empty() {
            BodyMode::Query
        } else {
            BodyMode::Body
        };

        Ok(Route {
            verb,
            template: template.clone(),
            body,
        })
    }
}

/// Reads and resolves the HTTP binding of `method`.
pub fn route_for(method: &MethodDescriptor) -> Result<Route, RuleError> {
    HttpRule::for_method(method)
        .ok_or(RuleError::Missing)?
        .route()
}
