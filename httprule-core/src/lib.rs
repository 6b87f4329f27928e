//! # HttpRule Core
//!
//! `httprule-core` lets a unary gRPC method be called as a plain HTTP/JSON request,
//! following the `google.api.http` annotation convention: path templates with embedded
//! field bindings, alternate HTTP verbs, and body or query string field distribution.
//!
//! ## Key Components
//!
//! * **[`binding`]:** Compiles path templates such as `/v1/{name=projects/*}:cancel` and binds
//!   them against the fields of a request message.
//! * **[`rule`]:** Reads the `google.api.http` rule attached to a method descriptor.
//! * **[`Transport`]:** Builds the HTTP request for a unary call, dispatches it and maps the
//!   HTTP response back into gRPC semantics (metadata, message, status, trailers).
//! * **[`RuleClient`]:** A high-level client that resolves methods from a descriptor pool
//!   and works with `serde_json::Value` payloads.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod binding;
pub mod client;
pub mod rule;
pub mod transport;

pub use client::RuleClient;
pub use transport::Transport;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
