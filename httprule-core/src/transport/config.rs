//! # Transport Configuration
//!
//! The configuration shared (read-only) by every call issued through a [`super::Transport`].
//!
//! It can be built in code or deserialized from JSON:
//!
//! ```rust
//! use httprule_core::transport::TransportConfig;
//!
//! let config: TransportConfig = serde_json::from_str(
//!     r#"{ "server": "https://api.example.com", "authorization": "s3cr3t" }"#,
//! ).unwrap();
//!
//! assert_eq!(config.server, "https://api.example.com");
//! assert_eq!(config.authorization.unwrap().token(), "s3cr3t");
//! ```
use serde::{Deserialize, Deserializer};
use std::fmt::{self, Debug};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Base address every request path is appended to (e.g. `https://api.example.com`).
    pub server: String,
    /// Sent as a bearer token in the `authorization` header when present.
    #[serde(default)]
    pub authorization: Option<Credential>,
}

impl TransportConfig {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            authorization: None,
        }
    }

    pub fn with_authorization(mut self, credential: impl Into<Credential>) -> Self {
        self.authorization = Some(credential.into());
        self
    }
}

/// An authorization token, either fixed or produced on every call.
#[derive(Clone)]
pub enum Credential {
    Static(String),
    Supplier(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Credential {
    pub fn supplier(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Credential::Supplier(Arc::new(f))
    }

    /// Returns the token, invoking the supplier if there is one.
    pub fn token(&self) -> String {
        match self {
            Credential::Static(token) => token.clone(),
            Credential::Supplier(supplier) => supplier(),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Static(_) => f.write_str("Credential::Static(<redacted>)"),
            Credential::Supplier(_) => f.write_str("Credential::Supplier(..)"),
        }
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Credential::Static(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Credential::Static(token.to_string())
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Credential::Static)
    }
}
