//! # Settings
//!
//! Transport settings loaded from an optional JSON file and overridden by command-line flags.
//!
//! ```json
//! {
//!   "authorization": "s3cr3t",
//!   "headers": { "x-client": "httprule" }
//! }
//! ```
use anyhow::Context;
use httprule_core::transport::{CallOptions, Credential, TransportConfig};
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub authorization: Option<Credential>,
    /// Headers attached to every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token {
            self.authorization = Some(Credential::from(token));
        }
        self
    }

    pub fn transport_config(&self, server: &str) -> TransportConfig {
        TransportConfig {
            server: server.trim_end_matches('/').to_string(),
            authorization: self.authorization.clone(),
        }
    }

    pub fn call_defaults(&self) -> CallOptions {
        CallOptions {
            metadata: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            json: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_flag_overrides_file() {
        let settings: Settings =
            serde_json::from_str(r#"{ "authorization": "from-file", "headers": { "x-a": "1" } }"#)
                .unwrap();

        let settings = settings.with_token(Some("from-flag".to_string()));
        let config = settings.transport_config("http://localhost:8080/");

        assert_eq!(config.server, "http://localhost:8080");
        assert_eq!(config.authorization.unwrap().token(), "from-flag");
        assert_eq!(
            settings.call_defaults().metadata,
            vec![("x-a".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Settings::load(Some(Path::new("/does/not/exist.json"))).unwrap_err();
        assert!(err.to_string().contains("/does/not/exist.json"));
    }

    #[test]
    fn test_no_file_means_defaults() {
        let settings = Settings::load(None).unwrap().with_token(None);
        assert!(settings.authorization.is_none());
        assert!(settings.headers.is_empty());
    }
}
