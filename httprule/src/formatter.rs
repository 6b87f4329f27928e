use colored::*;
use httprule_core::{
    client::RouteInfo,
    tonic::metadata::{KeyAndValueRef, MetadataMap},
    transport::ChannelError,
};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct RouteList(pub Vec<RouteInfo>);

pub struct Headers<'a>(pub &'a MetadataMap);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<ChannelError> for FormattedString {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Rpc { code, message, .. } => FormattedString(format!(
                "{} code={:?} message={:?}",
                "gRPC Failed:".red().bold(),
                code,
                message
            )),
            ChannelError::Transport(err) => FormattedString(format!(
                "{} code={:?}\n\n'{}'",
                "Transport Failed:".red().bold(),
                err.code(),
                err
            )),
        }
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        FormattedString(format!("{}\n\n'{:#}'", "Call Failed:".red().bold(), err))
    }
}

impl From<Headers<'_>> for FormattedString {
    fn from(Headers(headers): Headers<'_>) -> Self {
        let mut out = String::new();
        for entry in headers.iter() {
            let (key, value) = match entry {
                KeyAndValueRef::Ascii(key, value) => {
                    (key.as_str(), value.to_str().unwrap_or("<opaque>").to_string())
                }
                KeyAndValueRef::Binary(key, value) => {
                    (key.as_str(), format!("{:?}", value.as_encoded_bytes()))
                }
            };
            out.push_str(&format!("{}: {}\n", key.cyan(), value));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<RouteList> for FormattedString {
    fn from(RouteList(routes): RouteList) -> Self {
        if routes.is_empty() {
            return FormattedString("No methods found.".yellow().to_string());
        }

        let mut out = String::new();
        out.push_str("Routes:\n");
        for info in routes {
            match info.route {
                Ok(route) => out.push_str(&format!(
                    "  {} {}\n",
                    info.method.green(),
                    route.to_string().cyan()
                )),
                Err(err) => out.push_str(&format!(
                    "  {} {}\n",
                    info.method.green(),
                    format!("({err})").dimmed()
                )),
            }
        }
        FormattedString(out.trim_end().to_string())
    }
}
