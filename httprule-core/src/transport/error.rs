use super::codec::CodecError;
use crate::binding::BindingError;
use std::fmt::{self, Display};
use std::sync::Arc;
use tonic::{Code, metadata::MetadataMap};

/// The call modes a transport can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingMode {
    ServerStreaming,
    ClientStreaming,
    Duplex,
}

impl Display for StreamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamingMode::ServerStreaming => "server streaming",
            StreamingMode::ClientStreaming => "client streaming",
            StreamingMode::Duplex => "duplex streaming",
        })
    }
}

/// Errors raised while preparing a call, before any request leaves the process.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Method is not binding to HTTP requests: {0}")]
    NotHttpBound(String),
    #[error("Unsupported method binding '{verb}' on {method}")]
    UnsupportedVerb { method: String, verb: String },
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("Unimplemented {0}")]
    Unimplemented(StreamingMode),
    #[error("Invalid endpoint URL '{url}': '{source}'")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Invalid request: '{0}'")]
    InvalidRequest(#[source] http::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Unary calls must be started from within a Tokio runtime: '{0}'")]
    NoRuntime(#[source] tokio::runtime::TryCurrentError),
}

/// Errors delivered through the result channels of an in-flight call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    /// The server answered with a `grpc-status` side channel.
    #[error("gRPC call failed with code {code:?}: '{message}'")]
    Rpc {
        code: Code,
        message: String,
        metadata: MetadataMap,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    HttpStatus(http::StatusCode),
    #[error("Network failure: '{0}'")]
    Network(#[source] Arc<dyn std::error::Error + Send + Sync>),
    #[error("Invalid JSON response body: '{0}'")]
    InvalidJson(#[source] Arc<serde_json::Error>),
    #[error("Response does not match the output message: '{0}'")]
    Decode(String),
    #[error("The call ended without producing a result")]
    Abandoned,
}

impl ChannelError {
    /// The gRPC code this error stands for.
    pub fn code(&self) -> Code {
        match self {
            ChannelError::Rpc { code, .. } => *code,
            ChannelError::Transport(err) => err.code(),
        }
    }
}

impl TransportError {
    /// Maps the failure onto a gRPC code, following the HTTP to gRPC status mapping used
    /// by gRPC clients that receive a non-gRPC response.
    pub fn code(&self) -> Code {
        match self {
            TransportError::HttpStatus(status) => match status.as_u16() {
                400 => Code::Internal,
                401 => Code::Unauthenticated,
                403 => Code::PermissionDenied,
                404 => Code::Unimplemented,
                429 | 502 | 503 | 504 => Code::Unavailable,
                _ => Code::Unknown,
            },
            TransportError::Network(_) => Code::Unavailable,
            TransportError::InvalidJson(_) | TransportError::Decode(_) => Code::Internal,
            TransportError::Abandoned => Code::Cancelled,
        }
    }
}
