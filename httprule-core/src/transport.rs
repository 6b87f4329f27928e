//! # Transcoding Transport
//!
//! Executes unary gRPC calls as HTTP/JSON exchanges, following the `google.api.http`
//! rule attached to each method.
//!
//! ## How it works
//!
//! 1. The method's [`HttpRule`] picks the HTTP verb and the path template.
//! 2. The request message is bound against the template ([`crate::binding`]) to get the
//!    concrete path, which is appended to the configured server address.
//! 3. The message is serialized to JSON and sent either as the request body or, for rules
//!    without a `body`, flattened into the query string.
//! 4. The response is mapped back into the four result channels of a [`UnaryCall`]:
//!    headers, message, status and trailers.
//!
//! Path-bound fields are also sent in the body or query string.
//!
//! Streaming calls are not supported and fail right away with [`CallError::Unimplemented`].
pub mod call;
pub mod codec;
pub mod config;
pub mod error;
pub mod http_client;
pub mod metadata;

pub use call::{Pending, RpcStatus, UnaryCall, UnaryResponse};
pub use codec::{CodecError, JsonCodec, JsonOptions};
pub use config::{Credential, TransportConfig};
pub use error::{CallError, ChannelError, StreamingMode, TransportError};
pub use http_client::HttpClient;

use crate::{
    binding::{self, BindingInput},
    rule::{BodyMode, HttpRule, Route, RuleError},
};
use bytes::Bytes;
use call::CallSlots;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use prost_reflect::{DynamicMessage, MessageDescriptor, MethodDescriptor};
use std::{convert::Infallible, sync::Arc};
use tonic::metadata::MetadataMap;
use tracing::{debug, warn};
use url::Url;

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Extra request headers.
    pub metadata: Vec<(String, String)>,
    /// JSON mapping options. Falls back to the transport defaults when `None`.
    pub json: Option<JsonOptions>,
}

/// A transport that speaks HTTP/JSON to a server exposing `google.api.http` bindings.
#[derive(Debug, Clone)]
pub struct Transport<C = reqwest::Client> {
    config: Arc<TransportConfig>,
    client: C,
    defaults: CallOptions,
}

impl Transport<reqwest::Client> {
    pub fn new(config: TransportConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }
}

impl<C: HttpClient> Transport<C> {
    pub fn with_client(config: TransportConfig, client: C) -> Self {
        Self {
            config: Arc::new(config),
            client,
            defaults: CallOptions::default(),
        }
    }

    /// Options every call starts from.
    pub fn with_defaults(mut self, defaults: CallOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Merges `options` over the transport defaults.
    ///
    /// Metadata is concatenated (defaults first), JSON options given by the caller win.
    pub fn merge_options(&self, options: CallOptions) -> CallOptions {
        let mut metadata = self.defaults.metadata.clone();
        metadata.extend(options.metadata);

        CallOptions {
            metadata,
            json: options.json.or_else(|| self.defaults.json.clone()),
        }
    }

    /// Starts a unary call.
    ///
    /// Every error returned here is raised before any request is sent. Failures of the HTTP
    /// exchange itself are delivered through the channels of the returned [`UnaryCall`].
    ///
    /// The exchange runs on a task spawned onto the current Tokio runtime. Without one the
    /// call fails with [`CallError::NoRuntime`].
    pub fn unary(
        &self,
        method: &MethodDescriptor,
        input: &DynamicMessage,
        options: CallOptions,
    ) -> Result<UnaryCall, CallError> {
        match (method.is_client_streaming(), method.is_server_streaming()) {
            (false, false) => {}
            (false, true) => return Err(CallError::Unimplemented(StreamingMode::ServerStreaming)),
            (true, false) => return Err(CallError::Unimplemented(StreamingMode::ClientStreaming)),
            (true, true) => return Err(CallError::Unimplemented(StreamingMode::Duplex)),
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(CallError::NoRuntime)?;
        let route = resolve_route(method)?;
        let options = self.merge_options(options);
        let request = self.build_request(&route, input, &options)?;

        debug!(
            method = method.full_name(),
            verb = %route.verb,
            uri = %request.uri(),
            "dispatching transcoded call"
        );

        let (call, slots) = UnaryCall::new(method.clone(), options.metadata.clone(), input.clone());

        runtime.spawn(exchange(
            self.client.clone(),
            request,
            method.output(),
            options.json.unwrap_or_default(),
            slots,
        ));

        Ok(call)
    }

    pub fn server_streaming(
        &self,
        _method: &MethodDescriptor,
        _input: &DynamicMessage,
        _options: CallOptions,
    ) -> Result<Infallible, CallError> {
        Err(CallError::Unimplemented(StreamingMode::ServerStreaming))
    }

    pub fn client_streaming(
        &self,
        _method: &MethodDescriptor,
        _options: CallOptions,
    ) -> Result<Infallible, CallError> {
        Err(CallError::Unimplemented(StreamingMode::ClientStreaming))
    }

    pub fn duplex(
        &self,
        _method: &MethodDescriptor,
        _options: CallOptions,
    ) -> Result<Infallible, CallError> {
        Err(CallError::Unimplemented(StreamingMode::Duplex))
    }

    fn build_request(
        &self,
        route: &Route,
        input: &DynamicMessage,
        options: &CallOptions,
    ) -> Result<http::Request<Bytes>, CallError> {
        let json = options.json.clone().unwrap_or_default();
        let codec = JsonCodec::new(&json);

        let mut params: BindingInput = binding::flatten(&codec.encode_fields(input)?)
            .into_iter()
            .collect();
        let path = binding::build_url(&route.template, &mut params)?;

        let endpoint = format!("{}{}", self.config.server, path);
        let mut url = Url::parse(&endpoint).map_err(|source| CallError::InvalidUrl {
            url: endpoint.clone(),
            source,
        })?;

        let payload = codec.encode(input)?;

        let body = match route.body {
            BodyMode::Body => Bytes::from(payload.to_string()),
            BodyMode::Query => {
                let pairs = binding::flatten(&payload);
                if !pairs.is_empty() {
                    url.query_pairs_mut().extend_pairs(pairs);
                }
                Bytes::new()
            }
        };

        let mut builder = http::Request::builder()
            .method(route.verb.method())
            .uri(url.as_str())
            .header(CONTENT_TYPE, "application/json");

        if let Some(credential) = &self.config.authorization {
            let token = credential.token();
            if !token.is_empty() {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        for (key, value) in &options.metadata {
            builder = builder.header(key.as_str(), value.as_str());
        }

        builder.body(body).map_err(CallError::InvalidRequest)
    }
}

fn resolve_route(method: &MethodDescriptor) -> Result<Route, CallError> {
    let not_bound = || CallError::NotHttpBound(method.full_name().to_string());

    HttpRule::for_method(method)
        .ok_or_else(not_bound)?
        .route()
        .map_err(|err| match err {
            RuleError::UnsupportedVerb(verb) => CallError::UnsupportedVerb {
                method: method.full_name().to_string(),
                verb,
            },
            RuleError::Missing | RuleError::NoPattern => not_bound(),
        })
}

/// Drives the HTTP exchange of a call and settles its channels.
async fn exchange<C: HttpClient>(
    client: C,
    request: http::Request<Bytes>,
    output: MessageDescriptor,
    json: JsonOptions,
    slots: CallSlots,
) {
    if let Err(err) = settle(client, request, output, &json, &slots).await {
        warn!(error = %err, "transcoded call failed");
        slots.reject_pending(err);
    }
}

/// Sends the request and resolves the channels that succeeded. The returned error rejects
/// the rest.
///
/// A `grpc-status` failure rejects the status channel together with message and trailers,
/// so every observer sees the RPC error. Headers have resolved by then.
async fn settle<C: HttpClient>(
    client: C,
    request: http::Request<Bytes>,
    output: MessageDescriptor,
    json: &JsonOptions,
    slots: &CallSlots,
) -> Result<(), ChannelError> {
    let response = client
        .send(request)
        .await
        .map_err(|err| TransportError::Network(Arc::from(err)))?;

    let (parts, body) = response.into_parts();
    debug!(status = %parts.status, "received transcoded response");

    let headers = metadata::response_metadata(&parts.headers);
    slots.headers.resolve(headers.clone());

    if parts.status != http::StatusCode::OK {
        return Err(metadata::status_from_headers(&parts.headers, headers)
            .unwrap_or(ChannelError::Transport(TransportError::HttpStatus(parts.status))));
    }

    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|err| TransportError::InvalidJson(Arc::new(err)))?;

    let message = JsonCodec::new(json)
        .decode(output, value)
        .map_err(|err| TransportError::Decode(err.to_string()))?;

    slots.message.resolve(message);
    slots.status.resolve(RpcStatus::ok());
    slots.trailers.resolve(MetadataMap::new());

    Ok(())
}
