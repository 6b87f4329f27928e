//! # HttpRule Client
//!
//! A high-level client that resolves gRPC methods from a local `DescriptorPool` and calls
//! them over HTTP/JSON through a [`Transport`].
//!
//! Requests and responses are plain `serde_json::Value`s, validated against the method's
//! input and output schemas.
//!
//! ## Example
//!
//! ```rust,no_run
//! use httprule_core::client::{DynamicRequest, RuleClient};
//! use httprule_core::transport::TransportConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("descriptor.bin")?;
//! let config = TransportConfig::new("https://library.example.com").with_authorization("token");
//! let client = RuleClient::from_file_descriptor_set(&bytes, config)?;
//!
//! let response = client
//!     .dynamic(DynamicRequest {
//!         service: "library.Library".to_string(),
//!         method: "GetBook".to_string(),
//!         body: serde_json::json!({ "name": "shelves/1/books/2" }),
//!         headers: vec![],
//!     })
//!     .await?;
//!
//! println!("{:?}", response.result);
//! # Ok(())
//! # }
//! ```
use crate::{
    rule::{self, Route, RuleError},
    transport::{
        CallError, CallOptions, ChannelError, CodecError, HttpClient, JsonCodec, JsonOptions,
        Transport, TransportConfig,
    },
};
use prost_reflect::{DescriptorError, DescriptorPool, DynamicMessage, MethodDescriptor};
use tonic::metadata::MetadataMap;

/// Errors raised before a dynamic call reaches the network.
#[derive(Debug, thiserror::Error)]
pub enum DynamicCallError {
    #[error("Invalid input: '{0}'")]
    InvalidInput(String),
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),
    #[error("Method '{0}' not found")]
    MethodNotFound(String),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A request object encapsulating all necessary information to perform a dynamic call.
#[derive(Debug, Clone)]
pub struct DynamicRequest {
    /// The fully qualified name of the service (e.g., `my.package.Service`).
    pub service: String,
    /// The name of the method to call (e.g., `GetBook`).
    pub method: String,
    /// The JSON request message.
    pub body: serde_json::Value,
    /// Extra headers to attach to the HTTP request.
    pub headers: Vec<(String, String)>,
}

/// The result of a dynamic call.
#[derive(Debug, Clone)]
pub struct DynamicResponse {
    /// Response headers. Empty when the exchange failed before any response arrived.
    pub headers: MetadataMap,
    pub result: Result<serde_json::Value, ChannelError>,
}

/// The HTTP binding of a single method.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    /// Fully qualified method name.
    pub method: String,
    pub route: Result<Route, RuleError>,
}

#[derive(Debug, Clone)]
pub struct RuleClient<C = reqwest::Client> {
    pool: DescriptorPool,
    transport: Transport<C>,
}

impl RuleClient<reqwest::Client> {
    /// Builds a client from an encoded `FileDescriptorSet`.
    pub fn from_file_descriptor_set(
        file_descriptor_set: &[u8],
        config: TransportConfig,
    ) -> Result<Self, DescriptorError> {
        let pool = DescriptorPool::decode(file_descriptor_set)?;
        Ok(Self::new(pool, Transport::new(config)))
    }
}

impl<C: HttpClient> RuleClient<C> {
    pub fn new(pool: DescriptorPool, transport: Transport<C>) -> Self {
        Self { pool, transport }
    }

    pub fn descriptor_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Lists every method in the pool along with its HTTP binding.
    pub fn list_routes(&self) -> Vec<RouteInfo> {
        self.pool
            .services()
            .flat_map(|service| service.methods().collect::<Vec<_>>())
            .map(|method| RouteInfo {
                method: method.full_name().to_string(),
                route: rule::route_for(&method),
            })
            .collect()
    }

    pub fn method(&self, service: &str, method: &str) -> Result<MethodDescriptor, DynamicCallError> {
        self.pool
            .get_service_by_name(service)
            .ok_or_else(|| DynamicCallError::ServiceNotFound(service.to_string()))?
            .methods()
            .find(|m| m.name() == method)
            .ok_or_else(|| DynamicCallError::MethodNotFound(method.to_string()))
    }

    /// Executes a unary call and waits for its outcome.
    pub async fn dynamic(
        &self,
        request: DynamicRequest,
    ) -> Result<DynamicResponse, DynamicCallError> {
        let method = self.method(&request.service, &request.method)?;

        let options = CallOptions {
            metadata: request.headers,
            json: None,
        };
        // `unary` applies the transport defaults itself, only the JSON options are needed here.
        let json = self
            .transport
            .merge_options(options.clone())
            .json
            .unwrap_or_default();

        let input = DynamicMessage::deserialize_with_options(
            method.input(),
            request.body,
            &json.deserialize,
        )
        .map_err(|e| DynamicCallError::InvalidInput(e.to_string()))?;

        let call = self.transport.unary(&method, &input, options)?;

        let headers = call.headers().await.unwrap_or_default();
        let result = match call.message().await {
            Ok(message) => Ok(encode(&json, &message)?),
            Err(err) => Err(err),
        };

        Ok(DynamicResponse { headers, result })
    }
}

fn encode(json: &JsonOptions, message: &DynamicMessage) -> Result<serde_json::Value, CodecError> {
    JsonCodec::new(json).encode(message)
}
