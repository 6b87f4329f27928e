//! Conversions between HTTP headers and gRPC metadata.
use super::error::ChannelError;
use http::{
    HeaderMap,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};
use tonic::{Code, metadata::MetadataMap};

pub const GRPC_STATUS: &str = "grpc-status";
pub const GRPC_MESSAGE: &str = "grpc-message";

/// Builds response metadata out of the HTTP headers.
///
/// `content-type` and `content-length` describe the HTTP body rather than the call, so they are
/// left out. A header sent several times keeps all of its values, in order.
pub fn response_metadata(headers: &HeaderMap) -> MetadataMap {
    let mut headers = headers.clone();
    headers.remove(CONTENT_TYPE);
    headers.remove(CONTENT_LENGTH);
    MetadataMap::from_headers(headers)
}

/// Reads the `grpc-status` / `grpc-message` side channel of a failed response.
///
/// Returns `None` when the server did not send a `grpc-status` header.
pub fn status_from_headers(headers: &HeaderMap, metadata: MetadataMap) -> Option<ChannelError> {
    let code = headers.get(GRPC_STATUS)?;

    let code = code
        .to_str()
        .ok()
        .and_then(|code| code.trim().parse::<i32>().ok())
        .map(Code::from_i32)
        .unwrap_or(Code::Unknown);

    let message = headers
        .get(GRPC_MESSAGE)
        .map(|message| String::from_utf8_lossy(message.as_bytes()).into_owned())
        .unwrap_or_default();

    Some(ChannelError::Rpc {
        code,
        message,
        metadata,
    })
}
