//! # JSON <-> Protobuf Codec
//!
//! Converts dynamic messages to and from their canonical protobuf JSON mapping.
//!
//! 1. **Encoder (Proto -> JSON)**: serializes a `DynamicMessage` into a `serde_json::Value`
//!    that becomes the request body or query string.
//! 2. **Decoder (JSON -> Proto)**: validates a response body against the output
//!    `MessageDescriptor` and builds a `DynamicMessage` from it.
use prost_reflect::{DeserializeOptions, DynamicMessage, MessageDescriptor, SerializeOptions};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Failed to map message to JSON: '{0}'")]
    Encode(#[source] serde_json::Error),
    #[error("JSON structure does not match Protobuf schema: '{0}'")]
    Decode(#[source] serde_json::Error),
}

/// JSON mapping options applied to request and response messages.
#[derive(Debug, Clone, Default)]
pub struct JsonOptions {
    pub serialize: SerializeOptions,
    pub deserialize: DeserializeOptions,
}

pub struct JsonCodec<'a> {
    options: &'a JsonOptions,
}

impl<'a> JsonCodec<'a> {
    pub fn new(options: &'a JsonOptions) -> Self {
        Self { options }
    }

    /// Serializes `message` with the configured options.
    pub fn encode(&self, message: &DynamicMessage) -> Result<Value, CodecError> {
        message
            .serialize_with_options(serde_json::value::Serializer, &self.options.serialize)
            .map_err(CodecError::Encode)
    }

    /// Serializes `message` keyed by proto field names.
    ///
    /// Path templates refer to fields by their proto names, so the binder works on this form.
    /// Scalars holding their default value are kept so they can still be bound. Unset message
    /// fields are left out, which makes the fields below them missing parameters.
    pub fn encode_fields(&self, message: &DynamicMessage) -> Result<Value, CodecError> {
        let options = SerializeOptions::new()
            .use_proto_field_name(true)
            .skip_default_fields(false);

        message
            .serialize_with_options(serde_json::value::Serializer, &options)
            .map_err(CodecError::Encode)
    }

    pub fn decode(
        &self,
        descriptor: MessageDescriptor,
        value: Value,
    ) -> Result<DynamicMessage, CodecError> {
        DynamicMessage::deserialize_with_options(descriptor, value, &self.options.deserialize)
            .map_err(CodecError::Decode)
    }
}
