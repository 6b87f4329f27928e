//! # Unary Call
//!
//! An in-flight unary call exposes four independent result channels: response headers,
//! the response message, the final status and the trailers.
//!
//! Each channel is a single-assignment slot: the first resolve or reject wins, later
//! attempts are ignored, and observers that attach after the slot settled get the stored
//! outcome.
use super::error::{ChannelError, TransportError};
use prost_reflect::{DynamicMessage, MethodDescriptor};
use tokio::sync::watch;
use tonic::{Code, metadata::MetadataMap};

type Slot<T> = Option<Result<T, ChannelError>>;

/// Write side of a single-assignment slot.
#[derive(Debug)]
pub(crate) struct Deferred<T> {
    tx: watch::Sender<Slot<T>>,
}

/// Read side of a single-assignment slot. Can be awaited any number of times.
#[derive(Debug, Clone)]
pub struct Pending<T> {
    rx: watch::Receiver<Slot<T>>,
}

pub(crate) fn deferred<T>() -> (Deferred<T>, Pending<T>) {
    let (tx, rx) = watch::channel(None);
    (Deferred { tx }, Pending { rx })
}

impl<T> Deferred<T> {
    /// Returns `false` if the slot had already settled.
    pub(crate) fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects the slot unless it already settled.
    pub(crate) fn reject_pending(&self, err: ChannelError) -> bool {
        self.settle(Err(err))
    }

    fn settle(&self, outcome: Result<T, ChannelError>) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }
}

impl<T: Clone> Pending<T> {
    /// Waits until the slot settles and returns a copy of its outcome.
    pub async fn wait(&self) -> Result<T, ChannelError> {
        let mut rx = self.rx.clone();

        match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot)
                .clone()
                .unwrap_or(Err(ChannelError::Transport(TransportError::Abandoned))),
            Err(_) => Err(ChannelError::Transport(TransportError::Abandoned)),
        }
    }

    /// Returns the outcome if the slot already settled.
    pub fn peek(&self) -> Option<Result<T, ChannelError>> {
        self.rx.borrow().clone()
    }
}

/// The final status of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcStatus {
    pub code: Code,
    pub detail: String,
}

impl RpcStatus {
    pub fn ok() -> Self {
        Self {
            code: Code::Ok,
            detail: String::new(),
        }
    }
}

/// The write sides of a call, owned by the task driving the HTTP exchange.
#[derive(Debug)]
pub(crate) struct CallSlots {
    pub(crate) headers: Deferred<MetadataMap>,
    pub(crate) message: Deferred<DynamicMessage>,
    pub(crate) status: Deferred<RpcStatus>,
    pub(crate) trailers: Deferred<MetadataMap>,
}

impl CallSlots {
    /// Rejects every channel that has not settled yet.
    pub(crate) fn reject_pending(&self, err: ChannelError) {
        self.headers.reject_pending(err.clone());
        self.message.reject_pending(err.clone());
        self.status.reject_pending(err.clone());
        self.trailers.reject_pending(err);
    }
}

/// Everything a successful call produced.
#[derive(Debug, Clone)]
pub struct UnaryResponse {
    pub headers: MetadataMap,
    pub message: DynamicMessage,
    pub status: RpcStatus,
    pub trailers: MetadataMap,
}

/// A unary call whose HTTP exchange is running in the background.
#[derive(Debug, Clone)]
pub struct UnaryCall {
    method: MethodDescriptor,
    request_metadata: Vec<(String, String)>,
    input: DynamicMessage,
    headers: Pending<MetadataMap>,
    message: Pending<DynamicMessage>,
    status: Pending<RpcStatus>,
    trailers: Pending<MetadataMap>,
}

impl UnaryCall {
    pub(crate) fn new(
        method: MethodDescriptor,
        request_metadata: Vec<(String, String)>,
        input: DynamicMessage,
    ) -> (Self, CallSlots) {
        let (headers_tx, headers) = deferred();
        let (message_tx, message) = deferred();
        let (status_tx, status) = deferred();
        let (trailers_tx, trailers) = deferred();

        let call = Self {
            method,
            request_metadata,
            input,
            headers,
            message,
            status,
            trailers,
        };

        let slots = CallSlots {
            headers: headers_tx,
            message: message_tx,
            status: status_tx,
            trailers: trailers_tx,
        };

        (call, slots)
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    /// Metadata the call was issued with.
    pub fn request_metadata(&self) -> &[(String, String)] {
        &self.request_metadata
    }

    pub fn input(&self) -> &DynamicMessage {
        &self.input
    }

    /// Response headers, minus `content-type` and `content-length`.
    pub async fn headers(&self) -> Result<MetadataMap, ChannelError> {
        self.headers.wait().await
    }

    pub async fn message(&self) -> Result<DynamicMessage, ChannelError> {
        self.message.wait().await
    }

    pub async fn status(&self) -> Result<RpcStatus, ChannelError> {
        self.status.wait().await
    }

    pub async fn trailers(&self) -> Result<MetadataMap, ChannelError> {
        self.trailers.wait().await
    }

    /// Waits for every channel and fails with the first error found.
    pub async fn response(&self) -> Result<UnaryResponse, ChannelError> {
        Ok(UnaryResponse {
            headers: self.headers().await?,
            message: self.message().await?,
            status: self.status().await?,
            trailers: self.trailers().await?,
        })
    }
}
