//! # HTTP Client
//!
//! The seam between the transport and the network. The transport only ever hands a fully
//! built `http::Request` to an [`HttpClient`] and reads back a buffered `http::Response`,
//! so any client (or an in-memory fake) can be plugged in.
use crate::BoxError;
use bytes::Bytes;
use std::future::Future;

pub trait HttpClient: Clone + Send + Sync + 'static {
    /// Performs a single request/response exchange.
    fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> impl Future<Output = Result<http::Response<Bytes>, BoxError>> + Send;
}

impl HttpClient for reqwest::Client {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>, BoxError> {
        let request = reqwest::Request::try_from(request)?;
        let response = self.execute(request).await?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.version_mut() = version;
        *response.headers_mut() = headers;

        Ok(response)
    }
}
