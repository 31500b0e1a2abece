use crate::{Error, Result};
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is used to send http requests during signing and polling.
///
/// Implementations must apply explicit connect/read timeouts; a call that
/// exceeds its timeout should surface as a transient error so the retry
/// layer can handle it.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

/// NoopHttpSend errors on every send.
#[derive(Debug, Copy, Clone)]
pub struct NoopHttpSend;

#[async_trait::async_trait]
impl HttpSend for NoopHttpSend {
    async fn http_send(&self, _: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::config_invalid(
            "no http client configured, use Context::with_http_send",
        ))
    }
}
