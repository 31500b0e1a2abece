//! reqwest-backed [`HttpSend`] implementation.
//!
//! Every client built here carries explicit connect and read timeouts, so a
//! hung endpoint surfaces as a transient error the retry layer can handle
//! instead of blocking a poll sequence forever.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqpoll_core::{Error, HttpSend, Result};
use reqwest::{Client, Request};
use std::time::Duration;

/// Default request timeout; generation endpoints are slow to answer.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HttpSend implementation backed by a [`reqwest::Client`].
#[derive(Debug)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl Default for ReqwestHttpSend {
    fn default() -> Self {
        Self::with_timeouts(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a caller-provided client.
    ///
    /// The caller is responsible for configuring timeouts on the client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a client with the given read and connect timeouts.
    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            // The builder only fails on TLS backend misconfiguration, which is
            // a programming error with these options.
            .expect("default reqwest client must build");
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid(format!("invalid request: {e}")).with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| {
                Error::transient_network(format!("http send failed: {e}")).with_source(e)
            })?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| {
                Error::transient_network(format!("failed to read response body: {e}"))
                    .with_source(e)
            })?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
