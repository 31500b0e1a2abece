use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use http::request::Parts;
use log::debug;
use rand::Rng;
use reqpoll_core::hash::hex_sha1;
use reqpoll_core::time::unix_timestamp;
use reqpoll_core::{Context, Error, Result, SignRequest, SigningRequest};

/// RequestSigner implementing the sorted-concatenation SHA-1 scheme.
///
/// A fresh nonce/timestamp pair is drawn per request and sent in plaintext
/// alongside the signature, so the server can validate freshness and reject
/// replays. Reusing a pair across requests is a correctness bug.
#[derive(Debug, Default)]
pub struct RequestSigner {
    nonce: Option<u32>,
    timestamp: Option<i64>,
}

impl RequestSigner {
    /// Create a new signer for the CV process endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the nonce and timestamp.
    ///
    /// # Note
    ///
    /// Fresh values must be drawn per request. Only use this for testing.
    #[cfg(test)]
    pub fn with_nonce_and_timestamp(mut self, nonce: u32, timestamp: i64) -> Self {
        self.nonce = Some(nonce);
        self.timestamp = Some(timestamp);
        self
    }
}

/// Compute the signature over (nonce, security key, timestamp).
///
/// The three values are rendered as strings and sorted **lexicographically**,
/// not numerically; the remote verifier expects exactly this order. The sorted
/// strings are concatenated with no separator and SHA-1 hashed to lowercase
/// hex.
pub fn gen_sign(nonce: u32, security_key: &str, timestamp: i64) -> String {
    let mut keys = [
        nonce.to_string(),
        security_key.to_string(),
        timestamp.to_string(),
    ];
    keys.sort();

    hex_sha1(keys.concat().as_bytes())
}

fn gen_nonce() -> u32 {
    rand::thread_rng().gen_range(0..(1u32 << 31))
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        _body: &[u8],
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::credential_invalid(
                "api key or security key is missing, request will not be signed",
            ));
        };

        let mut signed_req = SigningRequest::build(req)?;

        let timestamp = self.timestamp.unwrap_or_else(unix_timestamp);
        let nonce = self.nonce.unwrap_or_else(gen_nonce);
        let sign = gen_sign(nonce, &cred.security_key, timestamp);
        debug!("calculated sign for nonce {nonce} at {timestamp}");

        signed_req.query_push(QUERY_API_KEY, cred.api_key.clone());
        signed_req.query_push(QUERY_TIMESTAMP, timestamp.to_string());
        signed_req.query_push(QUERY_NONCE, nonce.to_string());
        signed_req.query_push(QUERY_SIGN, sign);

        signed_req.apply(req)
    }
}
