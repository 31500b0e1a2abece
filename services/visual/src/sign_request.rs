use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::utf8_percent_encode;
use reqpoll_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use reqpoll_core::time::{format_date, format_iso8601, now, DateTime};
use reqpoll_core::{Context, Error, Result, SignRequest, SigningRequest};
use std::fmt::Write;

/// How array-valued query parameters are rendered during canonicalization.
///
/// Endpoints in this family disagree; the toggle must match what the remote
/// verifier reconstructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayFormat {
    /// Repeat the key once per value: `k=a&k=b` ("doseq" semantics).
    #[default]
    Repeated,
    /// Join the values with commas under one key: `k=a,b`.
    CommaJoined,
}

/// RequestSigner implementing the HMAC-SHA256 canonical-request chain.
///
/// The scheme mirrors AWS SigV4 in structure but differs in its constants:
/// the signing-key chain seeds from the raw secret (no `AWS4` prefix), the
/// scope and chain terminate with the literal `request`, and the signed
/// headers are the fixed set `content-type;host;x-content-sha256;x-date`.
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,
    array_format: ArrayFormat,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for the given service and region.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
            array_format: ArrayFormat::default(),
            time: None,
        }
    }

    /// Select how array-valued query parameters are canonicalized.
    pub fn with_array_format(mut self, array_format: ArrayFormat) -> Self {
        self.array_format = array_format;
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        body: &[u8],
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::credential_invalid(
                "access key or secret key is missing, request will not be signed",
            ));
        };

        let now = self.time.unwrap_or_else(now);
        let mut signed_req = SigningRequest::build(req)?;

        let payload_hash = hex_sha256(body);

        // canonicalize context
        canonicalize_header(&mut signed_req, &payload_hash, now)?;
        let canonical_query = canonicalize_query(&mut signed_req, self.array_format);

        // build canonical request and string to sign.
        let creq = canonical_request_string(&signed_req, &canonical_query, &payload_hash)?;
        debug!("calculated canonical request: {creq}");

        // Scope: "20220313/<region>/<service>/request"
        let scope = format!(
            "{}/{}/{}/{}",
            format_date(now),
            self.region,
            self.service,
            REQUEST_SUFFIX
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{ALGORITHM}")
                .and_then(|_| writeln!(f, "{}", format_iso8601(now)))
                .and_then(|_| writeln!(f, "{scope}"))
                .and_then(|_| write!(f, "{}", hex_sha256(creq.as_bytes())))
                .map_err(|e| Error::unexpected(format!("failed to build string to sign: {e}")))?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            cred.access_key_id,
            signed_header_names(),
        ))?;
        authorization.set_sensitive(true);

        signed_req.headers.insert(header::AUTHORIZATION, authorization);

        // Apply to the request.
        signed_req.apply(req)
    }
}

fn signed_header_names() -> String {
    [header::CONTENT_TYPE.as_str(), header::HOST.as_str(), X_CONTENT_SHA256, X_DATE].join(";")
}

fn canonical_request_string(
    ctx: &SigningRequest,
    canonical_query: &str,
    payload_hash: &str,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    writeln!(f, "{}", ctx.method)
        .and_then(|_| writeln!(f, "{}", ctx.path))
        .and_then(|_| writeln!(f, "{canonical_query}"))
        .map_err(|e| Error::unexpected(format!("failed to write request line: {e}")))?;

    // Canonical headers in their fixed order, one `name:value` line each,
    // then a blank line and the signed header names.
    for name in [
        header::CONTENT_TYPE.as_str(),
        header::HOST.as_str(),
        X_CONTENT_SHA256,
        X_DATE,
    ] {
        let value = ctx.header_get_or_default(&name.parse().expect("header name must be valid"))?;
        writeln!(f, "{name}:{value}")
            .map_err(|e| Error::unexpected(format!("failed to write header: {e}")))?;
    }
    writeln!(f)
        .and_then(|_| writeln!(f, "{}", signed_header_names()))
        .and_then(|_| write!(f, "{payload_hash}"))
        .map_err(|e| Error::unexpected(format!("failed to write payload hash: {e}")))?;

    Ok(f)
}

fn canonicalize_header(
    ctx: &mut SigningRequest,
    payload_hash: &str,
    now: DateTime,
) -> Result<()> {
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)
    }

    // The request bodies in this family are JSON; default the content type.
    if ctx.headers.get(header::CONTENT_TYPE).is_none() {
        ctx.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers
            .insert(header::HOST, ctx.authority.as_str().parse()?);
    }

    // Insert X_DATE header if not present.
    if ctx.headers.get(X_DATE).is_none() {
        ctx.headers
            .insert(X_DATE, HeaderValue::try_from(format_iso8601(now))?);
    }

    // The payload hash is always signed; there is no unsigned-payload mode.
    ctx.headers
        .insert(X_CONTENT_SHA256, HeaderValue::try_from(payload_hash)?);

    Ok(())
}

/// Sort and encode the query, resolving duplicate keys per the array format.
///
/// The encoded pairs are written back to the request so the bytes sent are
/// exactly the bytes signed.
fn canonicalize_query(ctx: &mut SigningRequest, array_format: ArrayFormat) -> String {
    let mut query = std::mem::take(&mut ctx.query);
    query.sort();

    let mut encoded: Vec<(String, String)> = Vec::with_capacity(query.len());
    for (k, v) in query {
        let k = utf8_percent_encode(&k, &QUERY_ENCODE_SET).to_string();
        let v = utf8_percent_encode(&v, &QUERY_ENCODE_SET).to_string();

        match (array_format, encoded.last_mut()) {
            (ArrayFormat::CommaJoined, Some((last_key, last_value))) if *last_key == k => {
                last_value.push(',');
                last_value.push_str(&v);
            }
            _ => encoded.push((k, v)),
        }
    }

    let canonical = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    ctx.query = encoded;
    canonical
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), REQUEST_SUFFIX.as_bytes())
}
