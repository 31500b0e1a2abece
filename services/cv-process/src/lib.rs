//! Signer for the synchronous CV process endpoint.
//!
//! Authentication is a `sign`+`nonce`+`timestamp` query triplet: the
//! signature is the lowercase hex SHA-1 of the nonce, security key and
//! timestamp rendered as strings, sorted lexicographically and concatenated
//! with no separator.

mod constants;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::{EnvCredentialProvider, StaticCredentialProvider};

mod sign_request;
pub use sign_request::RequestSigner;
