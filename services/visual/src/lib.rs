//! Signer and async task client for the visual generation endpoints.
//!
//! Requests are authenticated with a SigV4-style HMAC-SHA256 chain over a
//! canonical request (`Authorization`/`X-Date`/`X-Content-Sha256` headers,
//! credential scope `date/region/service/request`). Generation jobs are
//! submitted with one signed call and then polled until they reach a
//! terminal state.

mod constants;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::{EnvCredentialProvider, StaticCredentialProvider};

mod sign_request;
pub use sign_request::{ArrayFormat, RequestSigner};

mod task;
pub use task::{TaskClient, TaskEndpoint};

mod validate;
pub use validate::{validate_image, ImagePayload};
