use reqpoll_core::utils::Redact;
use reqpoll_core::SigningCredential;
use std::fmt::{Debug, Formatter};

/// Credential that holds the api key and security key.
///
/// The api key is sent in plaintext as a query parameter; the security key
/// only ever enters the signature input.
#[derive(Default, Clone)]
pub struct Credential {
    /// Api key identifying the caller.
    pub api_key: String,
    /// Security key used to derive the signature.
    pub security_key: String,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &Redact::from(&self.api_key))
            .field("security_key", &Redact::from(&self.security_key))
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        !self.api_key.is_empty() && !self.security_key.is_empty()
    }
}
