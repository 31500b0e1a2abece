use reqpoll_core::utils::Redact;
use reqpoll_core::SigningCredential;
use std::fmt::{Debug, Formatter};

/// Credential that holds the access key and secret key.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id, sent in plaintext inside the Authorization header.
    pub access_key_id: String,
    /// Secret access key, only ever used to seed the signing-key chain.
    pub secret_access_key: String,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}
