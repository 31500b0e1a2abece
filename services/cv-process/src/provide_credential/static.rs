use crate::Credential;
use async_trait::async_trait;
use reqpoll_core::{Context, ProvideCredential, Result};

/// StaticCredentialProvider returns a fixed credential.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a provider holding the given keys.
    pub fn new(api_key: &str, security_key: &str) -> Self {
        Self {
            credential: Credential {
                api_key: api_key.to_string(),
                security_key: security_key.to_string(),
            },
        }
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(self.credential.clone()))
    }
}
