use crate::{constants::*, Credential};
use async_trait::async_trait;
use reqpoll_core::{Context, ProvideCredential, Result};

/// EnvCredentialProvider loads the CV credential from environment variables.
///
/// This provider looks for the following environment variables:
/// - `CV_API_KEY`: the api key
/// - `CV_SECURITY_KEY`: the security key used for signature generation
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let api_key = ctx.env_var(CV_API_KEY);
        let security_key = ctx.env_var(CV_SECURITY_KEY);

        match (api_key, security_key) {
            (Some(api_key), Some(security_key)) => Ok(Some(Credential {
                api_key,
                security_key,
            })),
            _ => Ok(None),
        }
    }
}
