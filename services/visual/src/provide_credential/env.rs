use crate::{constants::*, Credential};
use async_trait::async_trait;
use reqpoll_core::{Context, ProvideCredential, Result};

/// EnvCredentialProvider loads the visual API credential from environment
/// variables.
///
/// This provider looks for the following environment variables:
/// - `ACCESS_KEY`: the access key id
/// - `SECRET_KEY`: the secret access key
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
        let access_key_id = ctx.env_var(ACCESS_KEY);
        let secret_access_key = ctx.env_var(SECRET_KEY);

        match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(Some(Credential {
                access_key_id,
                secret_access_key,
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqpoll_core::StaticEnv;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_loads_from_env() {
        let ctx = Context::new().with_env(StaticEnv {
            envs: HashMap::from([
                (ACCESS_KEY.to_string(), "AKIDEXAMPLE".to_string()),
                (SECRET_KEY.to_string(), "SECRETEXAMPLE".to_string()),
            ]),
        });

        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .expect("must not error")
            .expect("credential must be present");
        assert_eq!(cred.access_key_id, "AKIDEXAMPLE");
    }

    #[tokio::test]
    async fn test_redacted_debug_output() {
        let cred = Credential {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "SECRETEXAMPLE12".to_string(),
        };
        let out = format!("{cred:?}");
        assert!(!out.contains("SECRETEXAMPLE12"));
    }

    #[tokio::test]
    async fn test_missing_secret_yields_none() {
        let ctx = Context::new().with_env(StaticEnv {
            envs: HashMap::from([(ACCESS_KEY.to_string(), "AKIDEXAMPLE".to_string())]),
        });

        assert!(EnvCredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .expect("must not error")
            .is_none());
    }
}
