use crate::{Context, Result};
use std::fmt::Debug;

/// SigningCredential is implemented by credential types that can report
/// whether they are usable for signing.
pub trait SigningCredential: Clone + Debug + Send + Sync + 'static {
    /// Check if the credential is valid.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential loads a credential from the context, for example from
/// environment variables.
///
/// Services require different credentials: the HMAC-chain scheme needs an
/// access key and secret key, the query-hash scheme an api key and security
/// key.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + 'static {
    /// Credential returned by this provider.
    type Credential: SigningCredential;

    /// Load credential from the context.
    ///
    /// Returns `Ok(None)` when the source holds no credential; the signer
    /// turns that into a fail-fast credential error before any network call.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest builds the authentication material for one request.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + 'static {
    /// Credential used by this builder.
    type Credential: SigningCredential;

    /// Mutate the request parts to carry the signature.
    ///
    /// `body` is the exact payload that will be sent; schemes that sign a
    /// payload hash need it bit-exact.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        body: &[u8],
        credential: Option<&Self::Credential>,
    ) -> Result<()>;
}
