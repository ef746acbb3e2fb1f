//! Bearer credentials for Vertex AI calls.

use std::fmt;
use std::sync::Arc;

use crate::Error;

/// OAuth scope required by the Vertex AI API.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Source of short-lived bearer credentials.
///
/// Queried once per call; implementations own any caching.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, Error>;
}

/// A fixed access token, e.g. from `gcloud auth print-access-token`.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, Error> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials resolved by `gcp_auth`.
pub struct ApplicationDefaultCredentials {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl ApplicationDefaultCredentials {
    /// Discover credentials from the environment (service account key,
    /// gcloud user credentials, or the metadata server).
    pub async fn new() -> Result<Self, Error> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| Error::auth(format!("Failed to load default credentials: {e}")))?;
        Ok(Self { provider })
    }
}

#[async_trait::async_trait]
impl TokenProvider for ApplicationDefaultCredentials {
    async fn access_token(&self) -> Result<String, Error> {
        let token = self
            .provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| Error::auth(format!("Failed to get access token: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("ya29.test");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.test");
        assert_eq!(format!("{provider:?}"), "StaticToken(..)");
    }
}
