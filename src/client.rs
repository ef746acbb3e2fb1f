use reqwest::Client;
use std::sync::Arc;

use crate::auth::{ApplicationDefaultCredentials, StaticToken, TokenProvider};
use crate::config::VertexConfig;
use crate::model::GenerativeModel;
use crate::types::{GenerationConfig, SafetySetting};
use crate::Error;

/// Entry point: binds a project and region to a credential source.
pub struct VertexAI {
    config: VertexConfig,
    client: Client,
    token_provider: Arc<dyn TokenProvider>,
}

impl VertexAI {
    /// Create a client. Uses the configured access token if present,
    /// Application Default Credentials otherwise.
    pub async fn new(config: VertexConfig) -> Result<Self, Error> {
        let token_provider: Arc<dyn TokenProvider> = match &config.access_token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(ApplicationDefaultCredentials::new().await?),
        };
        Self::with_token_provider(config, token_provider)
    }

    /// Create a client from `GOOGLE_CLOUD_PROJECT` and friends.
    pub async fn from_env() -> Result<Self, Error> {
        Self::new(VertexConfig::from_env()?).await
    }

    /// Create a client with a caller-supplied credential source.
    pub fn with_token_provider(
        config: VertexConfig,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;

        tracing::debug!(
            project = %config.project,
            location = %config.location,
            "created Vertex AI client"
        );

        Ok(Self {
            config,
            client,
            token_provider,
        })
    }

    pub fn config(&self) -> &VertexConfig {
        &self.config
    }

    /// Get a handle to a generative model.
    pub fn get_generative_model(&self, params: impl Into<ModelParams>) -> GenerativeModel {
        let params = params.into();
        GenerativeModel::new(
            self.client.clone(),
            self.config.base_url(),
            self.config.project.clone(),
            self.config.location.clone(),
            &params.model,
            self.token_provider.clone(),
            params.generation_config,
            params.safety_settings,
        )
    }
}

/// Model selection plus the defaults applied to every request the model sends.
#[derive(Debug, Clone, Default)]
pub struct ModelParams {
    pub model: String,
    pub generation_config: Option<GenerationConfig>,
    pub safety_settings: Option<Vec<SafetySetting>>,
}

impl ModelParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    pub fn safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = Some(settings);
        self
    }
}

impl From<&str> for ModelParams {
    fn from(model: &str) -> Self {
        Self::new(model)
    }
}

impl From<String> for ModelParams {
    fn from(model: String) -> Self {
        Self::new(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_from_config() {
        let vertex = VertexAI::new(VertexConfig::new("p", "us-central1").access_token("t"))
            .await
            .unwrap();
        assert_eq!(vertex.token_provider.access_token().await.unwrap(), "t");

        let model = vertex.get_generative_model("gemini-1.0-pro");
        assert_eq!(model.model(), "gemini-1.0-pro");
    }

    #[test]
    fn test_empty_project_rejected() {
        let err = VertexAI::with_token_provider(
            VertexConfig::new("", "us-central1"),
            Arc::new(StaticToken::new("t")),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
