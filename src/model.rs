use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::TokenProvider;
use crate::chat::{ChatSession, StartChatParams};
use crate::chunk_stream::ChunkStreamExt;
use crate::generator::ContentGenerator;
use crate::response::{process_stream, StreamGenerateContentResult};
use crate::types::{
    Content, CountTokensRequest, CountTokensResponse, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, SafetySetting,
};
use crate::validation::{validate_contents, validate_request};
use crate::Error;

const USER_AGENT: &str = concat!("vertexai-rust/", env!("CARGO_PKG_VERSION"));

/// A Gemini model on Vertex AI.
///
/// Cheap to clone; clones share the HTTP client and token provider.
#[derive(Clone)]
pub struct GenerativeModel {
    client: Client,
    base_url: String,
    project: String,
    location: String,
    model: String,
    token_provider: Arc<dyn TokenProvider>,
    generation_config: Option<GenerationConfig>,
    safety_settings: Option<Vec<SafetySetting>>,
}

impl GenerativeModel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        client: Client,
        base_url: String,
        project: String,
        location: String,
        model: &str,
        token_provider: Arc<dyn TokenProvider>,
        generation_config: Option<GenerationConfig>,
        safety_settings: Option<Vec<SafetySetting>>,
    ) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(model).to_string();
        Self {
            client,
            base_url,
            project,
            location,
            model,
            token_provider,
            generation_config,
            safety_settings,
        }
    }

    /// The model ID, e.g. `gemini-1.0-pro`.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate content and wait for the merged response.
    pub async fn generate_content(
        &self,
        request: impl Into<GenerateContentRequest>,
    ) -> Result<GenerateContentResponse, Error> {
        ContentGenerator::generate_content(self, request.into()).await
    }

    /// Generate content, exposing both the chunk stream and the merged response.
    pub async fn generate_content_stream(
        &self,
        request: impl Into<GenerateContentRequest>,
    ) -> Result<StreamGenerateContentResult, Error> {
        ContentGenerator::generate_content_stream(self, request.into()).await
    }

    /// Count the tokens `contents` would consume.
    pub async fn count_tokens(&self, contents: Vec<Content>) -> Result<CountTokensResponse, Error> {
        validate_contents(&contents)?;
        let response = self
            .post("countTokens", &CountTokensRequest { contents })
            .await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice::<CountTokensResponse>(&body)?)
    }

    /// Start a chat session backed by this model.
    pub fn start_chat(&self, params: StartChatParams) -> ChatSession {
        ChatSession::new(Arc::new(self.clone()), params)
    }

    /// Fill in the model-level defaults the request does not override.
    fn with_defaults(&self, mut request: GenerateContentRequest) -> GenerateContentRequest {
        if request.generation_config.is_none() {
            request.generation_config = self.generation_config.clone();
        }
        if request.safety_settings.is_none() {
            request.safety_settings = self.safety_settings.clone();
        }
        request
    }

    /// Get the API endpoint for a model method.
    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.base_url, self.project, self.location, self.model, method
        )
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<reqwest::Response, Error> {
        let token = self.token_provider.access_token().await?;
        let endpoint = self.endpoint(method);
        tracing::debug!(model = %self.model, method, "sending Vertex AI request");

        let response = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Vertex AI: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Vertex AI API error (status {}): {}", status, error_text);
            return Err(Error::api(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl ContentGenerator for GenerativeModel {
    async fn generate_content_stream(
        &self,
        request: GenerateContentRequest,
    ) -> Result<StreamGenerateContentResult, Error> {
        validate_request(&request)?;
        let request = self.with_defaults(request);

        let response = self.post("streamGenerateContent", &request).await?;
        let chunks = response.bytes_stream().response_chunks();

        Ok(process_stream(chunks))
    }
}

impl std::fmt::Debug for GenerativeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeModel")
            .field("model", &self.model)
            .field("project", &self.project)
            .field("location", &self.location)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
