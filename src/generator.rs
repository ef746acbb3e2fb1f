use crate::types::{GenerateContentRequest, GenerateContentResponse};
use crate::{Error, StreamGenerateContentResult};

/// Something that can generate content for a conversation.
/// All generation is internally streamed - await `result.response` for the
/// merged response or consume `result.stream` for the chunks.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync + 'static {
    /// Start a streaming generation call.
    async fn generate_content_stream(
        &self,
        request: GenerateContentRequest,
    ) -> Result<StreamGenerateContentResult, Error>;

    /// Generate and wait for the merged response.
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, Error> {
        self.generate_content_stream(request).await?.response.await
    }
}
