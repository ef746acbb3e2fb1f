//! Raw response shapes as they arrive on the wire.
//!
//! Every field is optional and both camelCase and snake_case keys are accepted.
//! [`WireResponse::normalize`] turns one of these into the strict
//! [`GenerateContentResponse`] used everywhere else.

use serde::Deserialize;

use crate::types::{
    Candidate, CitationMetadata, Content, FinishReason, GenerateContentResponse, Part,
    PromptFeedback, Role, SafetyRating, UsageMetadata,
};

/// One streamed chunk (or a full non-streamed body).
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub candidates: Option<Vec<WireCandidate>>,
    #[serde(default, rename = "usageMetadata", alias = "usage_metadata")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default, rename = "promptFeedback", alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WireCandidate {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub content: Option<WireContent>,
    #[serde(default, rename = "finishReason", alias = "finish_reason")]
    pub finish_reason: Option<String>,
    #[serde(default, rename = "finishMessage", alias = "finish_message")]
    pub finish_message: Option<String>,
    #[serde(default, rename = "safetyRatings", alias = "safety_ratings")]
    pub safety_ratings: Option<Vec<SafetyRating>>,
    #[serde(default, rename = "citationMetadata", alias = "citation_metadata")]
    pub citation_metadata: Option<CitationMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WireContent {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
}

impl WireResponse {
    pub(crate) fn normalize(self) -> GenerateContentResponse {
        let candidates = self
            .candidates
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(position, candidate)| candidate.normalize(position as u32))
            .collect();

        GenerateContentResponse {
            candidates,
            usage_metadata: self.usage_metadata,
            prompt_feedback: self.prompt_feedback,
        }
    }
}

impl WireCandidate {
    /// `position` stands in for a missing `index`.
    fn normalize(self, position: u32) -> Candidate {
        let (role, parts) = match self.content {
            Some(content) => (
                Role::from_wire(content.role.as_deref()),
                content.parts.unwrap_or_default(),
            ),
            None => (Role::Model, Vec::new()),
        };

        Candidate {
            index: self.index.unwrap_or(position),
            content: Content::new(role, parts),
            finish_reason: self.finish_reason.as_deref().map(FinishReason::from_wire),
            finish_message: self.finish_message.filter(|m| !m.is_empty()),
            safety_ratings: self.safety_ratings.unwrap_or_default(),
            citation_metadata: self.citation_metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str::<WireResponse>(json).unwrap().normalize()
    }

    #[test]
    fn test_missing_role_defaults_to_model() {
        let response = parse(r#"{"candidates":[{"index":0,"content":{"parts":[{"text":"hello"}]}}]}"#);
        assert_eq!(response.candidates[0].content.role, Role::Model);
        assert_eq!(response.text().as_deref(), Some("hello"));
    }

    #[test]
    fn test_missing_index_uses_position() {
        let response = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"a"}]}},{"content":{"parts":[{"text":"b"}]}}]}"#,
        );
        assert_eq!(response.candidates[0].index, 0);
        assert_eq!(response.candidates[1].index, 1);
    }

    #[test]
    fn test_snake_and_camel_case_fields() {
        let camel = parse(
            r#"{"candidates":[{"index":0,"content":{"parts":[]},"finishReason":"STOP","finishMessage":"done"}],"usageMetadata":{"promptTokenCount":2,"candidatesTokenCount":3,"totalTokenCount":5}}"#,
        );
        let snake = parse(
            r#"{"candidates":[{"index":0,"content":{"parts":[]},"finish_reason":"STOP","finish_message":"done"}],"usage_metadata":{"prompt_token_count":2,"candidates_token_count":3,"total_token_count":5}}"#,
        );
        assert_eq!(camel, snake);
        assert_eq!(camel.candidates[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(camel.usage_metadata.unwrap().total_token_count, 5);
    }

    #[test]
    fn test_usage_only_chunk() {
        let response = parse(r#"{"usageMetadata":{"promptTokenCount":1,"totalTokenCount":1}}"#);
        assert!(response.candidates.is_empty());
        assert_eq!(response.usage_metadata.unwrap().prompt_token_count, 1);
    }

    #[test]
    fn test_citations_and_safety_ratings() {
        let response = parse(
            r#"{"candidates":[{"index":0,"content":{"role":"model","parts":[{"text":"x"}]},
               "safetyRatings":[{"category":"HARM_CATEGORY_HATE_SPEECH","probability":"LOW"}],
               "citationMetadata":{"citationSources":[{"startIndex":0,"endIndex":1,"uri":"https://a"}]}}]}"#,
        );
        let candidate = &response.candidates[0];
        assert_eq!(candidate.safety_ratings.len(), 1);
        let sources = &candidate.citation_metadata.as_ref().unwrap().citation_sources;
        assert_eq!(sources[0].uri.as_deref(), Some("https://a"));
    }
}
