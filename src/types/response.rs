use serde::{Deserialize, Serialize};

use super::content::Content;
use super::generation::HarmCategory;

/// Reason why a candidate stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    #[serde(rename = "FINISH_REASON_UNSPECIFIED")]
    Unspecified,
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
}

impl FinishReason {
    pub(crate) fn from_wire(reason: &str) -> Self {
        match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            "FINISH_REASON_UNSPECIFIED" | "" => FinishReason::Unspecified,
            _ => FinishReason::Other,
        }
    }
}

/// Probability that content falls into a harm category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmProbability {
    Negligible,
    Low,
    Medium,
    High,
    #[serde(rename = "HARM_PROBABILITY_UNSPECIFIED")]
    #[serde(other)]
    Unspecified,
}

/// Safety verdict for one harm category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRating {
    pub category: HarmCategory,
    pub probability: HarmProbability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
}

/// A span of generated text attributed to an external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSource {
    #[serde(default, alias = "startIndex")]
    pub start_index: Option<u32>,
    #[serde(default, alias = "endIndex")]
    pub end_index: Option<u32>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMetadata {
    #[serde(default, alias = "citationSources")]
    pub citation_sources: Vec<CitationSource>,
}

/// Token accounting for a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    #[serde(default, alias = "promptTokenCount")]
    pub prompt_token_count: u32,
    #[serde(default, alias = "candidatesTokenCount")]
    pub candidates_token_count: u32,
    #[serde(default, alias = "totalTokenCount")]
    pub total_token_count: u32,
}

/// Why the prompt itself was blocked, if it was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptFeedback {
    #[serde(default, alias = "blockReason")]
    pub block_reason: Option<String>,
    #[serde(default, alias = "blockReasonMessage")]
    pub block_reason_message: Option<String>,
    #[serde(default, alias = "safetyRatings")]
    pub safety_ratings: Vec<SafetyRating>,
}

/// One generated alternative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub index: u32,
    pub content: Content,
    pub finish_reason: Option<FinishReason>,
    pub finish_message: Option<String>,
    pub safety_ratings: Vec<SafetyRating>,
    pub citation_metadata: Option<CitationMetadata>,
}

impl Candidate {
    /// Concatenated text of this candidate's parts.
    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// A (partial or merged) model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, if there is one.
    pub fn text(&self) -> Option<String> {
        self.candidates.first().map(Candidate::text)
    }
}
