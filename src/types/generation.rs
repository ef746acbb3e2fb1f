use serde::{Deserialize, Serialize};

use super::content::Content;

/// Largest `top_k` the service accepts.
pub const MAX_TOP_K: u32 = 40;

/// Sampling parameters for a generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Only sent when within `1..=MAX_TOP_K`; zero means "unset".
    #[serde(skip_serializing_if = "top_k_is_unset")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

fn top_k_is_unset(top_k: &Option<u32>) -> bool {
    !matches!(top_k, Some(1..=MAX_TOP_K))
}

impl GenerationConfig {
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn candidate_count(mut self, count: u32) -> Self {
        self.candidate_count = Some(count);
        self
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(stop_sequences);
        self
    }
}

/// Category of potentially harmful content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    /// Also used for categories this crate does not know.
    #[serde(rename = "HARM_CATEGORY_UNSPECIFIED")]
    #[serde(other)]
    Unspecified,
}

/// Probability at and above which content is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    #[serde(rename = "HARM_BLOCK_THRESHOLD_UNSPECIFIED")]
    Unspecified,
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

/// Block threshold for one harm category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

impl SafetySetting {
    pub fn new(category: HarmCategory, threshold: HarmBlockThreshold) -> Self {
        Self {
            category,
            threshold,
        }
    }
}

/// Request body for `generateContent` / `streamGenerateContent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_settings: Option<Vec<SafetySetting>>,
}

impl GenerateContentRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
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

impl From<&str> for GenerateContentRequest {
    fn from(text: &str) -> Self {
        GenerateContentRequest::new(vec![Content::user(text)])
    }
}

impl From<Vec<Content>> for GenerateContentRequest {
    fn from(contents: Vec<Content>) -> Self {
        GenerateContentRequest::new(contents)
    }
}

/// Request body for `countTokens`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountTokensRequest {
    pub contents: Vec<Content>,
}

/// Response body of `countTokens`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CountTokensResponse {
    #[serde(default, rename = "totalTokens", alias = "total_tokens")]
    pub total_tokens: u32,
    #[serde(
        default,
        rename = "totalBillableCharacters",
        alias = "total_billable_characters"
    )]
    pub total_billable_characters: Option<u32>,
}
