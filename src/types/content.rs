use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Role of a conversation turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Resolve a wire role string. Anything other than `"user"` was written by the model.
    pub(crate) fn from_wire(role: Option<&str>) -> Self {
        match role {
            Some(r) if r.eq_ignore_ascii_case("user") => Role::User,
            _ => Role::Model,
        }
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a content with the given role and parts.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Create a user turn with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Create a model turn with a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Concatenate all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::user(text)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::user(text)
    }
}

impl From<Vec<Part>> for Content {
    fn from(parts: Vec<Part>) -> Self {
        Content::new(Role::User, parts)
    }
}

/// A single payload unit inside a [`Content`].
///
/// Serialized with snake_case keys; camelCase keys are accepted when reading
/// model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(alias = "inlineData")]
        inline_data: Blob,
    },
    FileData {
        #[serde(alias = "fileData")]
        file_data: FileData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Inline binary payload; the bytes are base64-encoded for transport.
    pub fn inline_data(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Part::InlineData {
            inline_data: Blob {
                mime_type: mime_type.into(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }

    /// Reference to a file in Cloud Storage.
    pub fn file_data(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Part::FileData {
            file_data: FileData {
                mime_type: mime_type.into(),
                file_uri: file_uri.into(),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Inline binary data with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    #[serde(alias = "mimeType")]
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

impl Blob {
    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>, Error> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| Error::validation(format!("Invalid base64 inline data: {e}")))
    }
}

/// Reference to a remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    #[serde(alias = "mimeType")]
    pub mime_type: String,
    #[serde(alias = "fileUri")]
    pub file_uri: String,
}
