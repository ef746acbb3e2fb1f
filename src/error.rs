use thiserror::Error;

/// Errors that can occur when using the vertexai library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to parse response stream: {0}")]
    Parse(String),

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("Found invalid file URI '{0}': only Cloud Storage URIs (gs://) are supported")]
    InvalidUri(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Model returned a response with no candidates")]
    EmptyResponse,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Chat session already has a message in flight")]
    SessionBusy,
}

/// Coarse classification of an [`Error`], for callers that branch on failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection failure, non-2xx status, or a body that broke off mid-read.
    Transport,
    /// A chunk of the response body could not be decoded.
    Parse,
    /// The request was rejected before any network call.
    Validation,
    /// The call succeeded but produced no candidates.
    EmptyResponse,
    Auth,
    Config,
    /// The chat session was used while a call was in flight.
    State,
}

impl Error {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth(message.into())
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_) | Error::Api { .. } | Error::Streaming(_) => ErrorKind::Transport,
            Error::Parse(_) | Error::Serialization(_) => ErrorKind::Parse,
            Error::InvalidUri(_) | Error::Validation(_) => ErrorKind::Validation,
            Error::EmptyResponse => ErrorKind::EmptyResponse,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Config(_) => ErrorKind::Config,
            Error::SessionBusy => ErrorKind::State,
        }
    }

    /// Produce an equivalent error so one failure can be reported to both the
    /// chunk stream and the merged response. Variants wrapping foreign error
    /// types keep their kind but carry only the rendered message.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Error::Api { status, message } => Error::api(*status, message.clone()),
            Error::Parse(message) => Error::Parse(message.clone()),
            Error::Serialization(e) => Error::Parse(e.to_string()),
            Error::Http(e) => Error::Streaming(e.to_string()),
            Error::Streaming(message) => Error::Streaming(message.clone()),
            Error::InvalidUri(uri) => Error::InvalidUri(uri.clone()),
            Error::Validation(message) => Error::Validation(message.clone()),
            Error::EmptyResponse => Error::EmptyResponse,
            Error::Auth(message) => Error::Auth(message.clone()),
            Error::Config(message) => Error::Config(message.clone()),
            Error::SessionBusy => Error::SessionBusy,
        }
    }
}
