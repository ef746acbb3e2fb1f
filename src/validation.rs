//! Checks run on a request before any network call.

use crate::types::{Content, GenerateContentRequest, GenerationConfig, Part, MAX_TOP_K};
use crate::Error;

/// URI scheme accepted for file references.
pub const GCS_URI_PREFIX: &str = "gs://";

/// Validate a generate content request.
pub fn validate_request(request: &GenerateContentRequest) -> Result<(), Error> {
    validate_contents(&request.contents)?;
    if let Some(config) = &request.generation_config {
        check_generation_config(config);
    }
    Ok(())
}

/// Validate conversation contents.
pub fn validate_contents(contents: &[Content]) -> Result<(), Error> {
    if contents.is_empty() {
        return Err(Error::validation("contents must not be empty"));
    }

    for (idx, content) in contents.iter().enumerate() {
        if content.parts.is_empty() {
            return Err(Error::validation(format!(
                "contents[{idx}] must have at least one part"
            )));
        }
        for part in &content.parts {
            validate_part(part)?;
        }
    }

    Ok(())
}

fn validate_part(part: &Part) -> Result<(), Error> {
    match part {
        Part::FileData { file_data } if !file_data.file_uri.starts_with(GCS_URI_PREFIX) => {
            Err(Error::InvalidUri(file_data.file_uri.clone()))
        }
        Part::InlineData { inline_data } if inline_data.mime_type.is_empty() => Err(
            Error::validation("inline data requires a MIME type"),
        ),
        _ => Ok(()),
    }
}

/// Out-of-range `top_k` is not an error, it is left out of the request.
fn check_generation_config(config: &GenerationConfig) {
    if let Some(top_k) = config.top_k {
        if top_k > MAX_TOP_K {
            tracing::warn!(top_k, max = MAX_TOP_K, "top_k out of range, omitting it from the request");
        }
    }
}
