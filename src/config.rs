use std::env;
use std::time::Duration;

use crate::Error;

/// Region used when `GOOGLE_CLOUD_REGION` is not set.
pub const DEFAULT_LOCATION: &str = "us-central1";
/// HTTP timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for Vertex AI.
#[derive(Clone)]
pub struct VertexConfig {
    /// GCP project ID.
    pub project: String,
    /// GCP region (e.g., "us-central1", "europe-west1").
    pub location: String,
    /// Overrides the regional endpoint; with or without a scheme.
    pub api_endpoint: Option<String>,
    /// Fixed bearer token. Application Default Credentials are used when absent.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for VertexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexConfig")
            .field("project", &self.project)
            .field("location", &self.location)
            .field("api_endpoint", &self.api_endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| ".."))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl VertexConfig {
    /// Create configuration for a project and region.
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            api_endpoint: None,
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create configuration from environment variables.
    ///
    /// * `GOOGLE_CLOUD_PROJECT` (required)
    /// * `GOOGLE_CLOUD_REGION` (default `us-central1`)
    /// * `VERTEX_AI_ENDPOINT`
    /// * `VERTEX_ACCESS_TOKEN`
    /// * `VERTEX_AI_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let project = lookup("GOOGLE_CLOUD_PROJECT").ok_or_else(|| {
            Error::config("GOOGLE_CLOUD_PROJECT environment variable is required")
        })?;
        let location =
            lookup("GOOGLE_CLOUD_REGION").unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        let mut config = Self::new(project, location);
        config.api_endpoint = lookup("VERTEX_AI_ENDPOINT");
        config.access_token = lookup("VERTEX_ACCESS_TOKEN");

        if let Some(secs) = lookup("VERTEX_AI_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::config(format!("VERTEX_AI_TIMEOUT_SECS must be an integer, got '{secs}'"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.project.trim().is_empty() {
            return Err(Error::config("project must not be empty"));
        }
        if self.location.trim().is_empty() {
            return Err(Error::config("location must not be empty"));
        }
        Ok(())
    }

    /// Base URL requests are sent to, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.api_endpoint {
            Some(endpoint) if endpoint.starts_with("http://") || endpoint.starts_with("https://") => {
                endpoint.trim_end_matches('/').to_string()
            }
            Some(endpoint) => format!("https://{}", endpoint.trim_end_matches('/')),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        }
    }
}
