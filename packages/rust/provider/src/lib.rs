//! HTTP-backed implementations of the collaborator ports.
//!
//! Talks to the content-index / generation service over JSON. The pipeline
//! only sees the `ContentIndex` and `GenerationProvider` traits; these
//! clients are wired in by the CLI.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use draftmill_core::ports::{
    CompletionStatus, ContentIndex, GenerationOutput, GenerationProvider, IndexCounts,
};
use draftmill_shared::{DraftmillError, Result};

/// User-Agent string for service requests.
const USER_AGENT: &str = concat!("Draftmill/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout. The generation call is the slow one; the service is
/// expected to hold the request open until the provider run finishes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IndexStatusResponse {
    in_progress_count: u64,
    completed_count: u64,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    subject_title: &'a str,
    index_id: &'a str,
    instructions: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    status: String,
    #[serde(default)]
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Service client
// ---------------------------------------------------------------------------

/// Shared HTTP plumbing for both collaborator clients.
#[derive(Clone, Debug)]
struct ServiceClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ServiceClient {
    fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| DraftmillError::config(format!("invalid service URL '{base_url}': {e}")))?;
        // Url::join treats a path without a trailing slash as a file.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DraftmillError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DraftmillError::config(format!("invalid endpoint '{path}': {e}")))
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

/// Map a non-success HTTP status to a network error.
fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(DraftmillError::Network(format!("{what}: HTTP {status}")));
    }
    Ok(response)
}

// ---------------------------------------------------------------------------
// Content index client
// ---------------------------------------------------------------------------

/// [`ContentIndex`] over `GET {base}/indexes/{id}/status`.
#[derive(Clone, Debug)]
pub struct HttpContentIndex {
    service: ServiceClient,
}

impl HttpContentIndex {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            service: ServiceClient::new(base_url, api_key)?,
        })
    }
}

#[async_trait]
impl ContentIndex for HttpContentIndex {
    #[instrument(skip(self))]
    async fn status(&self, index_id: &str) -> Result<IndexCounts> {
        let url = self.service.endpoint(&format!("indexes/{index_id}/status"))?;

        let response = self
            .service
            .request(self.service.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| DraftmillError::Network(format!("{url}: {e}")))?;
        let response = check_status(response, "index status")?;

        let body: IndexStatusResponse = response
            .json()
            .await
            .map_err(|e| DraftmillError::Network(format!("invalid index status response: {e}")))?;

        debug!(
            in_progress = body.in_progress_count,
            completed = body.completed_count,
            "index status fetched"
        );

        Ok(IndexCounts {
            in_progress: body.in_progress_count,
            completed: body.completed_count,
        })
    }
}

// ---------------------------------------------------------------------------
// Generation provider client
// ---------------------------------------------------------------------------

/// [`GenerationProvider`] over `POST {base}/generate`.
#[derive(Clone)]
pub struct HttpGenerationProvider {
    service: ServiceClient,
}

impl HttpGenerationProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            service: ServiceClient::new(base_url, api_key)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    #[instrument(skip(self, instructions))]
    async fn generate(
        &self,
        subject_title: &str,
        index_id: &str,
        instructions: &str,
    ) -> Result<GenerationOutput> {
        let url = self.service.endpoint("generate")?;

        let response = self
            .service
            .request(self.service.client.post(url.clone()))
            .json(&GenerateRequest {
                subject_title,
                index_id,
                instructions,
            })
            .send()
            .await
            .map_err(|e| DraftmillError::Network(format!("{url}: {e}")))?;
        let response = check_status(response, "generate")?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DraftmillError::Network(format!("invalid generate response: {e}")))?;

        debug!(status = %body.status, has_text = body.text.is_some(), "generation response");

        let status = match body.status.as_str() {
            "completed" => CompletionStatus::Completed,
            other => CompletionStatus::Failed(other.to_string()),
        };

        Ok(GenerationOutput {
            status,
            text: body.text,
        })
    }
}
