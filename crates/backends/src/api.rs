//! REST client for a submit-and-poll video generation service.
//!
//! Every backend exposes the same three endpoints:
//!
//! - `POST {base}/generations` queues a job and returns its id.
//! - `GET {base}/generations/{id}` reports job state and, once done, the
//!   resulting media.
//! - `POST {base}/generations/{id}/cancel` aborts a job.

use longcut_core::clip::MediaHandle;
use serde::{Deserialize, Serialize};

use crate::backend::{GeneratedMedia, GenerationRequest};
use crate::error::BackendError;

/// MIME type assumed for inline video payloads.
pub const INLINE_VIDEO_MIME: &str = "video/mp4";

/// HTTP client for a single generation service.
#[derive(Debug, Clone)]
pub struct GenerationApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /generations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRequest {
    pub model: String,
    pub prompt: String,
    pub duration: f64,
    pub resolution: String,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&GenerationRequest> for SubmitRequest {
    fn from(req: &GenerationRequest) -> Self {
        Self {
            model: req.model.clone(),
            prompt: req.prompt.clone(),
            duration: req.duration_secs,
            resolution: req.resolution_string(),
            aspect_ratio: req.aspect_ratio.as_str().to_string(),
            image_url: req.seed_image.as_ref().map(MediaHandle::as_source),
        }
    }
}

/// Response of `POST /generations`.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned job identifier.
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[serde(alias = "pending")]
    Queued,
    #[serde(alias = "running")]
    Processing,
    #[serde(alias = "succeeded")]
    Completed,
    Failed,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Response of `GET /generations/{id}`.
#[derive(Debug, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobState,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_base64: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatusResponse {
    /// Convert a finished job into media, or the error it reported.
    pub fn into_media(self) -> Result<GeneratedMedia, BackendError> {
        match self.status {
            JobState::Completed => {
                let media = match (self.video_url, self.video_base64) {
                    (Some(url), _) => MediaHandle::url(url),
                    (None, Some(data)) => MediaHandle::Inline {
                        mime_type: INLINE_VIDEO_MIME.to_string(),
                        data_base64: data,
                    },
                    (None, None) => {
                        return Err(BackendError::InvalidResponse(
                            "completed job carries no video".to_string(),
                        ))
                    }
                };
                Ok(GeneratedMedia {
                    media,
                    duration_secs: self.duration,
                })
            }
            JobState::Failed => Err(BackendError::Generation(
                self.error
                    .unwrap_or_else(|| "backend reported failure".to_string()),
            )),
            JobState::Cancelled => Err(BackendError::Cancelled),
            state => Err(BackendError::InvalidResponse(format!(
                "job is still {state:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl GenerationApi {
    /// Create a client for a service.
    ///
    /// * `base_url` - e.g. `https://api.example.com/v1`.
    /// * `token` - optional bearer credential sent on every request.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Create a client reusing an existing [`reqwest::Client`] (shared
    /// connection pool and request timeout across backends).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Queue a generation job. Returns the server-assigned job id.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<String, BackendError> {
        let response = self
            .authorized(self.client.post(format!("{}/generations", self.base_url)))
            .json(request)
            .send()
            .await?;

        let submitted: SubmitResponse = Self::parse_response(response).await?;
        Ok(submitted.id)
    }

    /// Fetch the current state of a job.
    pub async fn status(&self, job_id: &str) -> Result<JobStatusResponse, BackendError> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/generations/{}", self.base_url, job_id)),
            )
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ask the service to abort a queued or running job.
    pub async fn cancel(&self, job_id: &str) -> Result<(), BackendError> {
        let response = self
            .authorized(
                self.client
                    .post(format!("{}/generations/{}/cancel", self.base_url, job_id)),
            )
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`BackendError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), BackendError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
