//! Seed-image provider and the wrapper for backends that animate from a
//! first frame.

use std::sync::Arc;

use async_trait::async_trait;
use longcut_core::clip::MediaHandle;
use longcut_core::scene::AspectRatio;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::backend::{GeneratedMedia, GenerationRequest, VideoBackend};
use crate::error::BackendError;

/// Produces a still image from a prompt.
#[async_trait]
pub trait SeedImageProvider: Send + Sync {
    async fn seed_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle, BackendError>;
}

// ---------------------------------------------------------------------------
// HTTP provider
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SeedRequest<'a> {
    prompt: &'a str,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct SeedResponse {
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    image_base64: Option<String>,
}

/// MIME type assumed for inline seed images.
pub const SEED_IMAGE_MIME: &str = "image/png";

/// Seed images from a synchronous image-generation endpoint.
#[derive(Debug, Clone)]
pub struct HttpSeedImageProvider {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpSeedImageProvider {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }

    async fn request(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<MediaHandle, BackendError> {
        let mut builder = self.client.post(&self.endpoint).json(&SeedRequest {
            prompt,
            aspect_ratio: aspect_ratio.as_str(),
        });
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
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

        let parsed: SeedResponse = response.json().await?;
        match (parsed.image_url, parsed.image_base64) {
            (Some(url), _) => Ok(MediaHandle::url(url)),
            (None, Some(data)) => Ok(MediaHandle::Inline {
                mime_type: SEED_IMAGE_MIME.to_string(),
                data_base64: data,
            }),
            (None, None) => Err(BackendError::InvalidResponse(
                "seed image response carries no image".to_string(),
            )),
        }
    }
}

#[async_trait]
impl SeedImageProvider for HttpSeedImageProvider {
    async fn seed_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        cancel: &CancellationToken,
    ) -> Result<MediaHandle, BackendError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BackendError::Cancelled),
            result = self.request(prompt, aspect_ratio) => result,
        }
    }
}

// ---------------------------------------------------------------------------
// SeededBackend
// ---------------------------------------------------------------------------

/// Fetches a seed image before delegating to a backend that requires one.
///
/// Requests that already carry a seed image are passed through unchanged.
pub struct SeededBackend {
    inner: Arc<dyn VideoBackend>,
    seeds: Arc<dyn SeedImageProvider>,
}

impl SeededBackend {
    pub fn new(inner: Arc<dyn VideoBackend>, seeds: Arc<dyn SeedImageProvider>) -> Self {
        Self { inner, seeds }
    }
}

#[async_trait]
impl VideoBackend for SeededBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedMedia, BackendError> {
        if request.seed_image.is_some() {
            return self.inner.generate(request, cancel).await;
        }

        let seed = self
            .seeds
            .seed_image(&request.prompt, request.aspect_ratio, cancel)
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    e
                } else {
                    BackendError::SeedImage(e.to_string())
                }
            })?;

        tracing::debug!(
            backend = %self.inner.name(),
            scene_id = %request.scene_id,
            "Seed image ready",
        );

        let seeded = request.clone().with_seed_image(seed);
        self.inner.generate(&seeded, cancel).await
    }
}
