//! [`VideoBackend`] over the submit-and-poll REST API.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::{GenerationApi, SubmitRequest};
use crate::backend::{GeneratedMedia, GenerationRequest, VideoBackend};
use crate::error::BackendError;
use crate::poll::{poll_job, PollConfig};

/// A generation service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpVideoBackend {
    name: String,
    api: GenerationApi,
    poll: PollConfig,
}

impl HttpVideoBackend {
    pub fn new(name: impl Into<String>, api: GenerationApi, poll: PollConfig) -> Self {
        Self {
            name: name.into(),
            api,
            poll,
        }
    }
}

#[async_trait]
impl VideoBackend for HttpVideoBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedMedia, BackendError> {
        let body = SubmitRequest::from(request);

        let job_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BackendError::Cancelled),
            result = self.api.submit(&body) => result?,
        };

        tracing::info!(
            backend = %self.name,
            scene_id = %request.scene_id,
            job_id = %job_id,
            "Generation job submitted",
        );

        poll_job(&self.api, &job_id, &self.poll, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use longcut_core::scene::{AspectRatio, QualityTier};

    use super::*;

    #[tokio::test]
    async fn cancelled_before_submit_never_calls_service() {
        let backend = HttpVideoBackend::new(
            "kling",
            GenerationApi::new("http://127.0.0.1:9", None),
            PollConfig::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = GenerationRequest {
            scene_id: "scene-001".to_string(),
            model: "kling".to_string(),
            prompt: "p".to_string(),
            duration_secs: 5.0,
            resolution: QualityTier::Hd1080,
            aspect_ratio: AspectRatio::Landscape,
            seed_image: None,
        };
        let result = backend.generate(&request, &cancel).await;
        assert_matches!(result, Err(BackendError::Cancelled));
        assert_eq!(backend.name(), "kling");
    }
}
