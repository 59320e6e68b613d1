//! The dispatch contract every generative backend implements.

use async_trait::async_trait;
use longcut_core::clip::MediaHandle;
use longcut_core::scene::{AspectRatio, QualityTier};
use longcut_core::types::{ModelId, SceneId};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;

/// Everything a backend needs to render one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub scene_id: SceneId,
    pub model: ModelId,
    pub prompt: String,
    pub duration_secs: f64,
    pub resolution: QualityTier,
    pub aspect_ratio: AspectRatio,
    /// First frame to animate from, for models that need one.
    pub seed_image: Option<MediaHandle>,
}

impl GenerationRequest {
    /// `"WIDTHxHEIGHT"` for the requested tier and aspect ratio.
    pub fn resolution_string(&self) -> String {
        self.resolution.resolution_string(self.aspect_ratio)
    }

    pub fn with_seed_image(mut self, seed: MediaHandle) -> Self {
        self.seed_image = Some(seed);
        self
    }
}

/// Media returned by a successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMedia {
    pub media: MediaHandle,
    /// Duration reported by the backend, when it reports one.
    pub duration_secs: Option<f64>,
}

/// A generative video service.
///
/// Implementations must watch `cancel` and return
/// [`BackendError::Cancelled`] promptly once it fires, aborting the remote
/// job where the service allows it.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedMedia, BackendError>;
}
