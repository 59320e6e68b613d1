//! Batched parallel clip generation.
//!
//! Scenes are dispatched in fixed-size batches. Every job in a batch runs
//! concurrently and the batch ends only when all of them have finished.
//! A job never fails the batch: backend errors and panics become failed
//! clips. A fixed delay separates consecutive batches.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use longcut_backends::{BackendRegistry, GenerationRequest};
use longcut_core::clip::GeneratedClip;
use longcut_core::model_registry::ModelRegistry;
use longcut_core::request::LongVideoRequest;
use longcut_core::scene::{QualityTier, Scene};
use longcut_core::tuning::PipelineTuning;
use longcut_core::types::SceneId;
use tokio_util::sync::CancellationToken;

/// Error recorded on clips that were never dispatched because the run was
/// cancelled.
pub const CANCELLED_ERROR: &str = "Generation cancelled";

/// Progress notifications from [`ClipScheduler::generate`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    BatchStarted {
        batch_index: usize,
        batch_count: usize,
        scene_ids: Vec<SceneId>,
    },
    BatchCompleted {
        completed_clips: usize,
        total_clips: usize,
    },
}

// ---------------------------------------------------------------------------
// ClipScheduler
// ---------------------------------------------------------------------------

pub struct ClipScheduler {
    backends: Arc<BackendRegistry>,
    models: Arc<ModelRegistry>,
    batch_size: usize,
    inter_batch_delay: Duration,
}

impl ClipScheduler {
    pub fn new(
        backends: Arc<BackendRegistry>,
        models: Arc<ModelRegistry>,
        tuning: &PipelineTuning,
    ) -> Self {
        Self {
            backends,
            models,
            batch_size: tuning.batch_size.max(1),
            inter_batch_delay: tuning.inter_batch_delay(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Pause between consecutive batches.
    pub fn inter_batch_delay(&self) -> Duration {
        self.inter_batch_delay
    }

    /// Generate one clip per scene, in scene order.
    ///
    /// Once `cancel` fires no further batch is dispatched; in-flight jobs see
    /// the cancellation through their own child token. Scenes that were never
    /// dispatched get a failed clip carrying [`CANCELLED_ERROR`], so the
    /// output always has one clip per input scene.
    pub async fn generate<F>(
        &self,
        scenes: &[Scene],
        request: &LongVideoRequest,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Vec<GeneratedClip>
    where
        F: FnMut(SchedulerEvent),
    {
        let total_clips = scenes.len();
        let batch_count = total_clips.div_ceil(self.batch_size);
        let mut clips = Vec::with_capacity(total_clips);

        for (batch_index, batch) in scenes.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            if batch_index > 0 && !self.inter_batch_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.inter_batch_delay) => {}
                }
            }

            tracing::info!(
                batch_index,
                batch_count,
                batch_len = batch.len(),
                "Dispatching generation batch",
            );
            on_event(SchedulerEvent::BatchStarted {
                batch_index,
                batch_count,
                scene_ids: batch.iter().map(|s| s.id.clone()).collect(),
            });

            let jobs = batch
                .iter()
                .map(|scene| self.generate_scene(scene, request, cancel));
            clips.extend(join_all(jobs).await);

            on_event(SchedulerEvent::BatchCompleted {
                completed_clips: clips.len(),
                total_clips,
            });
        }

        if clips.len() < total_clips {
            tracing::warn!(
                dispatched = clips.len(),
                total_clips,
                "Generation cancelled before every batch was dispatched",
            );
            for scene in &scenes[clips.len()..] {
                let (model, resolution) = self.target_for(scene);
                clips.push(GeneratedClip::failed(scene, model, resolution, CANCELLED_ERROR));
            }
        }

        clips
    }

    /// Run a single generation job. Never fails: errors are captured on the
    /// returned clip.
    pub async fn generate_scene(
        &self,
        scene: &Scene,
        request: &LongVideoRequest,
        cancel: &CancellationToken,
    ) -> GeneratedClip {
        let requested = scene
            .model
            .clone()
            .unwrap_or_else(|| self.models.default_model().to_string());
        let (model, backend) = self.backends.resolve(&requested);
        let caps = self.models.get_or_default(&model);

        let job = GenerationRequest {
            scene_id: scene.id.clone(),
            model: model.clone(),
            prompt: scene.prompt.clone(),
            duration_secs: scene.duration_secs.min(caps.max_duration_secs),
            resolution: request.quality.min(caps.max_resolution),
            aspect_ratio: request.aspect_ratio,
            seed_image: None,
        };

        let job_cancel = cancel.child_token();
        let started = Instant::now();
        let outcome = AssertUnwindSafe(backend.generate(&job, &job_cancel))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let error = match outcome {
            Ok(Ok(generated)) => {
                tracing::debug!(
                    scene_id = %scene.id,
                    model = %model,
                    elapsed_ms,
                    "Clip generated",
                );
                return GeneratedClip {
                    scene_id: scene.id.clone(),
                    scene_index: scene.index,
                    media: Some(generated.media),
                    model_used: model,
                    duration_secs: generated.duration_secs.unwrap_or(job.duration_secs),
                    resolution: caps.max_resolution,
                    quality_score: caps.quality_score,
                    continuity_score: None,
                    generation_time_ms: elapsed_ms,
                    retry_count: 0,
                    error: None,
                };
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("Backend '{}' panicked", backend.name()),
        };

        tracing::warn!(
            scene_id = %scene.id,
            model = %model,
            error = %error,
            "Clip generation failed",
        );
        let mut clip = GeneratedClip::failed(scene, model, caps.max_resolution, error);
        clip.generation_time_ms = elapsed_ms;
        clip
    }

    fn target_for(&self, scene: &Scene) -> (String, QualityTier) {
        let requested = scene
            .model
            .as_deref()
            .unwrap_or_else(|| self.models.default_model());
        let caps = self.models.get_or_default(requested);
        (caps.id.clone(), caps.max_resolution)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
