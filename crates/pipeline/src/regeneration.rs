//! Selective regeneration of flagged scenes.
//!
//! A flagged scene is retried with an alternate model from its preferred
//! list until its clip reaches the retry cap. The new clip replaces the old
//! one wholesale with the retry counter carried forward.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use longcut_core::clip::GeneratedClip;
use longcut_core::model_router::ModelRouter;
use longcut_core::request::LongVideoRequest;
use longcut_core::scene::Scene;
use longcut_core::types::SceneId;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::scheduler::ClipScheduler;

/// What happened to each flagged scene in one regeneration round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegenerationReport {
    /// Replaced by a successful clip.
    pub regenerated: Vec<SceneId>,
    /// Retried and failed again. The failed clip replaced the old one.
    pub failed: Vec<SceneId>,
    /// Skipped because the clip already reached the retry cap.
    pub exhausted: Vec<SceneId>,
}

impl RegenerationReport {
    /// Number of generation attempts made this round.
    pub fn attempted(&self) -> usize {
        self.regenerated.len() + self.failed.len()
    }
}

pub struct RegenerationManager {
    scheduler: Arc<ClipScheduler>,
    router: ModelRouter,
    max_retries: u32,
}

impl RegenerationManager {
    pub fn new(scheduler: Arc<ClipScheduler>, router: ModelRouter, max_retries: u32) -> Self {
        Self {
            scheduler,
            router,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Retry every flagged scene that is still under the cap.
    ///
    /// `scenes` and `clips` are matched by position, and a pair whose ids
    /// disagree is skipped. Each retried scene has its `model` overwritten
    /// with the alternate model. Attempts run concurrently in scheduler-sized
    /// batches separated by the scheduler's inter-batch delay; one failure
    /// never affects another scene. Once `cancel` fires, no further attempt
    /// starts and attempts interrupted by it leave the previous clip in place.
    pub async fn regenerate(
        &self,
        flagged: &[SceneId],
        scenes: &mut [Scene],
        clips: &mut [GeneratedClip],
        request: &LongVideoRequest,
        cancel: &CancellationToken,
    ) -> RegenerationReport {
        let mut report = RegenerationReport::default();
        let flagged: HashSet<&str> = flagged.iter().map(String::as_str).collect();

        let mut jobs: Vec<(usize, Scene)> = Vec::new();
        for (ci, current) in clips.iter().enumerate() {
            let id = &current.scene_id;
            if !flagged.contains(id.as_str()) {
                continue;
            }
            let Some(scene) = scenes.get_mut(ci).filter(|s| &s.id == id) else {
                tracing::warn!(scene_id = %id, "Flagged clip has no matching scene, skipping");
                continue;
            };

            if current.retry_count >= self.max_retries {
                tracing::warn!(
                    scene_id = %id,
                    retry_count = current.retry_count,
                    error = current.error.as_deref().unwrap_or(""),
                    "Retry cap reached, keeping last clip",
                );
                report.exhausted.push(id.clone());
                continue;
            }

            let alternate = self
                .router
                .alternate_model(scene.scene_type, &current.model_used);
            tracing::info!(
                scene_id = %id,
                from = %current.model_used,
                to = %alternate,
                attempt = current.retry_count + 1,
                "Regenerating scene",
            );
            scene.model = Some(alternate);
            jobs.push((ci, scene.clone()));
        }

        let delay = self.scheduler.inter_batch_delay();
        for (batch_index, batch) in jobs.chunks(self.scheduler.batch_size()).enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            if batch_index > 0 && !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let attempts = batch
                .iter()
                .map(|(_, scene)| self.scheduler.generate_scene(scene, request, cancel));
            let results = join_all(attempts).await;

            for ((ci, scene), mut clip) in batch.iter().zip(results) {
                if !clip.is_success() && cancel.is_cancelled() {
                    tracing::info!(scene_id = %scene.id, "Regeneration interrupted, keeping previous clip");
                    continue;
                }

                clip.retry_count = clips[*ci].retry_count + 1;
                if clip.is_success() {
                    report.regenerated.push(scene.id.clone());
                } else {
                    tracing::warn!(
                        scene_id = %scene.id,
                        retry_count = clip.retry_count,
                        error = clip.error.as_deref().unwrap_or(""),
                        "Regeneration failed",
                    );
                    report.failed.push(scene.id.clone());
                }
                clips[*ci] = clip;
            }
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
