//! Stitch, upscale and enhance passes over generated clips.
//!
//! Each pass builds a [`RenderPlan`] and hands it to the [`RenderEngine`].
//! Plan outputs are written under `{output_dir}/{run_id}/`.

use std::path::PathBuf;
use std::sync::Arc;

use longcut_core::clip::{GeneratedClip, MediaHandle};
use longcut_core::render_plan::{
    build_enhance_plan, build_interpolation_plan, build_stitch_plan, build_upscale_plan,
    plan_output_path, RenderInput, RenderPlan, RenderPlanKind,
};
use longcut_core::scene::{QualityTier, VideoStyle};
use longcut_core::tuning::PipelineTuning;

use crate::error::PipelineError;
use crate::render_engine::RenderEngine;

/// Output of one assembly pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMedia {
    pub media: MediaHandle,
    pub duration_secs: f64,
}

impl RenderedMedia {
    fn as_input(&self) -> RenderInput {
        RenderInput {
            source: self.media.as_source(),
            duration_secs: self.duration_secs,
        }
    }
}

pub struct AssemblyPipeline {
    engine: Arc<dyn RenderEngine>,
    output_dir: PathBuf,
    crossfade_secs: f64,
    interpolation_fps: u32,
}

impl AssemblyPipeline {
    pub fn new(engine: Arc<dyn RenderEngine>, output_dir: impl Into<PathBuf>, tuning: &PipelineTuning) -> Self {
        Self {
            engine,
            output_dir: output_dir.into(),
            crossfade_secs: tuning.crossfade_secs,
            interpolation_fps: tuning.interpolation_fps,
        }
    }

    /// Crossfade every clip that has media into one timeline.
    ///
    /// Fails when no clip has media.
    pub async fn stitch(
        &self,
        run_id: &str,
        clips: &[GeneratedClip],
    ) -> Result<RenderedMedia, PipelineError> {
        let output = plan_output_path(&self.output_dir, run_id, RenderPlanKind::Stitch);
        let plan = build_stitch_plan(clips, self.crossfade_secs, output)
            .map_err(PipelineError::Assembly)?;
        self.render(plan).await
    }

    /// Scale to `tier` and interpolate to the target frame rate.
    ///
    /// Returns `None` for tiers that need no scaling.
    pub async fn upscale(
        &self,
        run_id: &str,
        input: &RenderedMedia,
        tier: QualityTier,
    ) -> Result<Option<RenderedMedia>, PipelineError> {
        let output = plan_output_path(&self.output_dir, run_id, RenderPlanKind::Upscale);
        let Some(scale) = build_upscale_plan(input.as_input(), tier, output) else {
            tracing::debug!(run_id, tier = tier.as_str(), "No upscale needed");
            return Ok(None);
        };
        let scaled = self.render(scale).await?;

        let output = plan_output_path(&self.output_dir, run_id, RenderPlanKind::Interpolate);
        let interpolate = build_interpolation_plan(scaled.as_input(), self.interpolation_fps, output);
        self.render(interpolate).await.map(Some)
    }

    /// Apply the style grading chain plus denoise and sharpen.
    pub async fn enhance(
        &self,
        run_id: &str,
        input: &RenderedMedia,
        style: VideoStyle,
    ) -> Result<RenderedMedia, PipelineError> {
        let output = plan_output_path(&self.output_dir, run_id, RenderPlanKind::Enhance);
        self.render(build_enhance_plan(input.as_input(), style, output))
            .await
    }

    async fn render(&self, plan: RenderPlan) -> Result<RenderedMedia, PipelineError> {
        tracing::info!(
            engine = self.engine.name(),
            kind = plan.kind.as_str(),
            output = %plan.output_path,
            "Submitting render plan",
        );
        let media = self.engine.render(&plan).await?;
        Ok(RenderedMedia {
            media,
            duration_secs: plan.duration_secs,
        })
    }
}
