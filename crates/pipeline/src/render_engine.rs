//! The media engine that executes render plans.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use longcut_core::clip::MediaHandle;
use longcut_core::ffmpeg;
use longcut_core::render_plan::RenderPlan;

use crate::error::RenderError;

/// Executes render plans and returns a handle to the output.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn render(&self, plan: &RenderPlan) -> Result<MediaHandle, RenderError>;
}

// ---------------------------------------------------------------------------
// DryRunRenderEngine
// ---------------------------------------------------------------------------

/// Records every plan and returns its output path without rendering.
#[derive(Debug, Default)]
pub struct DryRunRenderEngine {
    plans: Mutex<Vec<RenderPlan>>,
}

impl DryRunRenderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans received so far, in submission order.
    pub fn plans(&self) -> Vec<RenderPlan> {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RenderEngine for DryRunRenderEngine {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn render(&self, plan: &RenderPlan) -> Result<MediaHandle, RenderError> {
        tracing::info!(
            kind = plan.kind.as_str(),
            inputs = plan.inputs.len(),
            operations = plan.operations.len(),
            output = %plan.output_path,
            "Dry-run render",
        );
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(plan.clone());
        Ok(MediaHandle::url(plan.output_path.clone()))
    }
}

// ---------------------------------------------------------------------------
// FfmpegRenderEngine
// ---------------------------------------------------------------------------

/// Runs plans through the system `ffmpeg` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegRenderEngine;

#[async_trait]
impl RenderEngine for FfmpegRenderEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn render(&self, plan: &RenderPlan) -> Result<MediaHandle, RenderError> {
        tracing::info!(
            kind = plan.kind.as_str(),
            inputs = plan.inputs.len(),
            output = %plan.output_path,
            "Running ffmpeg",
        );
        ffmpeg::run_plan(plan).await?;
        Ok(MediaHandle::url(plan.output_path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use longcut_core::render_plan::{build_enhance_plan, RenderInput};
    use longcut_core::scene::VideoStyle;

    use super::*;

    #[tokio::test]
    async fn dry_run_records_plans_and_returns_output_path() {
        let engine = DryRunRenderEngine::new();
        let plan = build_enhance_plan(
            RenderInput {
                source: "in.mp4".to_string(),
                duration_secs: 10.0,
            },
            VideoStyle::Documentary,
            "out/final.mp4",
        );

        let media = engine.render(&plan).await.unwrap();
        assert_eq!(media, MediaHandle::url("out/final.mp4"));
        assert_eq!(engine.plans(), vec![plan]);
    }
}
