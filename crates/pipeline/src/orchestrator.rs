//! End-to-end orchestration of one long-form video run.
//!
//! Stages run strictly in sequence: plan, route, generate, analyze
//! continuity, regenerate flagged scenes, stitch, upscale, enhance. Every
//! stage transition updates the step history and is published on the
//! [`EventBus`]. A stage error halts the run and still yields a
//! [`LongVideoResult`] carrying the steps and clips produced so far.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use longcut_backends::BackendRegistry;
use longcut_core::clip::{ClipStats, GeneratedClip};
use longcut_core::continuity::{ContinuityAnalyzer, ContinuityReport};
use longcut_core::error::CoreError;
use longcut_core::model_registry::ModelRegistry;
use longcut_core::model_router::{ModelRouter, RoutingWeights};
use longcut_core::request::{LongVideoRequest, LongVideoResult};
use longcut_core::scene::Scene;
use longcut_core::scene_planner::{SceneClassifier, ScenePlanner};
use longcut_core::step::{
    percent, STEP_CONTINUITY, STEP_ENHANCEMENT, STEP_GENERATION, STEP_PLANNING,
    STEP_REGENERATION, STEP_ROUTING, STEP_STITCHING, STEP_UPSCALING,
};
use longcut_core::tuning::PipelineTuning;
use longcut_core::types::SceneId;
use longcut_events::{EventBus, OrchestrationEvent, PipelineEvent, RunSummary};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::assembly::{AssemblyPipeline, RenderedMedia};
use crate::error::PipelineError;
use crate::regeneration::RegenerationManager;
use crate::render_engine::RenderEngine;
use crate::scheduler::{ClipScheduler, SchedulerEvent};
use crate::steps::StepTracker;

/// A stage error tagged with the step it happened in.
struct StageFailure {
    step: &'static str,
    error: PipelineError,
}

impl StageFailure {
    fn at(step: &'static str) -> impl FnOnce(PipelineError) -> Self {
        move |error| Self { step, error }
    }
}

/// Mutable state of one run, owned by a single `run` call.
struct RunState {
    run_id: String,
    steps: StepTracker,
    scenes: Vec<Scene>,
    clips: Vec<GeneratedClip>,
    regenerated: BTreeSet<SceneId>,
    exhausted: BTreeSet<SceneId>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    planner: ScenePlanner,
    router: ModelRouter,
    scheduler: Arc<ClipScheduler>,
    analyzer: ContinuityAnalyzer,
    regeneration: RegenerationManager,
    assembly: AssemblyPipeline,
    tuning: PipelineTuning,
    bus: Arc<EventBus>,
}

impl Orchestrator {
    /// Wire every stage from shared registries and tuning.
    pub fn new(
        models: Arc<ModelRegistry>,
        backends: Arc<BackendRegistry>,
        engine: Arc<dyn RenderEngine>,
        output_dir: impl Into<PathBuf>,
        tuning: PipelineTuning,
        bus: Arc<EventBus>,
    ) -> Result<Self, CoreError> {
        tuning.validate()?;

        let planner = ScenePlanner::new(SceneClassifier::default(), tuning.clip_duration_secs)
            .with_min_scene_secs(tuning.crossfade_secs);
        let router = ModelRouter::new(Arc::clone(&models), RoutingWeights::from(&tuning));
        let scheduler = Arc::new(ClipScheduler::new(backends, models, &tuning));
        let regeneration =
            RegenerationManager::new(Arc::clone(&scheduler), router.clone(), tuning.max_retries);

        Ok(Self {
            planner,
            router,
            scheduler,
            analyzer: ContinuityAnalyzer::from_tuning(&tuning)?,
            regeneration,
            assembly: AssemblyPipeline::new(engine, output_dir, &tuning),
            tuning,
            bus,
        })
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Run the full pipeline for `request`.
    ///
    /// Always returns a result. Cancelling `cancel` stops further batch
    /// dispatch, aborts in-flight jobs, and ends the run with a failed result
    /// that keeps every clip completed so far.
    pub async fn run(&self, request: LongVideoRequest, cancel: CancellationToken) -> LongVideoResult {
        let started = Instant::now();
        let run_id = Uuid::now_v7().to_string();
        let mut state = RunState {
            run_id: run_id.clone(),
            steps: StepTracker::new(run_id.clone(), Arc::clone(&self.bus)),
            scenes: Vec::new(),
            clips: Vec::new(),
            regenerated: BTreeSet::new(),
            exhausted: BTreeSet::new(),
        };

        tracing::info!(
            run_id = %run_id,
            title = %request.title,
            total_duration_secs = request.total_duration_secs,
            quality = request.quality.as_str(),
            "Orchestration started",
        );
        self.publish(
            &run_id,
            OrchestrationEvent::OrchestrationStarted {
                title: request.title.clone(),
                total_duration_secs: request.total_duration_secs,
            },
        );

        let outcome = self.execute(&request, &mut state, &cancel).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(video) => {
                let stats = ClipStats::from_clips(&state.clips);
                let summary = RunSummary {
                    total_clips: stats.total_clips,
                    successful_clips: stats.successful_clips,
                    failed_clips: stats.failed_clips,
                    regenerated_clips: state.regenerated.len(),
                    exhausted_clips: state.exhausted.len(),
                    average_quality: stats.average_quality,
                    duration_secs: video.duration_secs,
                    elapsed_ms,
                };
                tracing::info!(
                    run_id = %run_id,
                    successful = summary.successful_clips,
                    failed = summary.failed_clips,
                    regenerated = summary.regenerated_clips,
                    elapsed_ms,
                    "Orchestration completed",
                );
                self.publish(&run_id, OrchestrationEvent::OrchestrationCompleted { summary });

                LongVideoResult::from_run(
                    run_id,
                    Some(video.media),
                    video.duration_secs,
                    request.quality,
                    elapsed_ms,
                    state.steps.into_steps(),
                    state.clips,
                    None,
                )
            }
            Err(StageFailure { step, error }) => {
                let message = error.to_string();
                tracing::error!(run_id = %run_id, step, error = %message, "Orchestration failed");
                state.steps.fail(step, message.clone());
                self.publish(
                    &run_id,
                    OrchestrationEvent::OrchestrationFailed {
                        error: message.clone(),
                        step: step.to_string(),
                    },
                );

                LongVideoResult::from_run(
                    run_id,
                    None,
                    0.0,
                    request.quality,
                    elapsed_ms,
                    state.steps.into_steps(),
                    state.clips,
                    Some(message),
                )
            }
        }
    }

    async fn execute(
        &self,
        request: &LongVideoRequest,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> Result<RenderedMedia, StageFailure> {
        // -- plan -------------------------------------------------------------
        state.steps.start(STEP_PLANNING);
        request
            .validate(self.tuning.max_total_duration_secs)
            .map_err(PipelineError::InvalidRequest)
            .map_err(StageFailure::at(STEP_PLANNING))?;
        let scenes = self.planner.plan(request);
        state
            .steps
            .complete(STEP_PLANNING, format!("{} scenes planned", scenes.len()));

        // -- route ------------------------------------------------------------
        state.steps.start(STEP_ROUTING);
        state.scenes = self.router.route(scenes);
        state.steps.complete(
            STEP_ROUTING,
            format!("{} scenes assigned", state.scenes.len()),
        );

        // -- generate ---------------------------------------------------------
        self.generate(request, state, cancel).await?;

        // -- continuity and regeneration --------------------------------------
        self.analyze_and_regenerate(request, state, cancel).await?;

        // -- assemble ---------------------------------------------------------
        Self::ensure_active(cancel, STEP_STITCHING)?;
        state.steps.start(STEP_STITCHING);
        let stitched = self
            .assembly
            .stitch(&state.run_id, &state.clips)
            .await
            .map_err(StageFailure::at(STEP_STITCHING))?;
        state.steps.complete(
            STEP_STITCHING,
            format!("{:.1}s timeline", stitched.duration_secs),
        );

        Self::ensure_active(cancel, STEP_UPSCALING)?;
        state.steps.start(STEP_UPSCALING);
        let upscaled = self
            .assembly
            .upscale(&state.run_id, &stitched, request.quality)
            .await
            .map_err(StageFailure::at(STEP_UPSCALING))?;
        let base = match upscaled {
            Some(media) => {
                state.steps.complete(
                    STEP_UPSCALING,
                    format!(
                        "x{} to {}",
                        request.quality.upscale_factor(),
                        request.quality.as_str()
                    ),
                );
                media
            }
            None => {
                state.steps.complete(
                    STEP_UPSCALING,
                    format!("skipped for {}", request.quality.as_str()),
                );
                stitched
            }
        };

        Self::ensure_active(cancel, STEP_ENHANCEMENT)?;
        state.steps.start(STEP_ENHANCEMENT);
        let style = request.style;
        let enhanced = self
            .assembly
            .enhance(&state.run_id, &base, style)
            .await
            .map_err(StageFailure::at(STEP_ENHANCEMENT))?;
        state
            .steps
            .complete(STEP_ENHANCEMENT, format!("{style:?} grading applied"));

        Ok(enhanced)
    }

    async fn generate(
        &self,
        request: &LongVideoRequest,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> Result<(), StageFailure> {
        state.steps.start(STEP_GENERATION);

        let run_id = state.run_id.clone();
        let steps = &mut state.steps;
        let clips = self
            .scheduler
            .generate(&state.scenes, request, cancel, |event| match event {
                SchedulerEvent::BatchStarted {
                    batch_index,
                    batch_count,
                    scene_ids,
                } => self.publish(
                    &run_id,
                    OrchestrationEvent::BatchStarted {
                        batch_index,
                        batch_count,
                        scene_ids,
                    },
                ),
                SchedulerEvent::BatchCompleted {
                    completed_clips,
                    total_clips,
                } => steps.progress(
                    STEP_GENERATION,
                    percent(completed_clips, total_clips),
                    format!("{completed_clips}/{total_clips} clips"),
                ),
            })
            .await;
        state.clips = clips;

        if cancel.is_cancelled() {
            self.publish_generation_cancelled(state);
            return Err(StageFailure {
                step: STEP_GENERATION,
                error: PipelineError::Cancelled,
            });
        }

        let successful = state.clips.iter().filter(|c| c.is_success()).count();
        let total = state.clips.len();

        state.steps.complete(
            STEP_GENERATION,
            format!("{successful}/{total} clips generated"),
        );
        Ok(())
    }

    /// Analyze, then regenerate flagged scenes round by round until nothing
    /// is flagged or every flagged scene has reached the retry cap. The
    /// last analysis always reflects the final clip list.
    async fn analyze_and_regenerate(
        &self,
        request: &LongVideoRequest,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> Result<(), StageFailure> {
        state.steps.start(STEP_CONTINUITY);
        let mut report = self.analyzer.analyze(&mut state.clips);
        state.steps.complete(STEP_CONTINUITY, continuity_detail(&report));

        state.steps.start(STEP_REGENERATION);
        let mut round = 0u32;
        while report.needs_regeneration() {
            self.ensure_regeneration_active(state, cancel)?;
            round += 1;
            state.steps.progress(
                STEP_REGENERATION,
                0,
                format!("round {round}: {} flagged", report.low_confidence.len()),
            );

            let outcome = self
                .regeneration
                .regenerate(
                    &report.low_confidence,
                    &mut state.scenes,
                    &mut state.clips,
                    request,
                    cancel,
                )
                .await;
            state.exhausted = outcome.exhausted.iter().cloned().collect();
            state.regenerated.extend(outcome.regenerated.iter().cloned());
            state.regenerated.extend(outcome.failed.iter().cloned());

            if outcome.attempted() == 0 {
                break;
            }
            report = self.analyzer.analyze(&mut state.clips);
            state.steps.complete(STEP_CONTINUITY, continuity_detail(&report));
        }
        self.ensure_regeneration_active(state, cancel)?;

        let detail = if round == 0 {
            "no scenes flagged".to_string()
        } else {
            format!(
                "{} scenes regenerated over {round} rounds, {} at retry cap",
                state.regenerated.len(),
                state.exhausted.len()
            )
        };
        state.steps.complete(STEP_REGENERATION, detail);
        Ok(())
    }

    /// Like [`Self::ensure_active`], and also reports the aborted generation
    /// work on the bus.
    fn ensure_regeneration_active(
        &self,
        state: &RunState,
        cancel: &CancellationToken,
    ) -> Result<(), StageFailure> {
        Self::ensure_active(cancel, STEP_REGENERATION).inspect_err(|_| {
            self.publish_generation_cancelled(state);
        })
    }

    fn publish_generation_cancelled(&self, state: &RunState) {
        let completed_clips = state.clips.iter().filter(|c| c.is_success()).count();
        let total_clips = state.clips.len();
        tracing::warn!(
            run_id = %state.run_id,
            completed_clips,
            total_clips,
            "Generation cancelled",
        );
        self.publish(
            &state.run_id,
            OrchestrationEvent::GenerationCancelled {
                completed_clips,
                total_clips,
            },
        );
    }

    fn ensure_active(cancel: &CancellationToken, step: &'static str) -> Result<(), StageFailure> {
        if cancel.is_cancelled() {
            return Err(StageFailure {
                step,
                error: PipelineError::Cancelled,
            });
        }
        Ok(())
    }

    fn publish(&self, run_id: &str, event: OrchestrationEvent) {
        self.bus.publish(PipelineEvent::new(run_id, event));
    }
}

fn continuity_detail(report: &ContinuityReport) -> String {
    format!(
        "average {:.1}, {} flagged",
        report.average_score,
        report.low_confidence.len()
    )
}
