//! Integration tests for the orchestrator with fake backends and the dry-run
//! render engine.
//!
//! Covers the full stage sequence, partial generation failure, the retry
//! cap, assembly failure and cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use longcut_backends::{BackendError, BackendRegistry, GeneratedMedia, GenerationRequest, VideoBackend};
use longcut_core::clip::MediaHandle;
use longcut_core::model_registry::{ModelRegistry, MODEL_KLING};
use longcut_core::render_plan::RenderPlanKind;
use longcut_core::request::LongVideoRequest;
use longcut_core::scene::{AspectRatio, QualityTier, Scene, SceneType, VideoStyle};
use longcut_core::step::{
    StepStatus, ALL_STEPS, STEP_GENERATION, STEP_PLANNING, STEP_REGENERATION, STEP_STITCHING,
};
use longcut_core::tuning::PipelineTuning;
use longcut_events::{EventBus, OrchestrationEvent, PipelineEvent};
use longcut_pipeline::{DryRunRenderEngine, Orchestrator};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Fails every request for the listed scene ids; records every request.
struct FakeBackend {
    failing: Vec<String>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl FakeBackend {
    fn new(failing: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            failing: Vec::new(),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }
}

#[async_trait]
impl VideoBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedMedia, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(BackendError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
        if self.failing.contains(&request.scene_id) {
            return Err(BackendError::Generation(format!(
                "{} rejected the prompt",
                request.model
            )));
        }
        Ok(GeneratedMedia {
            media: MediaHandle::url(format!(
                "https://cdn.test/{}/{}.mp4",
                request.model, request.scene_id
            )),
            duration_secs: Some(request.duration_secs),
        })
    }
}

struct Harness {
    orchestrator: Orchestrator,
    backend: Arc<FakeBackend>,
    engine: Arc<DryRunRenderEngine>,
    events: broadcast::Receiver<PipelineEvent>,
}

fn harness(backend: Arc<FakeBackend>, tuning: PipelineTuning) -> Harness {
    let models = Arc::new(ModelRegistry::builtin());
    let mut backends = BackendRegistry::new(MODEL_KLING, backend.clone());
    for caps in models.models() {
        backends.register(caps.id.clone(), backend.clone());
    }
    let engine = Arc::new(DryRunRenderEngine::new());
    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();

    let orchestrator = Orchestrator::new(
        models,
        Arc::new(backends),
        engine.clone(),
        "/tmp/longcut-test",
        tuning,
        bus,
    )
    .expect("valid tuning");

    Harness {
        orchestrator,
        backend,
        engine,
        events,
    }
}

fn fast_tuning() -> PipelineTuning {
    PipelineTuning {
        inter_batch_delay_ms: 0,
        ..Default::default()
    }
}

fn request(total_duration_secs: f64) -> LongVideoRequest {
    LongVideoRequest {
        title: "Harbour Morning".to_string(),
        description: "Fishermen prepare their boats as the town wakes up".to_string(),
        script: None,
        total_duration_secs,
        style: VideoStyle::Cinematic,
        aspect_ratio: AspectRatio::Landscape,
        quality: QualityTier::Hd1080,
        scenes: None,
    }
}

fn drain(rx: &mut broadcast::Receiver<PipelineEvent>) -> Vec<OrchestrationEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e.event);
    }
    events
}

// ---------------------------------------------------------------------------
// Test: three scenes, all succeed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fifteen_seconds_yields_three_clips_and_two_crossfades() {
    let mut h = harness(FakeBackend::new(&[]), fast_tuning());

    let result = h
        .orchestrator
        .run(request(15.0), CancellationToken::new())
        .await;

    assert!(result.success, "run failed: {:?}", result.error);
    assert_eq!(result.total_clips, 3);
    assert_eq!(result.successful_clips, 3);
    assert_eq!(result.failed_clips, 0);
    assert!(result.clips.iter().all(|c| c.retry_count == 0));
    assert!(result
        .clips
        .iter()
        .all(|c| c.continuity_score.unwrap() >= 70.0));

    // One generation call per scene; nothing regenerated.
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 3);

    let plans = h.engine.plans();
    let kinds: Vec<RenderPlanKind> = plans.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RenderPlanKind::Stitch,
            RenderPlanKind::Upscale,
            RenderPlanKind::Interpolate,
            RenderPlanKind::Enhance
        ]
    );
    assert_eq!(plans[0].xfade_count(), 2);
    assert_eq!(result.duration_secs, 14.0);
    assert_eq!(result.resolution, QualityTier::Hd1080);
    assert_eq!(
        result.video,
        Some(MediaHandle::url(plans[3].output_path.clone()))
    );

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["total_clips"], 3);
    assert_eq!(json["clips"][2]["scene_id"], "scene-003");

    // Every stage appears exactly once, in order, and completed.
    let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ALL_STEPS);
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Completed));

    let events = drain(&mut h.events);
    assert!(matches!(
        events.first(),
        Some(OrchestrationEvent::OrchestrationStarted { .. })
    ));
    assert!(matches!(
        events.last(),
        Some(OrchestrationEvent::OrchestrationCompleted { summary })
            if summary.total_clips == 3 && summary.regenerated_clips == 0
    ));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, OrchestrationEvent::BatchStarted { .. }))
            .count(),
        1
    );
}

// ---------------------------------------------------------------------------
// Test: one scene keeps failing past the retry cap
// ---------------------------------------------------------------------------

#[tokio::test]
async fn persistent_failure_is_reported_after_retry_cap() {
    let tuning = PipelineTuning {
        max_retries: 1,
        ..fast_tuning()
    };
    let h = harness(FakeBackend::new(&["scene-002"]), tuning);

    let result = h
        .orchestrator
        .run(request(15.0), CancellationToken::new())
        .await;

    assert!(result.success, "run failed: {:?}", result.error);
    assert_eq!(result.successful_clips, 2);
    assert_eq!(result.failed_clips, 1);

    let failed = &result.clips[1];
    assert_eq!(failed.scene_id, "scene-002");
    assert_eq!(failed.retry_count, 1);
    assert!(!failed.error.as_deref().unwrap_or("").is_empty());
    assert_eq!(failed.continuity_score, Some(0.0));

    // First attempt plus exactly one regeneration with a different model.
    let requests = h.backend.requests.lock().unwrap();
    let attempts: Vec<&GenerationRequest> = requests
        .iter()
        .filter(|r| r.scene_id == "scene-002")
        .collect();
    assert_eq!(attempts.len(), 2);
    assert_ne!(attempts[0].model, attempts[1].model);

    // The failed clip is left out of the stitch.
    assert_eq!(h.engine.plans()[0].inputs.len(), 2);
    assert_eq!(h.engine.plans()[0].xfade_count(), 1);
}

// ---------------------------------------------------------------------------
// Test: failure isolation inside one batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_failing_scene_in_a_batch_of_five() {
    let tuning = PipelineTuning {
        max_retries: 0,
        ..fast_tuning()
    };
    let h = harness(FakeBackend::new(&["scene-004"]), tuning);

    let result = h
        .orchestrator
        .run(request(25.0), CancellationToken::new())
        .await;

    assert_eq!(result.total_clips, 5);
    assert_eq!(result.successful_clips, 4);
    let ids: Vec<&str> = result.clips.iter().map(|c| c.scene_id.as_str()).collect();
    assert_eq!(
        ids,
        ["scene-001", "scene-002", "scene-003", "scene-004", "scene-005"]
    );
    assert!(result.clips[3].media.is_none());
    assert!(result.success);
}

// ---------------------------------------------------------------------------
// Test: regeneration recovers a scene
// ---------------------------------------------------------------------------

#[tokio::test]
async fn flagged_scene_recovers_on_alternate_model() {
    /// Fails only the first attempt of each listed scene.
    struct FlakyOnce {
        failing: Vec<String>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VideoBackend for FlakyOnce {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
            _cancel: &CancellationToken,
        ) -> Result<GeneratedMedia, BackendError> {
            let mut seen = self.seen.lock().unwrap();
            let first = !seen.contains(&request.scene_id);
            seen.push(request.scene_id.clone());
            if first && self.failing.contains(&request.scene_id) {
                return Err(BackendError::Timeout { attempts: 3 });
            }
            Ok(GeneratedMedia {
                media: MediaHandle::url(format!("https://cdn.test/{}.mp4", request.scene_id)),
                duration_secs: None,
            })
        }
    }

    let models = Arc::new(ModelRegistry::builtin());
    let backend = Arc::new(FlakyOnce {
        failing: vec!["scene-001".to_string()],
        seen: Mutex::new(Vec::new()),
    });
    let mut backends = BackendRegistry::new(MODEL_KLING, backend.clone());
    for caps in models.models() {
        backends.register(caps.id.clone(), backend.clone());
    }
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let orchestrator = Orchestrator::new(
        models,
        Arc::new(backends),
        Arc::new(DryRunRenderEngine::new()),
        "/tmp/longcut-test",
        fast_tuning(),
        bus,
    )
    .unwrap();

    let result = orchestrator.run(request(10.0), CancellationToken::new()).await;

    assert!(result.success);
    assert_eq!(result.failed_clips, 0);
    assert_eq!(result.clips[0].retry_count, 1);
    assert!(result.clips[0].is_success());
    let seen = backend.seen.lock().unwrap().clone();
    assert_eq!(seen.iter().filter(|id| *id == "scene-001").count(), 2);

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(OrchestrationEvent::OrchestrationCompleted { summary }) if summary.regenerated_clips == 1
    ));
}

// ---------------------------------------------------------------------------
// Test: nothing to stitch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_failed_clips_fail_the_run_at_stitching() {
    let tuning = PipelineTuning {
        max_retries: 0,
        ..fast_tuning()
    };
    let mut h = harness(FakeBackend::new(&["scene-001", "scene-002"]), tuning);

    let result = h
        .orchestrator
        .run(request(10.0), CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(result.video.is_none());
    assert!(result.error.as_deref().unwrap().contains("none of the 2 clips"));
    // Partial history is kept.
    assert_eq!(result.clips.len(), 2);
    let stitching = result.steps.iter().find(|s| s.name == STEP_STITCHING).unwrap();
    assert_eq!(stitching.status, StepStatus::Failed);
    assert!(h.engine.plans().is_empty());

    let events = drain(&mut h.events);
    assert!(matches!(
        events.last(),
        Some(OrchestrationEvent::OrchestrationFailed { step, .. }) if step == STEP_STITCHING
    ));
}

// ---------------------------------------------------------------------------
// Test: invalid request
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_request_fails_at_planning() {
    let h = harness(FakeBackend::new(&[]), fast_tuning());

    let result = h
        .orchestrator
        .run(request(0.0), CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(result.clips.is_empty());
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: 720p skips upscaling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hd720_request_skips_upscale_plans() {
    let h = harness(FakeBackend::new(&[]), fast_tuning());
    let mut req = request(10.0);
    req.quality = QualityTier::Hd720;

    let result = h.orchestrator.run(req, CancellationToken::new()).await;

    assert!(result.success);
    let kinds: Vec<RenderPlanKind> = h.engine.plans().iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![RenderPlanKind::Stitch, RenderPlanKind::Enhance]);
    assert_eq!(result.resolution, QualityTier::Hd720);
}

// ---------------------------------------------------------------------------
// Test: cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancellation_keeps_completed_clips() {
    let tuning = PipelineTuning {
        batch_size: 2,
        inter_batch_delay_ms: 2000,
        ..Default::default()
    };
    let mut h = harness(FakeBackend::slow(Duration::from_millis(500)), tuning);
    let cancel = CancellationToken::new();

    // Fires during the first inter-batch delay.
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        trigger.cancel();
    });

    let result = h.orchestrator.run(request(30.0), cancel).await;

    assert!(!result.success);
    assert_eq!(result.total_clips, 6);
    assert_eq!(result.successful_clips, 2);
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 2);
    let generation = result.steps.iter().find(|s| s.name == STEP_GENERATION).unwrap();
    assert_eq!(generation.status, StepStatus::Failed);
    assert!(h.engine.plans().is_empty());

    let events = drain(&mut h.events);
    assert!(events.iter().any(|e| matches!(
        e,
        OrchestrationEvent::GenerationCancelled {
            completed_clips: 2,
            total_clips: 6
        }
    )));
}

// ---------------------------------------------------------------------------
// Test: duplicate explicit scene ids
// ---------------------------------------------------------------------------

/// Two caller scenes sharing an id are rejected before any generation, so a
/// retry of one can never overwrite the other's clip.
#[tokio::test]
async fn duplicate_explicit_scene_ids_fail_at_planning() {
    let h = harness(FakeBackend::new(&["dup"]), fast_tuning());
    let scene = |index: usize, prompt: &str| Scene {
        id: "dup".to_string(),
        index,
        scene_type: SceneType::Landscape,
        description: prompt.to_string(),
        prompt: prompt.to_string(),
        duration_secs: 5.0,
        model: None,
        style: None,
        camera: None,
        transition: None,
    };
    let mut req = request(10.0);
    req.scenes = Some(vec![scene(0, "bad one"), scene(1, "good one")]);

    let result = h.orchestrator.run(req, CancellationToken::new()).await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("Duplicate scene id 'dup'"));
    assert!(result.clips.is_empty());
    assert_eq!(result.steps[0].name, STEP_PLANNING);
    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: cancellation during regeneration
// ---------------------------------------------------------------------------

/// First attempts fail for the listed scenes; every later attempt hangs until
/// cancelled.
struct HangOnRetry {
    failing: Vec<String>,
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl VideoBackend for HangOnRetry {
    fn name(&self) -> &str {
        "hang-on-retry"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedMedia, BackendError> {
        let first = {
            let mut seen = self.seen.lock().unwrap();
            let first = !seen.contains(&request.scene_id);
            seen.push(request.scene_id.clone());
            first
        };
        if !first {
            cancel.cancelled().await;
            return Err(BackendError::Cancelled);
        }
        if self.failing.contains(&request.scene_id) {
            return Err(BackendError::Generation("first attempt failed".to_string()));
        }
        Ok(GeneratedMedia {
            media: MediaHandle::url(format!("https://cdn.test/{}.mp4", request.scene_id)),
            duration_secs: None,
        })
    }
}

/// Cancelling while a retry is in flight reports the aborted generation and
/// keeps the clip from before the retry.
#[tokio::test(start_paused = true)]
async fn cancellation_during_regeneration_is_reported() {
    let models = Arc::new(ModelRegistry::builtin());
    let backend = Arc::new(HangOnRetry {
        failing: vec!["scene-001".to_string()],
        seen: Mutex::new(Vec::new()),
    });
    let mut backends = BackendRegistry::new(MODEL_KLING, backend.clone());
    for caps in models.models() {
        backends.register(caps.id.clone(), backend.clone());
    }
    let engine = Arc::new(DryRunRenderEngine::new());
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let orchestrator = Orchestrator::new(
        models,
        Arc::new(backends),
        engine.clone(),
        "/tmp/longcut-test",
        fast_tuning(),
        bus,
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let result = orchestrator.run(request(10.0), cancel).await;

    assert!(!result.success);
    assert!(engine.plans().is_empty());
    let regeneration = result
        .steps
        .iter()
        .find(|s| s.name == STEP_REGENERATION)
        .unwrap();
    assert_eq!(regeneration.status, StepStatus::Failed);

    // The interrupted retry left the original failed clip in place.
    assert_eq!(result.clips[0].retry_count, 0);
    assert_eq!(
        result.clips[0].error.as_deref(),
        Some("Generation failed: first attempt failed")
    );
    assert!(result.clips[1].is_success());

    let events = drain(&mut rx);
    let cancelled: Vec<&OrchestrationEvent> = events
        .iter()
        .filter(|e| matches!(e, OrchestrationEvent::GenerationCancelled { .. }))
        .collect();
    assert_eq!(
        cancelled,
        vec![&OrchestrationEvent::GenerationCancelled {
            completed_clips: 1,
            total_clips: 2
        }]
    );
    assert!(matches!(
        events.last(),
        Some(OrchestrationEvent::OrchestrationFailed { step, .. }) if step == STEP_REGENERATION
    ));
}
