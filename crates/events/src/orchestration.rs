//! Typed progress events emitted by an orchestration run.
//!
//! Observers receive these wrapped in a [`PipelineEvent`](crate::PipelineEvent).
//! They describe state changes only and are never needed to compute the
//! run result.

use longcut_core::step::ProcessingStep;
use longcut_core::types::SceneId;
use serde::{Deserialize, Serialize};

/// Closing figures for a successful run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_clips: usize,
    pub successful_clips: usize,
    pub failed_clips: usize,
    /// Clips replaced by at least one regeneration attempt.
    pub regenerated_clips: usize,
    /// Clips left flagged because they reached the retry cap.
    pub exhausted_clips: usize,
    pub average_quality: f64,
    pub duration_secs: f64,
    pub elapsed_ms: u64,
}

/// A state change in one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OrchestrationEvent {
    /// A run was accepted and planning is about to begin.
    OrchestrationStarted {
        title: String,
        total_duration_secs: f64,
    },

    /// A generation batch was dispatched.
    BatchStarted {
        batch_index: usize,
        batch_count: usize,
        scene_ids: Vec<SceneId>,
    },

    /// A processing step was created or changed.
    StepUpdated { step: ProcessingStep },

    OrchestrationCompleted { summary: RunSummary },

    /// The run halted. `step` names the stage that failed.
    OrchestrationFailed { error: String, step: String },

    /// Cancellation stopped generation before every scene finished.
    GenerationCancelled {
        completed_clips: usize,
        total_clips: usize,
    },
}

impl OrchestrationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrchestrationStarted { .. } => "orchestration-started",
            Self::BatchStarted { .. } => "batch-started",
            Self::StepUpdated { .. } => "step-updated",
            Self::OrchestrationCompleted { .. } => "orchestration-completed",
            Self::OrchestrationFailed { .. } => "orchestration-failed",
            Self::GenerationCancelled { .. } => "generation-cancelled",
        }
    }

    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::OrchestrationCompleted { .. } | Self::OrchestrationFailed { .. }
        )
    }
}
