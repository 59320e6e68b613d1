//! Pipeline stage names and [`ProcessingStep`] status records.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Step name constants
// ---------------------------------------------------------------------------

pub const STEP_PLANNING: &str = "planning";
pub const STEP_ROUTING: &str = "routing";
pub const STEP_GENERATION: &str = "generation";
pub const STEP_CONTINUITY: &str = "continuity";
pub const STEP_REGENERATION: &str = "regeneration";
pub const STEP_STITCHING: &str = "stitching";
pub const STEP_UPSCALING: &str = "upscaling";
pub const STEP_ENHANCEMENT: &str = "enhancement";

/// Stage names in pipeline order.
pub const ALL_STEPS: &[&str] = &[
    STEP_PLANNING,
    STEP_ROUTING,
    STEP_GENERATION,
    STEP_CONTINUITY,
    STEP_REGENERATION,
    STEP_STITCHING,
    STEP_UPSCALING,
    STEP_ENHANCEMENT,
];

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// ProcessingStep
// ---------------------------------------------------------------------------

/// A named pipeline stage with status and a 0-100 progress value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub name: String,
    pub status: StepStatus,
    pub progress: u8,
    pub detail: Option<String>,
}

impl ProcessingStep {
    pub fn new(name: impl Into<String>, status: StepStatus, progress: u8) -> Self {
        Self {
            name: name.into(),
            status,
            progress: progress.min(100),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Progress percentage for `done` out of `total`, clamped to `0..=100`.
/// An empty workload counts as complete.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}
