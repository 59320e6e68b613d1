//! Heuristic constants for planning, routing, scheduling, continuity and
//! assembly, plus the overridable [`PipelineTuning`] bundle.
//!
//! The values are deliberately kept as named constants. Callers override
//! them per run through [`PipelineTuning`] rather than editing the tables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::threshold_validation::{validate_positive, validate_score_range};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of one planned clip in seconds.
pub const DEFAULT_CLIP_DURATION_SECS: f64 = 5.0;

/// Upper bound on the requested total duration of one video.
pub const MAX_TOTAL_DURATION_SECS: f64 = 3600.0;

/// Number of generation jobs dispatched concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Pause between batches to respect backend rate limits.
pub const DEFAULT_INTER_BATCH_DELAY_MS: u64 = 2000;

/// Regeneration attempts allowed per scene before its clip is final.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Clips scoring below this continuity value are regenerated.
pub const DEFAULT_CONTINUITY_THRESHOLD: f64 = 70.0;

/// Continuity bonus when the preceding clip came from the same model.
pub const SAME_MODEL_CONTINUITY_BONUS: f64 = 5.0;

/// Router bonus when a scene type is in the model's best-for set.
pub const BEST_FOR_BONUS: f64 = 20.0;

/// Router bonus when the scene fits within the model's maximum duration.
pub const DURATION_FIT_BONUS: f64 = 10.0;

/// Weight applied to a model's speed score by the router.
pub const SPEED_WEIGHT: f64 = 0.1;

/// Crossfade length between adjacent clips in seconds.
pub const DEFAULT_CROSSFADE_SECS: f64 = 0.5;

/// Target frame rate for the interpolation pass.
pub const DEFAULT_INTERPOLATION_FPS: u32 = 60;

// ---------------------------------------------------------------------------
// PipelineTuning
// ---------------------------------------------------------------------------

/// Overridable copy of every heuristic constant used by one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineTuning {
    pub clip_duration_secs: f64,
    pub max_total_duration_secs: f64,
    pub batch_size: usize,
    pub inter_batch_delay_ms: u64,
    pub max_retries: u32,
    pub continuity_threshold: f64,
    pub same_model_bonus: f64,
    pub best_for_bonus: f64,
    pub duration_fit_bonus: f64,
    pub speed_weight: f64,
    pub crossfade_secs: f64,
    pub interpolation_fps: u32,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            clip_duration_secs: DEFAULT_CLIP_DURATION_SECS,
            max_total_duration_secs: MAX_TOTAL_DURATION_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay_ms: DEFAULT_INTER_BATCH_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            continuity_threshold: DEFAULT_CONTINUITY_THRESHOLD,
            same_model_bonus: SAME_MODEL_CONTINUITY_BONUS,
            best_for_bonus: BEST_FOR_BONUS,
            duration_fit_bonus: DURATION_FIT_BONUS,
            speed_weight: SPEED_WEIGHT,
            crossfade_secs: DEFAULT_CROSSFADE_SECS,
            interpolation_fps: DEFAULT_INTERPOLATION_FPS,
        }
    }
}

impl PipelineTuning {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_positive(self.clip_duration_secs, "clip_duration_secs")?;
        validate_positive(self.max_total_duration_secs, "max_total_duration_secs")?;
        if self.batch_size == 0 {
            return Err(CoreError::Validation(
                "batch_size must be at least 1".to_string(),
            ));
        }
        validate_score_range(self.continuity_threshold, "continuity_threshold")?;
        if self.same_model_bonus < 0.0 || self.best_for_bonus < 0.0 || self.duration_fit_bonus < 0.0
        {
            return Err(CoreError::Validation(
                "bonus values must not be negative".to_string(),
            ));
        }
        if self.speed_weight < 0.0 {
            return Err(CoreError::Validation(format!(
                "speed_weight must not be negative, got {}",
                self.speed_weight
            )));
        }
        if self.crossfade_secs < 0.0 {
            return Err(CoreError::Validation(format!(
                "crossfade_secs must not be negative, got {}",
                self.crossfade_secs
            )));
        }
        if self.interpolation_fps == 0 {
            return Err(CoreError::Validation(
                "interpolation_fps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineTuning::default().validate().is_ok());
    }

    #[test]
    fn defaults_mirror_constants() {
        let t = PipelineTuning::default();
        assert_eq!(t.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(t.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(t.inter_batch_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let t = PipelineTuning {
            batch_size: 0,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let t = PipelineTuning {
            continuity_threshold: 120.0,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let t: PipelineTuning = serde_json::from_str(r#"{"batch_size": 2}"#).unwrap();
        assert_eq!(t.batch_size, 2);
        assert_eq!(t.clip_duration_secs, DEFAULT_CLIP_DURATION_SECS);
    }
}
