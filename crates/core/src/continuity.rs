//! Continuity scoring and regeneration flagging.
//!
//! Scores every clip from its quality value plus a same-model adjacency
//! bonus, writes the score back onto the clip, and flags anything below the
//! threshold. Failed clips always score 0 and are always flagged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clip::GeneratedClip;
use crate::error::CoreError;
use crate::threshold_validation::validate_score_range;
use crate::tuning::{PipelineTuning, DEFAULT_CONTINUITY_THRESHOLD, SAME_MODEL_CONTINUITY_BONUS};
use crate::types::SceneId;

/// Highest possible continuity score.
pub const MAX_CONTINUITY_SCORE: f64 = 100.0;

// ---------------------------------------------------------------------------
// ContinuityReport
// ---------------------------------------------------------------------------

/// Outcome of one analysis pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContinuityReport {
    /// Mean score over all clips, failed ones included. 0 for an empty list.
    pub average_score: f64,
    /// Scene ids scoring below the threshold, in clip order.
    pub low_confidence: Vec<SceneId>,
    pub scores: BTreeMap<SceneId, f64>,
}

impl ContinuityReport {
    pub fn needs_regeneration(&self) -> bool {
        !self.low_confidence.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ContinuityAnalyzer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuityAnalyzer {
    threshold: f64,
    same_model_bonus: f64,
}

impl ContinuityAnalyzer {
    pub fn new(threshold: f64, same_model_bonus: f64) -> Result<Self, CoreError> {
        validate_score_range(threshold, "continuity_threshold")?;
        if same_model_bonus < 0.0 {
            return Err(CoreError::Validation(format!(
                "same_model_bonus must not be negative, got {same_model_bonus}"
            )));
        }
        Ok(Self {
            threshold,
            same_model_bonus,
        })
    }

    pub fn from_tuning(tuning: &PipelineTuning) -> Result<Self, CoreError> {
        Self::new(tuning.continuity_threshold, tuning.same_model_bonus)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score a single clip given its predecessor.
    ///
    /// The adjacency bonus applies only when the predecessor succeeded with
    /// the same model.
    pub fn score_clip(&self, clip: &GeneratedClip, previous: Option<&GeneratedClip>) -> f64 {
        if !clip.is_success() {
            return 0.0;
        }
        let adjacent_same_model = previous
            .is_some_and(|prev| prev.is_success() && prev.model_used == clip.model_used);
        let bonus = if adjacent_same_model {
            self.same_model_bonus
        } else {
            0.0
        };
        (clip.quality_score + bonus).clamp(0.0, MAX_CONTINUITY_SCORE)
    }

    /// Score every clip, write `continuity_score` back, and flag weak ones.
    pub fn analyze(&self, clips: &mut [GeneratedClip]) -> ContinuityReport {
        let mut report = ContinuityReport::default();
        if clips.is_empty() {
            return report;
        }

        let mut total = 0.0;
        for i in 0..clips.len() {
            let (before, rest) = clips.split_at_mut(i);
            let clip = &mut rest[0];
            let score = self.score_clip(clip, before.last());
            clip.continuity_score = Some(score);

            if !clip.is_success() || score < self.threshold {
                report.low_confidence.push(clip.scene_id.clone());
            }
            report.scores.insert(clip.scene_id.clone(), score);
            total += score;
        }
        report.average_score = total / clips.len() as f64;
        report
    }
}

impl Default for ContinuityAnalyzer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONTINUITY_THRESHOLD,
            same_model_bonus: SAME_MODEL_CONTINUITY_BONUS,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
