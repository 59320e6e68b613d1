//! Capability-scored model routing.
//!
//! Pure and deterministic: the same scene always routes to the same model
//! for a given registry and weights.

use std::sync::Arc;

use crate::model_registry::{ModelCapabilities, ModelRegistry};
use crate::scene::{Scene, SceneType};
use crate::tuning::{PipelineTuning, BEST_FOR_BONUS, DURATION_FIT_BONUS, SPEED_WEIGHT};
use crate::types::ModelId;

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Bonus and weight values used to score candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingWeights {
    pub best_for_bonus: f64,
    pub duration_fit_bonus: f64,
    pub speed_weight: f64,
}

impl Default for RoutingWeights {
    fn default() -> Self {
        Self {
            best_for_bonus: BEST_FOR_BONUS,
            duration_fit_bonus: DURATION_FIT_BONUS,
            speed_weight: SPEED_WEIGHT,
        }
    }
}

impl From<&PipelineTuning> for RoutingWeights {
    fn from(t: &PipelineTuning) -> Self {
        Self {
            best_for_bonus: t.best_for_bonus,
            duration_fit_bonus: t.duration_fit_bonus,
            speed_weight: t.speed_weight,
        }
    }
}

/// Score a candidate model for a scene.
///
/// `quality + best_for_bonus (if listed) + duration_fit_bonus (if the scene
/// fits the model's maximum) + speed * speed_weight`.
pub fn score_model(
    model: &ModelCapabilities,
    scene_type: SceneType,
    duration_secs: f64,
    weights: &RoutingWeights,
) -> f64 {
    let mut score = model.quality_score;
    if model.is_best_for(scene_type) {
        score += weights.best_for_bonus;
    }
    if model.fits_duration(duration_secs) {
        score += weights.duration_fit_bonus;
    }
    score + model.speed_score * weights.speed_weight
}

// ---------------------------------------------------------------------------
// ModelRouter
// ---------------------------------------------------------------------------

/// Assigns a model to every scene that does not already pin one.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    registry: Arc<ModelRegistry>,
    weights: RoutingWeights,
}

impl ModelRouter {
    pub fn new(registry: Arc<ModelRegistry>, weights: RoutingWeights) -> Self {
        Self { registry, weights }
    }

    /// Fill in `model` on every unpinned scene.
    pub fn route(&self, scenes: Vec<Scene>) -> Vec<Scene> {
        scenes
            .into_iter()
            .map(|mut scene| {
                if scene.model.is_none() {
                    scene.model = Some(self.select_model(scene.scene_type, scene.duration_secs));
                }
                scene
            })
            .collect()
    }

    /// Highest-scoring preferred model for the given scene shape.
    ///
    /// Ties keep the earlier entry of the preference list. When none of the
    /// preferred models is registered, the registry default is returned.
    pub fn select_model(&self, scene_type: SceneType, duration_secs: f64) -> ModelId {
        let mut best: Option<(&ModelCapabilities, f64)> = None;
        for id in self.registry.preferred_models(scene_type) {
            let Some(model) = self.registry.get(id) else {
                continue;
            };
            let score = score_model(model, scene_type, duration_secs, &self.weights);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((model, score));
            }
        }
        best.map(|(m, _)| m.id.clone())
            .unwrap_or_else(|| self.registry.default_model().to_string())
    }

    /// First preferred model for `scene_type` other than `current`, or
    /// `current` itself when no alternative exists.
    pub fn alternate_model(&self, scene_type: SceneType, current: &str) -> ModelId {
        self.registry
            .preferred_models(scene_type)
            .iter()
            .find(|id| id.as_str() != current && self.registry.get(id).is_some())
            .cloned()
            .unwrap_or_else(|| current.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
