//! Static capability data for the generative backends and the
//! scene-type preference table.
//!
//! A [`ModelRegistry`] is immutable once built. It is constructed once and
//! shared (`Arc<ModelRegistry>`) by the router, the scheduler and the
//! backend registry, so tests can inject fake model sets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scene::{QualityTier, SceneType};
use crate::threshold_validation::{validate_positive, validate_score_range};
use crate::types::ModelId;

// ---------------------------------------------------------------------------
// Model identifiers
// ---------------------------------------------------------------------------

pub const MODEL_KLING: &str = "kling";
pub const MODEL_RUNWAY: &str = "runway";
pub const MODEL_LUMA: &str = "luma";
pub const MODEL_PIKA: &str = "pika";
pub const MODEL_HAILUO: &str = "hailuo";

/// Backend used when a scene's model is unknown or unroutable.
pub const DEFAULT_MODEL: &str = MODEL_KLING;

// ---------------------------------------------------------------------------
// ModelCapabilities
// ---------------------------------------------------------------------------

/// Read-only descriptor of one generative backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub id: ModelId,
    pub name: String,
    pub best_for: Vec<SceneType>,
    pub max_duration_secs: f64,
    pub max_resolution: QualityTier,
    /// Relative output quality, 0-100.
    pub quality_score: f64,
    /// Relative generation speed, 0-100.
    pub speed_score: f64,
    pub endpoint: String,
    pub requires_seed_image: bool,
}

impl ModelCapabilities {
    pub fn is_best_for(&self, scene_type: SceneType) -> bool {
        self.best_for.contains(&scene_type)
    }

    pub fn fits_duration(&self, duration_secs: f64) -> bool {
        duration_secs <= self.max_duration_secs
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.id.is_empty() {
            return Err(CoreError::Validation("Model id must not be empty".to_string()));
        }
        validate_score_range(self.quality_score, "quality_score")?;
        validate_score_range(self.speed_score, "speed_score")?;
        validate_positive(self.max_duration_secs, "max_duration_secs")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// Ranked model preferences per scene type. Every scene type is listed.
pub const BUILTIN_PREFERENCES: &[(SceneType, &[&str])] = &[
    (SceneType::Landscape, &[MODEL_RUNWAY, MODEL_LUMA, MODEL_KLING]),
    (SceneType::Establishing, &[MODEL_RUNWAY, MODEL_LUMA]),
    (SceneType::FaceCloseup, &[MODEL_KLING, MODEL_RUNWAY]),
    (SceneType::People, &[MODEL_KLING, MODEL_HAILUO]),
    (SceneType::Dialogue, &[MODEL_KLING, MODEL_HAILUO]),
    (SceneType::Artistic, &[MODEL_LUMA, MODEL_PIKA]),
    (SceneType::Animation, &[MODEL_PIKA, MODEL_LUMA]),
    (SceneType::Product, &[MODEL_HAILUO, MODEL_KLING]),
    (SceneType::ObjectCloseup, &[MODEL_HAILUO, MODEL_PIKA]),
    (SceneType::Action, &[MODEL_KLING, MODEL_RUNWAY]),
    (SceneType::FastMotion, &[MODEL_RUNWAY, MODEL_KLING]),
    (SceneType::Transition, &[MODEL_PIKA, MODEL_RUNWAY]),
    (SceneType::GenericFootage, &[MODEL_HAILUO, MODEL_LUMA, MODEL_KLING]),
    (SceneType::TextOverlay, &[MODEL_PIKA, MODEL_HAILUO]),
];

/// Capability descriptors of the five built-in backends.
pub fn builtin_models() -> Vec<ModelCapabilities> {
    vec![
        ModelCapabilities {
            id: MODEL_KLING.to_string(),
            name: "Kling".to_string(),
            best_for: vec![
                SceneType::FaceCloseup,
                SceneType::People,
                SceneType::Dialogue,
                SceneType::Action,
            ],
            max_duration_secs: 10.0,
            max_resolution: QualityTier::Hd1080,
            quality_score: 92.0,
            speed_score: 60.0,
            endpoint: "https://api.klingai.com/v1/videos/text2video".to_string(),
            requires_seed_image: false,
        },
        ModelCapabilities {
            id: MODEL_RUNWAY.to_string(),
            name: "Runway Gen-3".to_string(),
            best_for: vec![
                SceneType::Landscape,
                SceneType::Establishing,
                SceneType::FastMotion,
                SceneType::Transition,
            ],
            max_duration_secs: 10.0,
            max_resolution: QualityTier::Hd1080,
            quality_score: 88.0,
            speed_score: 75.0,
            endpoint: "https://api.dev.runwayml.com/v1/image_to_video".to_string(),
            requires_seed_image: true,
        },
        ModelCapabilities {
            id: MODEL_LUMA.to_string(),
            name: "Luma Dream Machine".to_string(),
            best_for: vec![
                SceneType::Artistic,
                SceneType::Animation,
                SceneType::Landscape,
            ],
            max_duration_secs: 9.0,
            max_resolution: QualityTier::Hd1080,
            quality_score: 85.0,
            speed_score: 70.0,
            endpoint: "https://api.lumalabs.ai/dream-machine/v1/generations".to_string(),
            requires_seed_image: false,
        },
        ModelCapabilities {
            id: MODEL_PIKA.to_string(),
            name: "Pika".to_string(),
            best_for: vec![
                SceneType::Animation,
                SceneType::TextOverlay,
                SceneType::Transition,
                SceneType::ObjectCloseup,
            ],
            max_duration_secs: 10.0,
            max_resolution: QualityTier::Hd1080,
            quality_score: 78.0,
            speed_score: 85.0,
            endpoint: "https://api.pika.art/v1/generate".to_string(),
            requires_seed_image: false,
        },
        ModelCapabilities {
            id: MODEL_HAILUO.to_string(),
            name: "Hailuo".to_string(),
            best_for: vec![
                SceneType::Product,
                SceneType::ObjectCloseup,
                SceneType::GenericFootage,
                SceneType::People,
            ],
            max_duration_secs: 6.0,
            max_resolution: QualityTier::Hd720,
            quality_score: 80.0,
            speed_score: 80.0,
            endpoint: "https://api.minimax.chat/v1/video_generation".to_string(),
            requires_seed_image: false,
        },
    ]
}

fn builtin_preferences() -> HashMap<SceneType, Vec<ModelId>> {
    BUILTIN_PREFERENCES
        .iter()
        .map(|(t, ids)| (*t, ids.iter().map(|id| id.to_string()).collect()))
        .collect()
}

// ---------------------------------------------------------------------------
// ModelRegistry
// ---------------------------------------------------------------------------

/// Immutable lookup of model capabilities and per-scene-type preferences.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelCapabilities>,
    preferences: HashMap<SceneType, Vec<ModelId>>,
    default_model: ModelId,
}

impl ModelRegistry {
    /// Build a registry from explicit tables.
    ///
    /// Fails when the default model is missing, a preference references an
    /// unknown model, a scene type has no preference, or a descriptor is out
    /// of range.
    pub fn new(
        models: Vec<ModelCapabilities>,
        preferences: HashMap<SceneType, Vec<ModelId>>,
        default_model: impl Into<ModelId>,
    ) -> Result<Self, CoreError> {
        let default_model = default_model.into();

        for model in &models {
            model.validate()?;
        }
        if !models.iter().any(|m| m.id == default_model) {
            return Err(CoreError::NotFound {
                entity: "model",
                id: default_model,
            });
        }
        for scene_type in SceneType::ALL {
            let ranked = preferences.get(&scene_type).filter(|r| !r.is_empty());
            let Some(ranked) = ranked else {
                return Err(CoreError::Validation(format!(
                    "Scene type '{scene_type}' has no preferred models"
                )));
            };
            if let Some(unknown) = ranked.iter().find(|id| !models.iter().any(|m| &m.id == *id)) {
                return Err(CoreError::NotFound {
                    entity: "model",
                    id: unknown.clone(),
                });
            }
        }

        Ok(Self {
            models,
            preferences,
            default_model,
        })
    }

    /// The five built-in backends and their preference table.
    pub fn builtin() -> Self {
        Self {
            models: builtin_models(),
            preferences: builtin_preferences(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ModelCapabilities> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Descriptor for `id`, or for the default model when `id` is unknown.
    pub fn get_or_default(&self, id: &str) -> &ModelCapabilities {
        self.get(id).unwrap_or_else(|| self.default_capabilities())
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn default_capabilities(&self) -> &ModelCapabilities {
        self.models
            .iter()
            .find(|m| m.id == self.default_model)
            .unwrap_or(&self.models[0])
    }

    pub fn models(&self) -> &[ModelCapabilities] {
        &self.models
    }

    /// Ranked model ids for a scene type.
    pub fn preferred_models(&self, scene_type: SceneType) -> &[ModelId] {
        self.preferences
            .get(&scene_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
