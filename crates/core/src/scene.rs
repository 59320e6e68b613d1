//! Scene data model: content kinds, styles, output tiers, and the
//! [`Scene`] unit of generation work.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ModelId, SceneId};

// ---------------------------------------------------------------------------
// SceneType
// ---------------------------------------------------------------------------

/// Classified content kind of a scene. Drives model preference and the
/// visual-language phrase appended to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SceneType {
    Landscape,
    Establishing,
    FaceCloseup,
    People,
    Dialogue,
    Artistic,
    Animation,
    Product,
    ObjectCloseup,
    Action,
    FastMotion,
    Transition,
    GenericFootage,
    TextOverlay,
}

impl SceneType {
    /// Every scene type, in declaration order.
    pub const ALL: [SceneType; 14] = [
        SceneType::Landscape,
        SceneType::Establishing,
        SceneType::FaceCloseup,
        SceneType::People,
        SceneType::Dialogue,
        SceneType::Artistic,
        SceneType::Animation,
        SceneType::Product,
        SceneType::ObjectCloseup,
        SceneType::Action,
        SceneType::FastMotion,
        SceneType::Transition,
        SceneType::GenericFootage,
        SceneType::TextOverlay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Establishing => "establishing",
            Self::FaceCloseup => "face-closeup",
            Self::People => "people",
            Self::Dialogue => "dialogue",
            Self::Artistic => "artistic",
            Self::Animation => "animation",
            Self::Product => "product",
            Self::ObjectCloseup => "object-closeup",
            Self::Action => "action",
            Self::FastMotion => "fast-motion",
            Self::Transition => "transition",
            Self::GenericFootage => "generic-footage",
            Self::TextOverlay => "text-overlay",
        }
    }
}

impl std::fmt::Display for SceneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// VideoStyle
// ---------------------------------------------------------------------------

/// Requested overall look of the output video.
///
/// Unknown style strings deserialize to [`VideoStyle::Other`], which maps
/// to neutral prompt and enhancement tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStyle {
    #[default]
    Cinematic,
    Documentary,
    Tutorial,
    Promotional,
    Entertainment,
    Artistic,
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// AspectRatio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Classic,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
            Self::Classic => "4:3",
        }
    }

    /// `(width, height)` ratio terms.
    fn terms(self) -> (u32, u32) {
        match self {
            Self::Landscape => (16, 9),
            Self::Portrait => (9, 16),
            Self::Square => (1, 1),
            Self::Classic => (4, 3),
        }
    }
}

// ---------------------------------------------------------------------------
// QualityTier
// ---------------------------------------------------------------------------

/// Output resolution tier. Ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum QualityTier {
    #[serde(rename = "720p")]
    Hd720,
    #[default]
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "4k")]
    Uhd4k,
}

impl QualityTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
            Self::Uhd4k => "4k",
        }
    }

    /// Length in pixels of the short side of the frame.
    pub fn short_side(self) -> u32 {
        match self {
            Self::Hd720 => 720,
            Self::Hd1080 => 1080,
            Self::Uhd4k => 2160,
        }
    }

    /// Super-resolution factor applied when upscaling generated clips to
    /// this tier.
    pub fn upscale_factor(self) -> f64 {
        match self {
            Self::Hd720 => 1.0,
            Self::Hd1080 => 1.5,
            Self::Uhd4k => 3.0,
        }
    }

    /// Frame dimensions `(width, height)` for this tier at the given aspect
    /// ratio. Both values are rounded down to an even number.
    pub fn dimensions(self, aspect: AspectRatio) -> (u32, u32) {
        let short = self.short_side();
        let (w, h) = aspect.terms();
        let (width, height) = if w >= h {
            (short * w / h, short)
        } else {
            (short, short * h / w)
        };
        (width & !1, height & !1)
    }

    /// `"WIDTHxHEIGHT"` string for the given aspect ratio.
    pub fn resolution_string(self, aspect: AspectRatio) -> String {
        let (w, h) = self.dimensions(aspect);
        format!("{w}x{h}")
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    FadeIn,
    FadeOut,
    Crossfade,
}

/// Transition for the scene at `index` in a list of `count` scenes.
///
/// First scene fades in, last fades out, interior scenes crossfade. A
/// single-scene video only fades in.
pub fn transition_for_position(index: usize, count: usize) -> Transition {
    if index == 0 {
        Transition::FadeIn
    } else if index + 1 == count {
        Transition::FadeOut
    } else {
        Transition::Crossfade
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// A unit of generation work.
///
/// Created once by the planner. Only `model` changes afterwards: the router
/// fills it in and regeneration may overwrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub index: usize,
    pub scene_type: SceneType,
    pub description: String,
    pub prompt: String,
    pub duration_secs: f64,
    #[serde(default)]
    pub model: Option<ModelId>,
    #[serde(default)]
    pub style: Option<VideoStyle>,
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default)]
    pub transition: Option<Transition>,
}

impl Scene {
    /// Check the scene invariants: positive duration, non-empty prompt.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.duration_secs.is_nan() || self.duration_secs <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Scene '{}' duration must be > 0, got {}",
                self.id, self.duration_secs
            )));
        }
        if self.prompt.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Scene '{}' prompt must not be empty",
                self.id
            )));
        }
        Ok(())
    }
}

/// Stable scene id for a planned position.
pub fn scene_id_for_index(index: usize) -> SceneId {
    format!("scene-{:03}", index + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(duration_secs: f64, prompt: &str) -> Scene {
        Scene {
            id: scene_id_for_index(0),
            index: 0,
            scene_type: SceneType::GenericFootage,
            description: "desc".to_string(),
            prompt: prompt.to_string(),
            duration_secs,
            model: None,
            style: None,
            camera: None,
            transition: None,
        }
    }

    // -- serde names -----------------------------------------------------------

    #[test]
    fn scene_type_serializes_kebab_case() {
        let json = serde_json::to_string(&SceneType::FaceCloseup).unwrap();
        assert_eq!(json, "\"face-closeup\"");
        for t in SceneType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn unknown_style_deserializes_to_other() {
        let style: VideoStyle = serde_json::from_str("\"vaporwave\"").unwrap();
        assert_eq!(style, VideoStyle::Other);
        let style: VideoStyle = serde_json::from_str("\"documentary\"").unwrap();
        assert_eq!(style, VideoStyle::Documentary);
    }

    #[test]
    fn quality_tier_uses_short_labels() {
        let tier: QualityTier = serde_json::from_str("\"4k\"").unwrap();
        assert_eq!(tier, QualityTier::Uhd4k);
        assert_eq!(serde_json::to_string(&QualityTier::Hd720).unwrap(), "\"720p\"");
    }

    // -- dimensions ------------------------------------------------------------

    #[test]
    fn landscape_dimensions() {
        assert_eq!(QualityTier::Hd1080.dimensions(AspectRatio::Landscape), (1920, 1080));
        assert_eq!(QualityTier::Hd720.dimensions(AspectRatio::Landscape), (1280, 720));
        assert_eq!(QualityTier::Uhd4k.dimensions(AspectRatio::Landscape), (3840, 2160));
    }

    #[test]
    fn portrait_and_square_dimensions() {
        assert_eq!(QualityTier::Hd1080.dimensions(AspectRatio::Portrait), (1080, 1920));
        assert_eq!(QualityTier::Hd720.dimensions(AspectRatio::Square), (720, 720));
        assert_eq!(QualityTier::Hd720.resolution_string(AspectRatio::Classic), "960x720");
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(QualityTier::Hd720 < QualityTier::Hd1080);
        assert!(QualityTier::Hd1080 < QualityTier::Uhd4k);
    }

    // -- transitions -----------------------------------------------------------

    #[test]
    fn transitions_by_position() {
        assert_eq!(transition_for_position(0, 3), Transition::FadeIn);
        assert_eq!(transition_for_position(1, 3), Transition::Crossfade);
        assert_eq!(transition_for_position(2, 3), Transition::FadeOut);
        assert_eq!(transition_for_position(0, 1), Transition::FadeIn);
    }

    // -- validation ------------------------------------------------------------

    #[test]
    fn valid_scene_passes() {
        assert!(scene(5.0, "a prompt").validate().is_ok());
    }

    #[test]
    fn zero_duration_rejected() {
        assert!(scene(0.0, "a prompt").validate().is_err());
        assert!(scene(f64::NAN, "a prompt").validate().is_err());
    }

    #[test]
    fn blank_prompt_rejected() {
        assert!(scene(5.0, "   ").validate().is_err());
    }
}
