//! Public input/output contract of one orchestration run.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::clip::{ClipStats, GeneratedClip, MediaHandle};
use crate::error::CoreError;
use crate::scene::{AspectRatio, QualityTier, Scene, VideoStyle};
use crate::step::ProcessingStep;

// ---------------------------------------------------------------------------
// LongVideoRequest
// ---------------------------------------------------------------------------

/// A request for one long-form video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongVideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Explicit script. When present, scenes are cut from its sentences.
    #[serde(default)]
    pub script: Option<String>,
    pub total_duration_secs: f64,
    #[serde(default)]
    pub style: VideoStyle,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub quality: QualityTier,
    /// Caller-authored scenes, used verbatim when present.
    #[serde(default)]
    pub scenes: Option<Vec<Scene>>,
}

impl LongVideoRequest {
    /// Caller-authored scenes, if any were supplied and the list is non-empty.
    pub fn explicit_scenes(&self) -> Option<&[Scene]> {
        self.scenes.as_deref().filter(|s| !s.is_empty())
    }

    /// Validate the request before planning.
    ///
    /// With explicit scenes, each scene must satisfy its own invariants, ids
    /// must be unique, and the total duration is not consulted. Otherwise the total duration
    /// must be in `(0, max_total_duration_secs]`.
    pub fn validate(&self, max_total_duration_secs: f64) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation(
                "Request title must not be empty".to_string(),
            ));
        }

        if let Some(scenes) = self.explicit_scenes() {
            let mut seen = HashSet::with_capacity(scenes.len());
            for scene in scenes {
                scene.validate()?;
                if !seen.insert(scene.id.as_str()) {
                    return Err(CoreError::Validation(format!(
                        "Duplicate scene id '{}'",
                        scene.id
                    )));
                }
            }
            return Ok(());
        }

        let d = self.total_duration_secs;
        if d.is_nan() || d <= 0.0 {
            return Err(CoreError::Validation(format!(
                "total_duration_secs must be > 0, got {d}"
            )));
        }
        if d > max_total_duration_secs {
            return Err(CoreError::Validation(format!(
                "total_duration_secs must not exceed {max_total_duration_secs}, got {d}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LongVideoResult
// ---------------------------------------------------------------------------

/// Outcome of one orchestration run. Produced exactly once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongVideoResult {
    pub run_id: String,
    pub success: bool,
    pub video: Option<MediaHandle>,
    pub duration_secs: f64,
    pub resolution: QualityTier,
    pub total_clips: usize,
    pub successful_clips: usize,
    pub failed_clips: usize,
    pub average_quality: f64,
    pub total_time_ms: u64,
    pub steps: Vec<ProcessingStep>,
    pub clips: Vec<GeneratedClip>,
    pub error: Option<String>,
}

impl LongVideoResult {
    /// Assemble a result, deriving the clip statistics from `clips`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_run(
        run_id: impl Into<String>,
        video: Option<MediaHandle>,
        duration_secs: f64,
        resolution: QualityTier,
        total_time_ms: u64,
        steps: Vec<ProcessingStep>,
        clips: Vec<GeneratedClip>,
        error: Option<String>,
    ) -> Self {
        let stats = ClipStats::from_clips(&clips);
        Self {
            run_id: run_id.into(),
            success: error.is_none() && video.is_some(),
            video,
            duration_secs,
            resolution,
            total_clips: stats.total_clips,
            successful_clips: stats.successful_clips,
            failed_clips: stats.failed_clips,
            average_quality: stats.average_quality,
            total_time_ms,
            steps,
            clips,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneType;
    use crate::tuning::MAX_TOTAL_DURATION_SECS;

    fn request(duration: f64) -> LongVideoRequest {
        LongVideoRequest {
            title: "Coastline".to_string(),
            description: "A journey along the coast".to_string(),
            script: None,
            total_duration_secs: duration,
            style: VideoStyle::Documentary,
            aspect_ratio: AspectRatio::Landscape,
            quality: QualityTier::Hd1080,
            scenes: None,
        }
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let req: LongVideoRequest =
            serde_json::from_str(r#"{"title": "T", "total_duration_secs": 15}"#).unwrap();
        assert_eq!(req.style, VideoStyle::Cinematic);
        assert_eq!(req.quality, QualityTier::Hd1080);
        assert_eq!(req.aspect_ratio, AspectRatio::Landscape);
        assert!(req.scenes.is_none());
    }

    #[test]
    fn valid_request_passes() {
        assert!(request(30.0).validate(MAX_TOTAL_DURATION_SECS).is_ok());
    }

    #[test]
    fn empty_title_rejected() {
        let mut req = request(30.0);
        req.title = "  ".to_string();
        assert!(req.validate(MAX_TOTAL_DURATION_SECS).is_err());
    }

    #[test]
    fn non_positive_duration_rejected() {
        assert!(request(0.0).validate(MAX_TOTAL_DURATION_SECS).is_err());
        assert!(request(-5.0).validate(MAX_TOTAL_DURATION_SECS).is_err());
    }

    #[test]
    fn excessive_duration_rejected() {
        assert!(request(MAX_TOTAL_DURATION_SECS + 1.0)
            .validate(MAX_TOTAL_DURATION_SECS)
            .is_err());
    }

    #[test]
    fn explicit_scenes_bypass_duration_check() {
        let mut req = request(0.0);
        req.scenes = Some(vec![Scene {
            id: "intro".to_string(),
            index: 0,
            scene_type: SceneType::TextOverlay,
            description: "Title card".to_string(),
            prompt: "Title card".to_string(),
            duration_secs: 3.0,
            model: None,
            style: None,
            camera: None,
            transition: None,
        }]);
        assert!(req.validate(MAX_TOTAL_DURATION_SECS).is_ok());
    }

    #[test]
    fn duplicate_explicit_scene_ids_rejected() {
        let scene = |prompt: &str| Scene {
            id: "dup".to_string(),
            index: 0,
            scene_type: SceneType::Landscape,
            description: prompt.to_string(),
            prompt: prompt.to_string(),
            duration_secs: 5.0,
            model: None,
            style: None,
            camera: None,
            transition: None,
        };
        let mut req = request(0.0);
        req.scenes = Some(vec![scene("bad one"), scene("good one")]);
        let err = req.validate(MAX_TOTAL_DURATION_SECS).unwrap_err();
        assert!(err.to_string().contains("Duplicate scene id 'dup'"));
    }

    #[test]
    fn empty_explicit_scene_list_is_ignored() {
        let mut req = request(10.0);
        req.scenes = Some(Vec::new());
        assert!(req.explicit_scenes().is_none());
    }

    #[test]
    fn result_success_requires_video_and_no_error() {
        let ok = LongVideoResult::from_run(
            "run",
            Some(MediaHandle::url("final.mp4")),
            10.0,
            QualityTier::Hd1080,
            5,
            Vec::new(),
            Vec::new(),
            None,
        );
        assert!(ok.success);

        let failed = LongVideoResult::from_run(
            "run",
            None,
            0.0,
            QualityTier::Hd1080,
            5,
            Vec::new(),
            Vec::new(),
            Some("boom".to_string()),
        );
        assert!(!failed.success);
    }
}
