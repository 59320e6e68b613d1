//! Generated clip records and opaque media handles.

use serde::{Deserialize, Serialize};

use crate::scene::{QualityTier, Scene};
use crate::types::{ModelId, SceneId};

// ---------------------------------------------------------------------------
// MediaHandle
// ---------------------------------------------------------------------------

/// Opaque reference to a media artifact produced by a backend or the
/// render engine. Never inspected beyond being passed along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaHandle {
    /// Remote or local location of the media.
    Url { url: String },
    /// Inline base64-encoded payload.
    Inline {
        mime_type: String,
        data_base64: String,
    },
}

impl MediaHandle {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    /// Input string a media engine can open: the URL itself, or a `data:`
    /// URI for inline payloads.
    pub fn as_source(&self) -> String {
        match self {
            Self::Url { url } => url.clone(),
            Self::Inline {
                mime_type,
                data_base64,
            } => format!("data:{mime_type};base64,{data_base64}"),
        }
    }
}

// ---------------------------------------------------------------------------
// GeneratedClip
// ---------------------------------------------------------------------------

/// Outcome of one generation attempt for one scene.
///
/// `media` is present on success and absent on failure, in which case
/// `error` describes what went wrong. Regeneration replaces the whole
/// record and carries `retry_count` forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedClip {
    pub scene_id: SceneId,
    pub scene_index: usize,
    pub media: Option<MediaHandle>,
    pub model_used: ModelId,
    pub duration_secs: f64,
    pub resolution: QualityTier,
    pub quality_score: f64,
    pub continuity_score: Option<f64>,
    pub generation_time_ms: u64,
    pub retry_count: u32,
    pub error: Option<String>,
}

impl GeneratedClip {
    /// Build a failed clip for `scene`.
    pub fn failed(
        scene: &Scene,
        model_used: impl Into<ModelId>,
        resolution: QualityTier,
        error: impl Into<String>,
    ) -> Self {
        Self {
            scene_id: scene.id.clone(),
            scene_index: scene.index,
            media: None,
            model_used: model_used.into(),
            duration_secs: scene.duration_secs,
            resolution,
            quality_score: 0.0,
            continuity_score: None,
            generation_time_ms: 0,
            retry_count: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.media.is_some()
    }
}

// ---------------------------------------------------------------------------
// Clip statistics
// ---------------------------------------------------------------------------

/// Aggregate counts over a clip list.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClipStats {
    pub total_clips: usize,
    pub successful_clips: usize,
    pub failed_clips: usize,
    /// Mean `quality_score` of successful clips (0 when none succeeded).
    pub average_quality: f64,
}

impl ClipStats {
    pub fn from_clips(clips: &[GeneratedClip]) -> Self {
        let successful: Vec<&GeneratedClip> = clips.iter().filter(|c| c.is_success()).collect();
        let average_quality = if successful.is_empty() {
            0.0
        } else {
            successful.iter().map(|c| c.quality_score).sum::<f64>() / successful.len() as f64
        };
        Self {
            total_clips: clips.len(),
            successful_clips: successful.len(),
            failed_clips: clips.len() - successful.len(),
            average_quality,
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

    fn scene() -> Scene {
        Scene {
            id: "scene-001".to_string(),
            index: 0,
            scene_type: SceneType::Action,
            description: "a chase".to_string(),
            prompt: "a chase".to_string(),
            duration_secs: 5.0,
            model: None,
            style: None,
            camera: None,
            transition: None,
        }
    }

    fn ok_clip(quality: f64) -> GeneratedClip {
        GeneratedClip {
            media: Some(MediaHandle::url("https://cdn/clip.mp4")),
            quality_score: quality,
            error: None,
            ..GeneratedClip::failed(&scene(), "kling", QualityTier::Hd1080, "")
        }
    }

    #[test]
    fn inline_handle_becomes_data_uri() {
        let handle = MediaHandle::Inline {
            mime_type: "video/mp4".to_string(),
            data_base64: "AAAA".to_string(),
        };
        assert_eq!(handle.as_source(), "data:video/mp4;base64,AAAA");
        assert_eq!(MediaHandle::url("a.mp4").as_source(), "a.mp4");
    }

    #[test]
    fn failed_clip_has_no_media_and_an_error() {
        let clip = GeneratedClip::failed(&scene(), "kling", QualityTier::Hd1080, "boom");
        assert!(!clip.is_success());
        assert_eq!(clip.error.as_deref(), Some("boom"));
        assert_eq!(clip.retry_count, 0);
        assert_eq!(clip.duration_secs, 5.0);
    }

    #[test]
    fn stats_count_failures_and_average_successes() {
        let clips = vec![
            ok_clip(80.0),
            ok_clip(90.0),
            GeneratedClip::failed(&scene(), "kling", QualityTier::Hd1080, "boom"),
        ];
        let stats = ClipStats::from_clips(&clips);
        assert_eq!(stats.total_clips, 3);
        assert_eq!(stats.successful_clips, 2);
        assert_eq!(stats.failed_clips, 1);
        assert!((stats.average_quality - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_of_empty_list_are_zero() {
        assert_eq!(ClipStats::from_clips(&[]), ClipStats::default());
    }
}
