//! Script-to-scene planning: clip count derivation, sentence grouping,
//! keyword scene classification, narrative-arc synthesis and prompt
//! composition.
//!
//! Planning is pure and total: any request that passed validation yields
//! exactly `ceil(total_duration / clip_duration)` scenes, or the caller's
//! explicit scene list unchanged.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::request::LongVideoRequest;
use crate::scene::{scene_id_for_index, transition_for_position, Scene, SceneType, VideoStyle};
use crate::tuning::DEFAULT_CLIP_DURATION_SECS;

// ---------------------------------------------------------------------------
// Keyword classification
// ---------------------------------------------------------------------------

/// Keyword rules checked in order; the first matching category wins.
pub const KEYWORD_RULES: &[(SceneType, &[&str])] = &[
    (
        SceneType::FaceCloseup,
        &["face", "close-up", "closeup", "portrait", "eyes", "expression", "smile"],
    ),
    (
        SceneType::Dialogue,
        &["says", "said", "talk", "talks", "conversation", "dialogue", "speaks", "asks", "interview"],
    ),
    (
        SceneType::Action,
        &["fight", "chase", "explodes", "explosion", "battle", "jumps", "attack", "escape"],
    ),
    (
        SceneType::FastMotion,
        &["fast", "speed", "race", "racing", "rush", "rushes", "zoom", "sprint", "timelapse"],
    ),
    (
        SceneType::People,
        &["people", "crowd", "person", "man", "woman", "group", "family", "children", "team"],
    ),
    (
        SceneType::Landscape,
        &["mountain", "mountains", "ocean", "forest", "landscape", "sky", "sunset", "sunrise", "river", "desert", "beach"],
    ),
    (
        SceneType::Establishing,
        &["city", "skyline", "building", "aerial", "overview", "street", "town"],
    ),
    (
        SceneType::Product,
        &["product", "device", "bottle", "package", "brand", "unboxing", "gadget"],
    ),
    (
        SceneType::ObjectCloseup,
        &["detail", "details", "macro", "texture", "object"],
    ),
    (
        SceneType::Animation,
        &["cartoon", "animated", "animation", "character", "characters"],
    ),
    (
        SceneType::Artistic,
        &["abstract", "surreal", "dream", "painting", "artistic", "watercolor"],
    ),
    (
        SceneType::Transition,
        &["meanwhile", "later", "transition", "suddenly", "afterwards"],
    ),
    (
        SceneType::TextOverlay,
        &["title", "text", "caption", "headline", "quote"],
    ),
];

static DEFAULT_CLASSIFIER: LazyLock<SceneClassifier> = LazyLock::new(|| {
    SceneClassifier::from_rules(KEYWORD_RULES).expect("built-in keyword rules form valid regexes")
});

/// Keyword matcher assigning a [`SceneType`] to free text.
#[derive(Debug, Clone)]
pub struct SceneClassifier {
    rules: Vec<(SceneType, Regex)>,
}

impl SceneClassifier {
    /// Compile ordered keyword rules into case-insensitive whole-word
    /// matchers. Keywords are matched literally.
    pub fn from_rules(rules: &[(SceneType, &[&str])]) -> Result<Self, CoreError> {
        let compiled = rules
            .iter()
            .filter(|(_, keywords)| !keywords.is_empty())
            .map(|(scene_type, keywords)| {
                let alternatives: Vec<String> =
                    keywords.iter().map(|k| regex::escape(k)).collect();
                let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
                Regex::new(&pattern)
                    .map(|re| (*scene_type, re))
                    .map_err(|e| CoreError::Validation(format!("Invalid keyword rule: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules: compiled })
    }

    /// First matching category, or [`SceneType::GenericFootage`].
    pub fn classify(&self, text: &str) -> SceneType {
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(t, _)| *t)
            .unwrap_or(SceneType::GenericFootage)
    }
}

impl Default for SceneClassifier {
    fn default() -> Self {
        DEFAULT_CLASSIFIER.clone()
    }
}

// ---------------------------------------------------------------------------
// Phrase tables
// ---------------------------------------------------------------------------

/// Visual-language phrase appended to prompts of each scene type.
pub fn type_phrase(scene_type: SceneType) -> &'static str {
    match scene_type {
        SceneType::Landscape => "sweeping wide shot, natural light, expansive vista",
        SceneType::Establishing => "establishing shot, wide angle, sense of place",
        SceneType::FaceCloseup => "close-up portrait, shallow depth of field, detailed facial features",
        SceneType::People => "medium shot of people, natural body language, realistic motion",
        SceneType::Dialogue => "two-shot conversation framing, subtle gestures, eye-level camera",
        SceneType::Artistic => "artistic composition, stylized visuals, expressive color",
        SceneType::Animation => "smooth animation, consistent character design, fluid motion",
        SceneType::Product => "studio product shot, clean background, soft key light",
        SceneType::ObjectCloseup => "macro detail shot, crisp texture, controlled lighting",
        SceneType::Action => "dynamic action, motion blur, high energy camera work",
        SceneType::FastMotion => "fast-paced motion, speed ramp, kinetic energy",
        SceneType::Transition => "smooth visual transition, flowing movement",
        SceneType::GenericFootage => "high quality footage, balanced composition",
        SceneType::TextOverlay => "clean background with negative space for text, steady frame",
    }
}

/// Look phrase appended to every prompt of a given style.
pub fn style_phrase(style: VideoStyle) -> &'static str {
    match style {
        VideoStyle::Cinematic => "cinematic film look, anamorphic lens, dramatic lighting",
        VideoStyle::Documentary => "documentary style, handheld camera, authentic natural lighting",
        VideoStyle::Tutorial => "clear well-lit framing, steady camera, focus on subject",
        VideoStyle::Promotional => "polished commercial look, vibrant colors, dynamic framing",
        VideoStyle::Entertainment => "energetic pacing, bold colors, engaging composition",
        VideoStyle::Artistic => "stylized artistic rendering, expressive palette, painterly texture",
        VideoStyle::Other => "professional video quality",
    }
}

/// Camera movement hint recorded on planned scenes.
pub fn camera_hint(scene_type: SceneType) -> &'static str {
    match scene_type {
        SceneType::Landscape | SceneType::Establishing => "slow pan",
        SceneType::FaceCloseup | SceneType::ObjectCloseup | SceneType::Product => "slow push-in",
        SceneType::Action | SceneType::FastMotion => "tracking",
        SceneType::Dialogue | SceneType::TextOverlay => "static",
        SceneType::People | SceneType::GenericFootage => "handheld",
        SceneType::Artistic | SceneType::Animation | SceneType::Transition => "orbit",
    }
}

/// `base, type phrase, style phrase`.
pub fn compose_prompt(base: &str, scene_type: SceneType, style: VideoStyle) -> String {
    let base = base.trim();
    let mut parts = Vec::with_capacity(3);
    if !base.is_empty() {
        parts.push(base);
    }
    parts.push(type_phrase(scene_type));
    parts.push(style_phrase(style));
    parts.join(", ")
}

// ---------------------------------------------------------------------------
// Clip count and durations
// ---------------------------------------------------------------------------

/// `ceil(total / unit)`, at least 1.
///
/// Quotients within float rounding error of a whole number are snapped to
/// it first, so `15.0 / 5.0` never rounds up to 4.
pub fn clip_count(total_duration_secs: f64, clip_duration_secs: f64) -> usize {
    if clip_duration_secs <= 0.0 || total_duration_secs <= 0.0 {
        return 1;
    }
    let quotient = total_duration_secs / clip_duration_secs;
    let nearest = quotient.round();
    let raw = if (quotient - nearest).abs() <= nearest * 4.0 * f64::EPSILON {
        nearest
    } else {
        quotient.ceil()
    };
    (raw as usize).max(1)
}

/// Per-scene durations: the unit for every scene, the remainder for the
/// last one so the timeline sums to `total_duration_secs`.
///
/// A remainder shorter than `min_last_secs` borrows the shortfall from the
/// scene before it, so the last clip can still carry a crossfade.
pub fn scene_durations(
    total_duration_secs: f64,
    clip_duration_secs: f64,
    count: usize,
    min_last_secs: f64,
) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let mut durations = vec![clip_duration_secs; count];
    let last = count - 1;
    let remainder = total_duration_secs - clip_duration_secs * last as f64;
    if remainder > 0.0 {
        durations[last] = remainder.min(clip_duration_secs);
    }
    if last > 0 && durations[last] < min_last_secs {
        let wanted = min_last_secs.min(clip_duration_secs) - durations[last];
        let spare = (durations[last - 1] - min_last_secs).max(0.0);
        let shift = wanted.min(spare);
        durations[last - 1] -= shift;
        durations[last] += shift;
    }
    durations
}

// ---------------------------------------------------------------------------
// Script segmentation
// ---------------------------------------------------------------------------

/// Split text into sentences on `.`, `!` and `?`, keeping the terminator.
/// Fragments without any word characters are dropped.
pub fn split_sentences(script: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in script.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        sentences.push(trimmed.to_string());
    }
}

/// Group sentences into exactly `count` contiguous, roughly equal segments.
///
/// With fewer sentences than `count`, each sentence is its own segment and
/// the last one is repeated to pad. Returns an empty list when there are no
/// sentences.
pub fn group_sentences(sentences: &[String], count: usize) -> Vec<String> {
    if sentences.is_empty() || count == 0 {
        return Vec::new();
    }
    if sentences.len() < count {
        let mut groups = sentences.to_vec();
        let last = groups[groups.len() - 1].clone();
        groups.resize(count, last);
        return groups;
    }
    let len = sentences.len();
    (0..count)
        .map(|i| sentences[i * len / count..(i + 1) * len / count].join(" "))
        .collect()
}

// ---------------------------------------------------------------------------
// Narrative arc
// ---------------------------------------------------------------------------

/// Phase of the synthesized five-part narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativePhase {
    Opening,
    Development,
    Climax,
    Resolution,
    Closing,
}

/// Phases with their share of the total scene count.
pub const NARRATIVE_ARC: &[(NarrativePhase, f64)] = &[
    (NarrativePhase::Opening, 0.15),
    (NarrativePhase::Development, 0.30),
    (NarrativePhase::Climax, 0.25),
    (NarrativePhase::Resolution, 0.20),
    (NarrativePhase::Closing, 0.10),
];

impl NarrativePhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Opening => "Opening",
            Self::Development => "Development",
            Self::Climax => "Climax",
            Self::Resolution => "Resolution",
            Self::Closing => "Closing",
        }
    }

    /// Scene types cycled through within the phase.
    pub fn scene_types(self) -> &'static [SceneType] {
        match self {
            Self::Opening => &[SceneType::Establishing, SceneType::Landscape],
            Self::Development => &[
                SceneType::People,
                SceneType::Dialogue,
                SceneType::GenericFootage,
            ],
            Self::Climax => &[
                SceneType::Action,
                SceneType::FaceCloseup,
                SceneType::FastMotion,
            ],
            Self::Resolution => &[SceneType::People, SceneType::FaceCloseup],
            Self::Closing => &[SceneType::Landscape, SceneType::Establishing],
        }
    }
}

/// Distribute `count` scenes across the arc by cumulative share. Counts sum
/// to `count`; phases may receive zero scenes when `count` is small.
pub fn phase_counts(count: usize) -> Vec<(NarrativePhase, usize)> {
    let mut cumulative = 0.0;
    let mut assigned = 0usize;
    NARRATIVE_ARC
        .iter()
        .enumerate()
        .map(|(i, (phase, share))| {
            cumulative += share;
            let end = if i + 1 == NARRATIVE_ARC.len() {
                count
            } else {
                ((cumulative * count as f64).round() as usize).clamp(assigned, count)
            };
            let n = end - assigned;
            assigned = end;
            (*phase, n)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ScenePlanner
// ---------------------------------------------------------------------------

/// Turns a [`LongVideoRequest`] into an ordered scene list.
#[derive(Debug, Clone)]
pub struct ScenePlanner {
    classifier: SceneClassifier,
    clip_duration_secs: f64,
    min_scene_secs: f64,
}

/// Segment text and type of one scene before prompt composition.
struct Draft {
    description: String,
    scene_type: SceneType,
}

impl ScenePlanner {
    pub fn new(classifier: SceneClassifier, clip_duration_secs: f64) -> Self {
        Self {
            classifier,
            clip_duration_secs,
            min_scene_secs: 0.0,
        }
    }

    /// Lower bound for the last planned scene, normally the crossfade
    /// length.
    pub fn with_min_scene_secs(mut self, secs: f64) -> Self {
        self.min_scene_secs = secs.max(0.0);
        self
    }

    pub fn clip_duration_secs(&self) -> f64 {
        self.clip_duration_secs
    }

    /// Plan the scenes of `request`.
    pub fn plan(&self, request: &LongVideoRequest) -> Vec<Scene> {
        if let Some(scenes) = request.explicit_scenes() {
            return scenes.to_vec();
        }

        let count = clip_count(request.total_duration_secs, self.clip_duration_secs);
        let drafts = match request.script.as_deref() {
            Some(script) => self.drafts_from_script(script, request, count),
            None => Self::drafts_from_arc(request, count),
        };
        let durations = scene_durations(
            request.total_duration_secs,
            self.clip_duration_secs,
            count,
            self.min_scene_secs,
        );

        drafts
            .into_iter()
            .zip(durations)
            .enumerate()
            .map(|(index, (draft, duration_secs))| Scene {
                id: scene_id_for_index(index),
                index,
                scene_type: draft.scene_type,
                prompt: compose_prompt(&draft.description, draft.scene_type, request.style),
                description: draft.description,
                duration_secs,
                model: None,
                style: Some(request.style),
                camera: Some(camera_hint(draft.scene_type).to_string()),
                transition: Some(transition_for_position(index, count)),
            })
            .collect()
    }

    fn drafts_from_script(&self, script: &str, request: &LongVideoRequest, count: usize) -> Vec<Draft> {
        let groups = group_sentences(&split_sentences(script), count);
        if groups.is_empty() {
            let base = base_description(request);
            return (0..count)
                .map(|_| Draft {
                    description: base.clone(),
                    scene_type: SceneType::GenericFootage,
                })
                .collect();
        }
        groups
            .into_iter()
            .map(|segment| Draft {
                scene_type: self.classifier.classify(&segment),
                description: segment,
            })
            .collect()
    }

    fn drafts_from_arc(request: &LongVideoRequest, count: usize) -> Vec<Draft> {
        let base = base_description(request);
        phase_counts(count)
            .into_iter()
            .flat_map(|(phase, n)| {
                let types = phase.scene_types();
                let base = base.clone();
                (0..n).map(move |i| Draft {
                    description: format!("{} scene: {base}", phase.label()),
                    scene_type: types[i % types.len()],
                })
            })
            .collect()
    }
}

impl Default for ScenePlanner {
    fn default() -> Self {
        Self::new(SceneClassifier::default(), DEFAULT_CLIP_DURATION_SECS)
    }
}

/// Request description, or the title when the description is blank.
fn base_description(request: &LongVideoRequest) -> String {
    let description = request.description.trim();
    if description.is_empty() {
        request.title.trim().to_string()
    } else {
        description.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
