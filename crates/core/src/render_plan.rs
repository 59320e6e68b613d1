//! Structured render plans for the assembly stages.
//!
//! A [`RenderPlan`] is an ordered list of filter operations over one or more
//! inputs, plus an output path. Plans are handed to a render engine; nothing
//! in this module touches media.

use std::f64::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clip::GeneratedClip;
use crate::error::CoreError;
use crate::scene::{QualityTier, VideoStyle};

/// Light temporal/spatial denoise applied to every enhanced output.
pub const DENOISE_FILTER: &str = "hqdn3d=1.5:1.5:6:6";

/// Subtle luma sharpen applied after denoise.
pub const SHARPEN_FILTER: &str = "unsharp=5:5:0.5:5:5:0.0";

/// Gamma and saturation nudge applied across the whole stitched timeline.
pub const STITCH_COLOR_GAMMA: f64 = 1.02;
pub const STITCH_COLOR_SATURATION: f64 = 1.02;

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPlanKind {
    Stitch,
    Upscale,
    Interpolate,
    Enhance,
}

impl RenderPlanKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stitch => "stitch",
            Self::Upscale => "upscale",
            Self::Interpolate => "interpolate",
            Self::Enhance => "enhance",
        }
    }
}

/// One input stream of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderInput {
    pub source: String,
    pub duration_secs: f64,
}

/// A single filter operation. Rendered to an ffmpeg filter expression by
/// [`FilterOp::to_filter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterOp {
    /// Crossfade the running output into the next input.
    Xfade { duration_secs: f64, offset_secs: f64 },
    ColorCorrect { gamma: f64, saturation: f64 },
    Scale { factor: f64 },
    Interpolate { fps: u32 },
    Eq {
        contrast: f64,
        saturation: f64,
        brightness: f64,
    },
    Vignette { angle: f64 },
    Grain { strength: u32 },
    Denoise,
    Sharpen,
}

impl FilterOp {
    pub fn to_filter(&self) -> String {
        match self {
            Self::Xfade {
                duration_secs,
                offset_secs,
            } => format!("xfade=transition=fade:duration={duration_secs}:offset={offset_secs:.3}"),
            Self::ColorCorrect { gamma, saturation } => {
                format!("eq=gamma={gamma}:saturation={saturation}")
            }
            Self::Scale { factor } => {
                format!("scale=trunc(iw*{factor}/2)*2:trunc(ih*{factor}/2)*2:flags=lanczos")
            }
            Self::Interpolate { fps } => format!("minterpolate=fps={fps}:mi_mode=mci"),
            Self::Eq {
                contrast,
                saturation,
                brightness,
            } => format!("eq=contrast={contrast}:saturation={saturation}:brightness={brightness}"),
            Self::Vignette { angle } => format!("vignette=angle={angle:.4}"),
            Self::Grain { strength } => format!("noise=alls={strength}:allf=t"),
            Self::Denoise => DENOISE_FILTER.to_string(),
            Self::Sharpen => SHARPEN_FILTER.to_string(),
        }
    }
}

/// Inputs, ordered operations, and output location for one render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPlan {
    pub kind: RenderPlanKind,
    pub inputs: Vec<RenderInput>,
    pub operations: Vec<FilterOp>,
    pub output_path: String,
    /// Expected duration of the output.
    pub duration_secs: f64,
}

impl RenderPlan {
    pub fn xfade_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, FilterOp::Xfade { .. }))
            .count()
    }

    /// Full `-filter_complex` graph. Crossfades consume inputs in order and
    /// every other operation is chained onto the merged stream, which is
    /// labelled `[vout]`.
    pub fn filter_graph(&self) -> String {
        let mut segments = Vec::new();
        let mut current = "[0:v]".to_string();
        let mut next_input = 1;
        let mut chain = Vec::new();

        for op in &self.operations {
            match op {
                FilterOp::Xfade { .. } => {
                    let label = format!("[x{next_input}]");
                    segments.push(format!(
                        "{current}[{next_input}:v]{}{label}",
                        op.to_filter()
                    ));
                    current = label;
                    next_input += 1;
                }
                other => chain.push(other.to_filter()),
            }
        }

        if chain.is_empty() {
            segments.push(format!("{current}null[vout]"));
        } else {
            segments.push(format!("{current}{}[vout]", chain.join(",")));
        }
        segments.join(";")
    }
}

/// Output location for a plan of `kind` within a run's directory.
pub fn plan_output_path(output_dir: &Path, run_id: &str, kind: RenderPlanKind) -> String {
    output_dir
        .join(run_id)
        .join(format!("{}.mp4", kind.as_str()))
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// Stitch
// ---------------------------------------------------------------------------

/// Crossfade offsets for clips of the given durations.
///
/// The k-th transition (1-based) starts at the sum of the first k durations
/// minus `k * crossfade`, clamped at 0.
pub fn crossfade_offsets(durations: &[f64], crossfade_secs: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(durations.len().saturating_sub(1));
    let mut cumulative = 0.0;
    for (k, d) in durations.iter().enumerate().take(durations.len().saturating_sub(1)) {
        cumulative += d;
        offsets.push((cumulative - (k + 1) as f64 * crossfade_secs).max(0.0));
    }
    offsets
}

/// Length of the stitched timeline after overlapping crossfades.
pub fn stitched_duration(durations: &[f64], crossfade_secs: f64) -> f64 {
    let total: f64 = durations.iter().sum();
    let overlap = durations.len().saturating_sub(1) as f64 * crossfade_secs;
    (total - overlap).max(0.0)
}

/// Concatenate every clip that has media, crossfading adjacent pairs.
///
/// Fails when no clip has media. Clips without media are skipped, so the
/// plan for `n` usable clips carries exactly `n - 1` crossfades.
pub fn build_stitch_plan(
    clips: &[GeneratedClip],
    crossfade_secs: f64,
    output_path: impl Into<String>,
) -> Result<RenderPlan, CoreError> {
    let inputs: Vec<RenderInput> = clips
        .iter()
        .filter_map(|c| {
            c.media.as_ref().map(|m| RenderInput {
                source: m.as_source(),
                duration_secs: c.duration_secs,
            })
        })
        .collect();

    if inputs.is_empty() {
        return Err(CoreError::Validation(format!(
            "Cannot stitch: none of the {} clips has media",
            clips.len()
        )));
    }

    let durations: Vec<f64> = inputs.iter().map(|i| i.duration_secs).collect();
    let mut operations: Vec<FilterOp> = crossfade_offsets(&durations, crossfade_secs)
        .into_iter()
        .map(|offset_secs| FilterOp::Xfade {
            duration_secs: crossfade_secs,
            offset_secs,
        })
        .collect();
    operations.push(FilterOp::ColorCorrect {
        gamma: STITCH_COLOR_GAMMA,
        saturation: STITCH_COLOR_SATURATION,
    });

    Ok(RenderPlan {
        kind: RenderPlanKind::Stitch,
        duration_secs: stitched_duration(&durations, crossfade_secs),
        inputs,
        operations,
        output_path: output_path.into(),
    })
}

// ---------------------------------------------------------------------------
// Upscale
// ---------------------------------------------------------------------------

/// Super-resolution plan for `tier`, or `None` when the tier needs no
/// scaling (factor 1).
pub fn build_upscale_plan(
    input: RenderInput,
    tier: QualityTier,
    output_path: impl Into<String>,
) -> Option<RenderPlan> {
    let factor = tier.upscale_factor();
    if factor <= 1.0 {
        return None;
    }
    Some(RenderPlan {
        kind: RenderPlanKind::Upscale,
        duration_secs: input.duration_secs,
        inputs: vec![input],
        operations: vec![FilterOp::Scale { factor }],
        output_path: output_path.into(),
    })
}

/// Motion-interpolation plan targeting `fps`.
pub fn build_interpolation_plan(
    input: RenderInput,
    fps: u32,
    output_path: impl Into<String>,
) -> RenderPlan {
    RenderPlan {
        kind: RenderPlanKind::Interpolate,
        duration_secs: input.duration_secs,
        inputs: vec![input],
        operations: vec![FilterOp::Interpolate { fps }],
        output_path: output_path.into(),
    }
}

// ---------------------------------------------------------------------------
// Enhance
// ---------------------------------------------------------------------------

fn eq(contrast: f64, saturation: f64, brightness: f64) -> FilterOp {
    FilterOp::Eq {
        contrast,
        saturation,
        brightness,
    }
}

/// Style-specific grading chain. Unrecognised styles get the neutral chain.
pub fn style_filters(style: VideoStyle) -> Vec<FilterOp> {
    match style {
        VideoStyle::Cinematic => vec![
            eq(1.1, 1.05, 0.0),
            FilterOp::Vignette { angle: PI / 5.0 },
            FilterOp::Grain { strength: 4 },
        ],
        VideoStyle::Documentary => vec![eq(1.03, 0.95, 0.0), FilterOp::Grain { strength: 6 }],
        VideoStyle::Tutorial => vec![eq(1.05, 1.0, 0.02)],
        VideoStyle::Promotional => vec![eq(1.08, 1.2, 0.0), FilterOp::Vignette { angle: PI / 5.0 }],
        VideoStyle::Entertainment => vec![eq(1.1, 1.15, 0.0)],
        VideoStyle::Artistic => vec![
            eq(1.15, 1.3, 0.0),
            FilterOp::Vignette { angle: PI / 4.0 },
            FilterOp::Grain { strength: 8 },
        ],
        VideoStyle::Other => vec![eq(1.0, 1.0, 0.0)],
    }
}

/// Style chain followed by the universal denoise and sharpen passes.
pub fn build_enhance_plan(
    input: RenderInput,
    style: VideoStyle,
    output_path: impl Into<String>,
) -> RenderPlan {
    let mut operations = style_filters(style);
    operations.push(FilterOp::Denoise);
    operations.push(FilterOp::Sharpen);
    RenderPlan {
        kind: RenderPlanKind::Enhance,
        duration_secs: input.duration_secs,
        inputs: vec![input],
        operations,
        output_path: output_path.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
