//! FFmpeg command construction and execution for render plans.

use std::path::Path;

use crate::render_plan::RenderPlan;

/// Error type for FFmpeg operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("render plan has no inputs")]
    EmptyPlan,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Video codec used for every rendered output.
pub const OUTPUT_CODEC: &str = "libx264";

/// Pixel format used for every rendered output.
pub const OUTPUT_PIXEL_FORMAT: &str = "yuv420p";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Argument vector (without the `ffmpeg` program name) that executes `plan`.
pub fn plan_to_args(plan: &RenderPlan) -> Result<Vec<String>, FfmpegError> {
    if plan.inputs.is_empty() {
        return Err(FfmpegError::EmptyPlan);
    }

    let mut args = vec!["-y".to_string()];
    for input in &plan.inputs {
        args.push("-i".to_string());
        args.push(input.source.clone());
    }
    args.extend([
        "-filter_complex".to_string(),
        plan.filter_graph(),
        "-map".to_string(),
        "[vout]".to_string(),
        "-an".to_string(),
        "-c:v".to_string(),
        OUTPUT_CODEC.to_string(),
        "-pix_fmt".to_string(),
        OUTPUT_PIXEL_FORMAT.to_string(),
        plan.output_path.clone(),
    ]);
    Ok(args)
}

/// Execute `plan` with the system `ffmpeg`, creating the output directory
/// first.
pub async fn run_plan(plan: &RenderPlan) -> Result<(), FfmpegError> {
    let args = plan_to_args(plan)?;

    if let Some(parent) = Path::new(&plan.output_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let output = tokio::process::Command::new("ffmpeg")
        .args(&args)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
