use longcut_core::error::CoreError;
use longcut_core::ffmpeg::FfmpegError;

/// Errors from executing a render plan.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error("Render engine error: {0}")]
    Engine(String),
}

/// Errors that halt an orchestration run.
///
/// Generation failures never appear here; they are recorded on the clip.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(CoreError),

    #[error("Assembly failed: {0}")]
    Assembly(CoreError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Orchestration cancelled")]
    Cancelled,
}
