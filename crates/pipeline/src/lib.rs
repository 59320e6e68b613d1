//! Long-form video generation pipeline.
//!
//! - [`ClipScheduler`] generates clips in bounded concurrent batches.
//! - [`RegenerationManager`] retries flagged scenes with alternate models.
//! - [`AssemblyPipeline`] stitches, upscales and enhances through a
//!   [`RenderEngine`].
//! - [`Orchestrator`] runs the stages in order and reports progress on the
//!   event bus.

pub mod assembly;
pub mod error;
pub mod orchestrator;
pub mod regeneration;
pub mod render_engine;
pub mod scheduler;
pub mod steps;

pub use assembly::{AssemblyPipeline, RenderedMedia};
pub use error::{PipelineError, RenderError};
pub use orchestrator::Orchestrator;
pub use regeneration::{RegenerationManager, RegenerationReport};
pub use render_engine::{DryRunRenderEngine, FfmpegRenderEngine, RenderEngine};
pub use scheduler::{ClipScheduler, SchedulerEvent};
