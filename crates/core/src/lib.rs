//! Long-form video orchestration domain.
//!
//! Pure building blocks shared by every other crate in the workspace:
//!
//! - [`scene_planner`] turns a request into an ordered scene list.
//! - [`model_registry`] and [`model_router`] hold model capabilities and
//!   assign a model to every scene.
//! - [`continuity`] scores generated clips and flags weak ones.
//! - [`render_plan`] and [`ffmpeg`] describe and execute the stitch,
//!   upscale and enhance passes.

pub mod clip;
pub mod continuity;
pub mod error;
pub mod ffmpeg;
pub mod model_registry;
pub mod model_router;
pub mod render_plan;
pub mod request;
pub mod scene;
pub mod scene_planner;
pub mod step;
pub mod threshold_validation;
pub mod tuning;
pub mod types;
