//! Generative video backends.
//!
//! Provides the [`VideoBackend`] dispatch contract, an HTTP
//! submit-and-poll implementation with backoff and remote cancellation,
//! the seed-image provider for models that animate from a first frame,
//! and the model-keyed [`BackendRegistry`].

pub mod api;
pub mod backend;
pub mod error;
pub mod http_backend;
pub mod poll;
pub mod registry;
pub mod seed;

pub use backend::{GeneratedMedia, GenerationRequest, VideoBackend};
pub use error::BackendError;
pub use registry::BackendRegistry;
