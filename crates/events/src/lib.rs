//! Longcut progress events.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`] is the envelope stamped with run id and time.
//! - [`OrchestrationEvent`] enumerates the state changes of a run.

pub mod bus;
pub mod orchestration;

pub use bus::{EventBus, PipelineEvent};
pub use orchestration::{OrchestrationEvent, RunSummary};
