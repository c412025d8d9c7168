//! dictcheck library - exposes the pipeline and sources for testing.

pub mod fakes;
pub mod pipeline;
pub mod policy_source;
pub mod report;
pub mod service_source;

pub use pipeline::{Coordinator, PipelineError, RunSummary};
pub use policy_source::{PolicyAnswer, PolicyDocsClient, PolicySource};
pub use service_source::{FastlyClient, ServiceSource};
