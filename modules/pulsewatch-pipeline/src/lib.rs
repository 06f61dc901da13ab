//! The six-stage trend processing pipeline:
//! collect → clean → enrich → classify → score → summarise.

pub mod classifier;
pub mod cleaner;
pub mod collector;
pub mod enricher;
pub mod orchestrator;
pub mod scorer;
pub mod stats;
pub mod summariser;

pub use orchestrator::{Orchestrator, PipelineOutcome, RunMetrics, StageMetrics};
pub use stats::PipelineStats;
