pub mod analysis;
pub mod report;

// Re-export main entry points
pub use analysis::{Collaborators, PipelineConfig, PipelineOutcome, run_pipeline};
pub use report::render;
