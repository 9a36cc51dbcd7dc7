//! Reference collaborator suite for a minimal line-oriented stack-machine
//! unit format: a toolchain, probe rewriter, test driver and coverage
//! analyzer that plug into the pipeline's collaborator seams.

pub mod analysis;
pub mod compile;
pub mod exec;
pub mod instrument;
pub mod unit;

pub use analysis::ScriptAnalyzer;
pub use compile::ScriptToolchain;
pub use exec::ScriptDriver;
pub use instrument::ScriptRewriter;
