use crate::coverage::analysis::PipelineOutcome;
use crate::types::errors::Error;
use std::path::Path;

/// Save the pipeline outcome to a JSON file
pub fn save_report(outcome: &PipelineOutcome, output_path: &Path) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(outcome)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
