use crate::artifact::ArtifactLoader;
use crate::coverage::analysis::{Collaborators, PipelineConfig, run_pipeline};
use crate::coverage::report::render;
use crate::script::{ScriptAnalyzer, ScriptDriver, ScriptRewriter, ScriptToolchain};
use crate::session::SessionHandle;
use crate::types::models::{AnalysisLevel, TestStatus};
use crate::utils::io::save_report;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "unitcov",
    about = "Measure code coverage of an artifact under generated tests",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List binary units in the artifact under a package prefix
    List {
        /// Artifact directory under test
        #[arg(short, long)]
        artifact: PathBuf,

        /// Package prefix to scan, e.g. "a.b"
        #[arg(short, long)]
        package: String,
    },

    /// Compile tests, instrument targets, execute and report coverage
    Report {
        /// Directory of test sources
        #[arg(short, long)]
        tests: PathBuf,

        /// Artifact directory under test
        #[arg(short, long)]
        artifact: PathBuf,

        /// Analysis level selector: "PACKAGE(pkg=a.b)", "CLASS(klass=a.B)"
        /// or "METHOD(klass=a.B, method=foo)"
        #[arg(short, long)]
        level: String,

        /// Wildcard patterns selecting which compiled test units run
        #[arg(short, long)]
        filter: Option<Vec<String>>,

        /// Also write the report as JSON to this path
        #[arg(short, long)]
        json: Option<PathBuf>,
    },
}

pub fn execute_list_command(
    artifact: &Path,
    package: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let loader = ArtifactLoader::new(artifact)?;
    let units = loader.scan_package(package)?;
    println!("Found {} units under package '{}':", units.len(), package);
    for unit in units {
        println!("  {unit}");
    }
    Ok(())
}

pub fn execute_report_command(
    tests: &Path,
    artifact: &Path,
    level: &str,
    filter: Option<Vec<String>>,
    json: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    // selector errors fail fast, before any compilation
    let level = AnalysisLevel::parse(level)?;

    let session = SessionHandle::new();
    let collab = Collaborators {
        toolchain: ScriptToolchain,
        rewriter: ScriptRewriter,
        driver: ScriptDriver::new(session.clone()),
        analyzer: ScriptAnalyzer,
    };
    let config = PipelineConfig {
        tests_root: tests.to_path_buf(),
        artifact_root: artifact.to_path_buf(),
        level,
        filter,
    };

    let outcome = run_pipeline(&config, &session, &collab)?;

    println!(
        "Test run: {} passed, {} failed",
        outcome.run.passed(),
        outcome.run.failed()
    );
    let failed: Vec<_> = outcome
        .run
        .results
        .iter()
        .filter(|result| result.status != TestStatus::Passed)
        .collect();
    if !failed.is_empty() {
        println!("\nFailed test units:");
        for result in failed {
            if let TestStatus::Failed(reason) = &result.status {
                println!("  {}: {reason}", result.name);
            }
        }
    }

    println!("\n{}", render(&outcome.level, &outcome.nodes));

    if let Some(path) = json {
        save_report(&outcome, path)?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}
