use crate::artifact::ArtifactLoader;
use crate::compile::{SourceCompiler, Toolchain};
use crate::instrument::{Instrumenter, ProbeRewriter};
use crate::loader::{CompiledLoader, IsolatedLoader};
use crate::resolve::resolve_unit_patterns;
use crate::runner::{ExecutionRunner, TestDriver};
use crate::session::{ExecutionData, SessionHandle};
use crate::types::errors::Error;
use crate::types::models::{AnalysisLevel, CompilationUnit, CoverageNode, RunReport};
use serde::Serialize;
use std::path::PathBuf;

/// External static coverage analyzer: collected counter data plus one
/// instrumented unit in, a class coverage node out.
pub trait CoverageAnalyzer {
    fn analyze(&self, name: &str, bytes: &[u8], data: &ExecutionData)
    -> Result<CoverageNode, Error>;
}

impl<A: CoverageAnalyzer + ?Sized> CoverageAnalyzer for &A {
    fn analyze(
        &self,
        name: &str,
        bytes: &[u8],
        data: &ExecutionData,
    ) -> Result<CoverageNode, Error> {
        (**self).analyze(name, bytes, data)
    }
}

/// The external collaborator set one pipeline run is wired with. The
/// driver is expected to be bound to the same session handle the pipeline
/// is given.
pub struct Collaborators<T, R, D, A> {
    pub toolchain: T,
    pub rewriter: R,
    pub driver: D,
    pub analyzer: A,
}

pub struct PipelineConfig {
    /// Root directory of test sources
    pub tests_root: PathBuf,
    /// Artifact directory under test
    pub artifact_root: PathBuf,
    /// Requested output granularity
    pub level: AnalysisLevel,
    /// Optional wildcard patterns selecting which compiled test units run
    pub filter: Option<Vec<String>>,
}

/// Everything one pipeline run produced: the coverage nodes for the
/// requested level (empty when a method lookup misses) and the per-test
/// run report.
#[derive(Debug, Serialize)]
pub struct PipelineOutcome {
    pub level: AnalysisLevel,
    pub nodes: Vec<CoverageNode>,
    pub run: RunReport,
}

/// Runs the whole pipeline, strictly sequentially: compile, instrument,
/// start the session, execute every test, collect, analyze, aggregate.
pub fn run_pipeline<T, R, D, A>(
    config: &PipelineConfig,
    session: &SessionHandle,
    collab: &Collaborators<T, R, D, A>,
) -> Result<PipelineOutcome, Error>
where
    T: Toolchain,
    R: ProbeRewriter,
    D: TestDriver,
    A: CoverageAnalyzer,
{
    let artifact = ArtifactLoader::new(&config.artifact_root)?;

    let mut compiler = SourceCompiler::new(&collab.toolchain);
    compiler.generate_all(&config.tests_root)?;
    let tests = select_tests(&compiler, config.filter.as_deref())?;
    println!(
        "Compiled {} test units from '{}'",
        tests.len(),
        config.tests_root.display()
    );

    // target units: explicit for class/method levels, scanned for packages
    let (target_names, skip_missing) = match &config.level {
        AnalysisLevel::Package(pkg) => (artifact.scan_package(pkg)?, true),
        AnalysisLevel::Class(class) | AnalysisLevel::Method { class, .. } => {
            (vec![class.clone()], false)
        }
    };

    let mut compiled = CompiledLoader::new(&artifact);
    for unit in compiler.units() {
        compiled.define(&unit.name, unit.bytes.clone());
    }
    let mut loader = IsolatedLoader::new(compiled);

    let instrumenter = Instrumenter::new(&artifact, &collab.rewriter);
    let instrumented = instrumenter.instrument_into(&target_names, &mut loader, skip_missing)?;

    session.start()?;
    println!("\nRunning tests...\n");
    let runner = ExecutionRunner::new(&collab.driver);
    let run = runner.run_all(&tests, &mut loader)?;

    println!("\nAnalyzing coverage...\n");
    let data = session.stop_and_collect()?;

    let mut class_nodes = Vec::with_capacity(instrumented.len());
    for name in &instrumented {
        // the override registered during instrumentation makes this
        // re-read return the instrumented bytes
        let bytes = artifact.read_unit(name)?;
        class_nodes.push(collab.analyzer.analyze(name, &bytes, &data)?);
    }

    let nodes = match &config.level {
        AnalysisLevel::Package(pkg) => vec![CoverageNode::package(pkg, class_nodes)],
        AnalysisLevel::Class(_) => class_nodes,
        AnalysisLevel::Method { method, .. } => class_nodes
            .iter()
            .filter_map(|class| class.find_method(method))
            .cloned()
            .collect(),
    };

    Ok(PipelineOutcome {
        level: config.level.clone(),
        nodes,
        run,
    })
}

fn select_tests<T: Toolchain>(
    compiler: &SourceCompiler<T>,
    filter: Option<&[String]>,
) -> Result<Vec<CompilationUnit>, Error> {
    let Some(patterns) = filter else {
        return Ok(compiler.units().to_vec());
    };
    let names = compiler.unit_names();
    let (selected, invalid) = resolve_unit_patterns(&names, patterns);

    if !invalid.is_empty() {
        println!("Warning: the following test patterns did not match any compiled unit:");
        for pattern in &invalid {
            println!("  {pattern}");
        }
    }
    if selected.is_empty() {
        return Err(Error::NoMatchingTests);
    }

    Ok(compiler
        .units()
        .iter()
        .filter(|unit| selected.contains(&unit.name))
        .cloned()
        .collect())
}
