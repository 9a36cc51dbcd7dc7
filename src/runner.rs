use crate::loader::{IsolatedLoader, UnitResolver};
use crate::types::errors::Error;
use crate::types::models::{CompilationUnit, RunReport, TestResult, TestStatus};

/// External test-execution collaborator. Drives one loaded test unit and
/// reports its outcome; test failures are returned, never propagated.
pub trait TestDriver {
    fn run(&self, name: &str, bytes: &[u8], resolver: &dyn UnitResolver) -> TestResult;
}

impl<D: TestDriver + ?Sized> TestDriver for &D {
    fn run(&self, name: &str, bytes: &[u8], resolver: &dyn UnitResolver) -> TestResult {
        (**self).run(name, bytes, resolver)
    }
}

/// Loads each compiled test unit through the isolated tier and drives it,
/// so test code and instrumented target code resolve through one defining
/// loader and probe hits land in the shared session.
pub struct ExecutionRunner<D: TestDriver> {
    driver: D,
}

impl<D: TestDriver> ExecutionRunner<D> {
    pub fn new(driver: D) -> Self {
        ExecutionRunner { driver }
    }

    /// Runs every test unit in order. A failing test never aborts the
    /// remaining units; its result is recorded and the run proceeds.
    pub fn run_all(
        &self,
        tests: &[CompilationUnit],
        loader: &mut IsolatedLoader<'_>,
    ) -> Result<RunReport, Error> {
        let mut report = RunReport::default();
        for test in tests {
            // copy the test unit into the defining tier before loading it
            loader.add_definition(&test.name, test.bytes.clone());
            let bytes = loader.load(&test.name)?;
            let result = self.driver.run(&test.name, &bytes, loader);
            match &result.status {
                TestStatus::Passed => println!("  {} ... ok", result.name),
                TestStatus::Failed(reason) => println!("  {} ... FAILED: {reason}", result.name),
            }
            report.results.push(result);
        }
        Ok(report)
    }
}
