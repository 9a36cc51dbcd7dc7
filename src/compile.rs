use crate::types::errors::Error;
use crate::types::models::CompilationUnit;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// External compiler toolchain: one source text in, zero or more binary
/// units out (a single source may emit nested units).
pub trait Toolchain {
    fn compile(&self, source: &str) -> Result<Vec<CompilationUnit>, Error>;
}

impl<T: Toolchain + ?Sized> Toolchain for &T {
    fn compile(&self, source: &str) -> Result<Vec<CompilationUnit>, Error> {
        (**self).compile(source)
    }
}

/// Discovers every test source under a root directory and compiles each
/// file through the toolchain, accumulating the emitted units.
pub struct SourceCompiler<T: Toolchain> {
    toolchain: T,
    units: Vec<CompilationUnit>,
}

impl<T: Toolchain> SourceCompiler<T> {
    pub fn new(toolchain: T) -> Self {
        SourceCompiler {
            toolchain,
            units: Vec::new(),
        }
    }

    /// Recursively compiles every file under `root`, depth-first in sorted
    /// order so reports are reproducible. The accumulated unit list is
    /// read-only once this returns.
    pub fn generate_all(&mut self, root: &Path) -> Result<(), Error> {
        if !root.is_dir() {
            return Err(Error::NotADirectory(root.display().to_string()));
        }
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_dir() {
                continue;
            }
            let source = fs::read_to_string(entry.path())?;
            let mut emitted = self.toolchain.compile(&source)?;
            self.units.append(&mut emitted);
        }
        Ok(())
    }

    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    pub fn unit_names(&self) -> Vec<String> {
        self.units.iter().map(|unit| unit.name.clone()).collect()
    }
}
