use crate::artifact::ArtifactLoader;
use crate::types::errors::Error;
use std::collections::HashMap;

/// Named lookup with ordered fallback, the seam the execution collaborator
/// uses to resolve every unit it touches.
pub trait UnitResolver {
    fn resolve(&self, name: &str) -> Result<Vec<u8>, Error>;
}

/// Tier A: compiled test units, falling back to the artifact classpath for
/// any name not in its table.
pub struct CompiledLoader<'a> {
    table: HashMap<String, Vec<u8>>,
    classpath: &'a ArtifactLoader,
}

impl<'a> CompiledLoader<'a> {
    pub fn new(classpath: &'a ArtifactLoader) -> Self {
        CompiledLoader {
            table: HashMap::new(),
            classpath,
        }
    }

    pub fn define(&mut self, name: &str, bytes: Vec<u8>) {
        self.table.insert(name.to_string(), bytes);
    }
}

impl UnitResolver for CompiledLoader<'_> {
    fn resolve(&self, name: &str) -> Result<Vec<u8>, Error> {
        match self.table.get(name) {
            Some(bytes) => Ok(bytes.clone()),
            None => self.classpath.read_unit(name),
        }
    }
}

/// Tier B: instrumented units plus the test units copied in just before
/// execution, falling back to tier A only.
///
/// The local table is consulted before any delegation, so an instrumented
/// definition always wins over the raw classpath bytes of the same name.
pub struct IsolatedLoader<'a> {
    definitions: HashMap<String, Vec<u8>>,
    parent: CompiledLoader<'a>,
}

impl<'a> IsolatedLoader<'a> {
    pub fn new(parent: CompiledLoader<'a>) -> Self {
        IsolatedLoader {
            definitions: HashMap::new(),
            parent,
        }
    }

    pub fn add_definition(&mut self, name: &str, bytes: Vec<u8>) {
        self.definitions.insert(name.to_string(), bytes);
    }

    /// Resolves a unit through the defining table, then tier A, then the
    /// classpath behind it.
    pub fn load(&self, name: &str) -> Result<Vec<u8>, Error> {
        match self.definitions.get(name) {
            Some(bytes) => Ok(bytes.clone()),
            None => self.parent.resolve(name),
        }
    }
}

impl UnitResolver for IsolatedLoader<'_> {
    fn resolve(&self, name: &str) -> Result<Vec<u8>, Error> {
        self.load(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn classpath_with(binary: &str, bytes: &[u8]) -> (tempfile::TempDir, ArtifactLoader) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(binary);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        let artifact = ArtifactLoader::new(dir.path()).unwrap();
        (dir, artifact)
    }

    #[test]
    fn instrumented_definition_wins_over_classpath() {
        let (_dir, artifact) = classpath_with("a/C.unit", b"original");
        let compiled = CompiledLoader::new(&artifact);
        let mut isolated = IsolatedLoader::new(compiled);

        assert_eq!(isolated.load("a.C").unwrap(), b"original");

        isolated.add_definition("a.C", b"instrumented".to_vec());
        assert_eq!(isolated.load("a.C").unwrap(), b"instrumented");
    }

    #[test]
    fn tier_a_table_shadows_classpath() {
        let (_dir, artifact) = classpath_with("a/C.unit", b"original");
        let mut compiled = CompiledLoader::new(&artifact);
        compiled.define("a.C", b"compiled".to_vec());

        assert_eq!(compiled.resolve("a.C").unwrap(), b"compiled");
    }

    #[test]
    fn unknown_name_in_every_tier_is_not_found() {
        let (_dir, artifact) = classpath_with("a/C.unit", b"original");
        let isolated = IsolatedLoader::new(CompiledLoader::new(&artifact));
        assert!(matches!(
            isolated.load("a.Missing"),
            Err(Error::UnitNotFound(_))
        ));
    }
}
