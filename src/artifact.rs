use crate::types::errors::Error;
use crate::utils::paths::{UNIT_SUFFIX, package_prefix, unit_name, unit_path};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

/// Resolves binary unit bytes from the artifact under test: an exploded
/// archive laid out as one file per unit.
///
/// In-memory overrides shadow the backing tree, so a later stage can
/// re-read a name and observe independently registered (e.g. instrumented)
/// bytes instead of the originals.
pub struct ArtifactLoader {
    root: PathBuf,
    overrides: Mutex<HashMap<String, Vec<u8>>>,
}

impl ArtifactLoader {
    pub fn new(root: &Path) -> Result<Self, Error> {
        if !root.is_dir() {
            return Err(Error::NotADirectory(root.display().to_string()));
        }
        Ok(ArtifactLoader {
            root: root.to_path_buf(),
            overrides: Mutex::new(HashMap::new()),
        })
    }

    /// Registers an in-memory definition that shadows the backing tree.
    pub fn register_override(&self, name: &str, bytes: Vec<u8>) {
        self.overrides
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes);
    }

    /// Reads the bytes of a named unit, override first, then the tree.
    pub fn read_unit(&self, name: &str) -> Result<Vec<u8>, Error> {
        if let Some(bytes) = self.overrides.lock().unwrap().get(name) {
            return Ok(bytes.clone());
        }
        let path = self.root.join(unit_path(name));
        if !path.is_file() {
            return Err(Error::UnitNotFound(name.to_string()));
        }
        // fs::read opens, reads and closes the handle on every path
        Ok(fs::read(&path)?)
    }

    /// Enumerates all unit names under a package prefix, sorted.
    pub fn scan_package(&self, package: &str) -> Result<Vec<String>, Error> {
        let prefix = package_prefix(package);
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());
            let binary = relative.to_string_lossy().replace('\\', "/");
            if binary.starts_with(&prefix) && binary.ends_with(UNIT_SUFFIX) {
                names.push(unit_name(&binary));
            }
        }
        names.sort();
        Ok(names)
    }
}
