use crate::artifact::ArtifactLoader;
use crate::loader::IsolatedLoader;
use crate::types::errors::Error;
use crate::types::models::TargetUnit;

/// External bytecode rewriter injecting coverage probes into one unit.
pub trait ProbeRewriter {
    fn instrument(&self, target: &TargetUnit) -> Result<Vec<u8>, Error>;
}

impl<R: ProbeRewriter + ?Sized> ProbeRewriter for &R {
    fn instrument(&self, target: &TargetUnit) -> Result<Vec<u8>, Error> {
        (**self).instrument(target)
    }
}

/// Fetches original unit bytes from the artifact, rewrites them with
/// probes and defines the result into the isolated loader, shadowing any
/// classpath-visible definition of the same name.
pub struct Instrumenter<'a, R: ProbeRewriter> {
    artifact: &'a ArtifactLoader,
    rewriter: R,
}

impl<'a, R: ProbeRewriter> Instrumenter<'a, R> {
    pub fn new(artifact: &'a ArtifactLoader, rewriter: R) -> Self {
        Instrumenter { artifact, rewriter }
    }

    /// Instruments each named unit into the loader's defining table and
    /// registers the instrumented bytes as an artifact override so the
    /// analysis stage re-reads them by name.
    ///
    /// With `skip_missing`, a name absent from the artifact is skipped
    /// with a warning instead of failing the run; rewriter rejections
    /// always abort. Returns the names actually instrumented.
    pub fn instrument_into(
        &self,
        names: &[String],
        loader: &mut IsolatedLoader<'_>,
        skip_missing: bool,
    ) -> Result<Vec<String>, Error> {
        let mut instrumented_names = Vec::with_capacity(names.len());
        for name in names {
            // per-unit scope: the target's byte buffer is released before
            // the next unit is processed
            let target = match self.artifact.read_unit(name) {
                Ok(bytes) => TargetUnit {
                    name: name.clone(),
                    bytes,
                },
                Err(Error::UnitNotFound(missing)) if skip_missing => {
                    println!("Warning: skipping '{missing}': not present in the artifact");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let instrumented = self.rewriter.instrument(&target)?;
            self.artifact.register_override(&target.name, instrumented.clone());
            loader.add_definition(&target.name, instrumented);
            instrumented_names.push(target.name);
        }
        Ok(instrumented_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::CompiledLoader;
    use std::fs;
    use tempfile::tempdir;

    struct TagRewriter;

    impl ProbeRewriter for TagRewriter {
        fn instrument(&self, target: &TargetUnit) -> Result<Vec<u8>, Error> {
            let mut rewritten = target.bytes.clone();
            rewritten.extend_from_slice(b"+probes");
            Ok(rewritten)
        }
    }

    struct RejectingRewriter;

    impl ProbeRewriter for RejectingRewriter {
        fn instrument(&self, target: &TargetUnit) -> Result<Vec<u8>, Error> {
            Err(Error::Instrumentation {
                name: target.name.clone(),
                reason: "bad magic".to_string(),
            })
        }
    }

    fn artifact_with(binary: &str, bytes: &[u8]) -> (tempfile::TempDir, ArtifactLoader) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(binary);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        let artifact = ArtifactLoader::new(dir.path()).unwrap();
        (dir, artifact)
    }

    #[test]
    fn defines_rewritten_bytes_and_override() {
        let (_dir, artifact) = artifact_with("a/C.unit", b"raw");
        let mut loader = IsolatedLoader::new(CompiledLoader::new(&artifact));
        let instrumenter = Instrumenter::new(&artifact, TagRewriter);

        let done = instrumenter
            .instrument_into(&["a.C".to_string()], &mut loader, false)
            .unwrap();

        assert_eq!(done, vec!["a.C".to_string()]);
        assert_eq!(loader.load("a.C").unwrap(), b"raw+probes");
        // the analysis stage re-reads by name and sees the instrumented bytes
        assert_eq!(artifact.read_unit("a.C").unwrap(), b"raw+probes");
    }

    #[test]
    fn missing_unit_fails_or_skips() {
        let (_dir, artifact) = artifact_with("a/C.unit", b"raw");
        let mut loader = IsolatedLoader::new(CompiledLoader::new(&artifact));
        let instrumenter = Instrumenter::new(&artifact, TagRewriter);
        let names = vec!["a.Missing".to_string(), "a.C".to_string()];

        assert!(matches!(
            instrumenter.instrument_into(&names, &mut loader, false),
            Err(Error::UnitNotFound(_))
        ));

        let done = instrumenter
            .instrument_into(&names, &mut loader, true)
            .unwrap();
        assert_eq!(done, vec!["a.C".to_string()]);
    }

    #[test]
    fn rewriter_rejection_aborts_even_when_skipping() {
        let (_dir, artifact) = artifact_with("a/C.unit", b"raw");
        let mut loader = IsolatedLoader::new(CompiledLoader::new(&artifact));
        let instrumenter = Instrumenter::new(&artifact, RejectingRewriter);

        assert!(matches!(
            instrumenter.instrument_into(&["a.C".to_string()], &mut loader, true),
            Err(Error::Instrumentation { .. })
        ));
    }
}
