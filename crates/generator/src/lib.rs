//! API generator for the guest-image library
//!
//! From the single compiled-in API table this emits every artefact the
//! build needs: the XDR wire schema, the public C headers, client stubs,
//! daemon dispatch stubs, the interactive shell's command layer, OCaml
//! and Perl bindings, and the manual pages.  Adding a call to the table
//! in [`api`] is the single edit that updates all of them.
//!
//! The pipeline is batch and deterministic: validate the model, then for
//! each artefact build the full text in memory and write it through an
//! atomic rename, so readers never see a torn file.

pub mod api;
pub mod backends;
pub mod banner;
pub mod model;
pub mod signature;
pub mod sink;
pub mod validator;

pub use api::api_model;
pub use backends::{artefacts, EmitError};
pub use model::Model;

use sink::Sink;
use std::io;
use std::path::Path;

/// Top-level generator error.
#[derive(Debug)]
pub enum GenError {
    /// The API table violates a model invariant.
    Invalid(String),
    /// A backend could not emit its artefact.
    Emit(EmitError),
    /// Writing an output file failed.
    Io(io::Error),
}

impl std::fmt::Display for GenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenError::Invalid(s) => write!(f, "invalid API table: {}", s),
            GenError::Emit(e) => write!(f, "{}", e),
            GenError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for GenError {}

impl From<EmitError> for GenError {
    fn from(e: EmitError) -> Self {
        GenError::Emit(e)
    }
}

impl From<io::Error> for GenError {
    fn from(e: io::Error) -> Self {
        GenError::Io(e)
    }
}

/// Validate the model only; nothing is written.
pub fn check(model: &Model) -> Result<(), GenError> {
    validator::validate(model).map_err(GenError::Invalid)
}

/// Validate the model, then write every artefact under `outdir`.
///
/// Artefacts are generated sequentially; a failure part way through
/// leaves earlier files at the new generation and later ones untouched,
/// which a re-run repairs.
pub fn generate_all(model: &Model, outdir: &Path) -> Result<(), GenError> {
    check(model)?;

    for artefact in backends::artefacts() {
        let text = (artefact.generate)(model)?;
        tracing::debug!(path = artefact.path, bytes = text.len(), "generated");
        let mut sink = Sink::create(&outdir.join(artefact.path))?;
        sink.write_str(&text)?;
        sink.commit()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Call, ReturnKind};
    use std::fs;

    #[test]
    fn test_generate_all_writes_every_artefact() {
        let dir = tempfile::tempdir().unwrap();
        let model = api_model();
        generate_all(&model, dir.path()).unwrap();

        for artefact in artefacts() {
            let path = dir.path().join(artefact.path);
            assert!(path.exists(), "{} was not written", artefact.path);
            let text = fs::read_to_string(&path).unwrap();
            assert!(text.contains("generated file"));
        }
    }

    #[test]
    fn test_regeneration_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let model = api_model();
        generate_all(&model, dir.path()).unwrap();
        let first: Vec<Vec<u8>> = artefacts()
            .iter()
            .map(|a| fs::read(dir.path().join(a.path)).unwrap())
            .collect();

        generate_all(&model, dir.path()).unwrap();
        for (artefact, before) in artefacts().iter().zip(first) {
            let after = fs::read(dir.path().join(artefact.path)).unwrap();
            assert_eq!(before, after, "{} changed between runs", artefact.path);
        }
    }

    #[test]
    fn test_invalid_model_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let model = Model {
            calls: vec![
                Call::daemon("a", 7, ReturnKind::Err, vec![]),
                Call::daemon("b", 7, ReturnKind::Err, vec![]),
            ],
        };

        let err = generate_all(&model, dir.path()).unwrap_err();
        assert!(matches!(err, GenError::Invalid(_)));
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
