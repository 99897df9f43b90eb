use crate::error::{Diagnostic, Result};
use crate::v3::codegen::backend::Artifact;

use log::trace;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Destination of generated artifacts.
pub trait Writer {
    /// Replaces the file at `artifact.path` with the artifact contents.
    fn write(&self, artifact: &Artifact) -> Result<()>;
}

/// Writes artifacts to disk, creating missing directories. Each file is
/// written to a temporary sibling and renamed over the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWriter;

impl Writer for FsWriter {
    fn write(&self, artifact: &Artifact) -> Result<()> {
        let path = &artifact.path;
        let failed = |e| Diagnostic::write_failed(path.display().to_string(), e);
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        trace!("writing {} bytes to {}", artifact.contents.len(), path.display());
        fs::create_dir_all(dir).map_err(failed)?;
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(failed)?;
        file.write_all(artifact.contents.as_bytes()).map_err(failed)?;
        file.persist(path).map_err(|e| failed(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DiagnosticKind;

    #[test]
    fn replaces_files_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api").join("router.go");
        let mut artifact = Artifact {
            path: path.clone(),
            contents: "package api\n\nvar first = 1\n".into(),
        };
        FsWriter.write(&artifact).unwrap();
        artifact.contents = "package api\n".into();
        FsWriter.write(&artifact).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "package api\n");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn reports_write_failed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let artifact = Artifact {
            path: blocker.join("router.go"),
            contents: String::new(),
        };
        let err = FsWriter.write(&artifact).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::WriteFailed);
    }
}
