use crate::error::{Diagnostic, Result};
use crate::v3::Document;

use log::debug;
use std::fs;

/// Source of OpenAPI documents.
pub trait Loader {
    fn load(&self, addr: &str) -> Result<Document>;
}

/// Reads local files and fetches `http(s)://` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl Loader for FsLoader {
    fn load(&self, addr: &str) -> Result<Document> {
        let text = if is_url(addr) {
            fetch(addr)?
        } else {
            debug!("reading `{addr}`");
            fs::read_to_string(addr).map_err(|e| {
                Diagnostic::load_failed(addr, "failed to read document").with_source(e)
            })?
        };
        Document::from_text(&text, addr)
    }
}

fn is_url(addr: &str) -> bool {
    addr.starts_with("http://") || addr.starts_with("https://")
}

fn fetch(url: &str) -> Result<String> {
    debug!("fetching `{url}`");
    let failed = |e: reqwest::Error| {
        Diagnostic::load_failed(url, "failed to fetch document").with_source(e)
    };
    reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(failed)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DiagnosticKind;

    use std::io::Write;

    #[test]
    fn loads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "openapi: 3.0.0\ninfo:\n  title: files\n  version: \"1\"\npaths: {{}}\n"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let document = FsLoader.load(&path).unwrap();
        assert_eq!(document.spec.info.title, "files");
    }

    #[test]
    fn missing_file_is_load_failed() {
        let err = FsLoader.load("does/not/exist.yaml").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::LoadFailed);
        assert_eq!(err.location.as_deref(), Some("does/not/exist.yaml"));
    }

    #[test]
    fn urls() {
        assert!(is_url("https://example.com/openapi.yaml"));
        assert!(!is_url("specs/http.yaml"));
    }
}
