pub mod backend;
pub mod ir;
pub mod lowerer;
pub mod sink;

use crate::config::Config;
use crate::error::Result;
use crate::v3::codegen::backend::{go, Artifact, CodegenBackend};
use crate::v3::codegen::ir::Program;
use crate::v3::codegen::lowerer::Lowerer;
use crate::v3::Document;
use crate::writer::Writer;

use log::{debug, info};
use std::path::PathBuf;

/// Lowers loaded documents into a [`Program`].
#[derive(Debug, Clone)]
pub struct Compiler {
    config: Config,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn compile(&self, document: &Document) -> Result<Program> {
        debug!("compiling `{}`", document.spec.info.title);
        let program =
            Lowerer::new(&document.spec).lower(document.canonical_json(), self.config.clone())?;
        program.check_ref_closure()?;
        Ok(program)
    }
}

impl Program {
    /// Components and router artifacts emitted by the Go backend.
    pub fn artifacts(&self) -> Result<Vec<Artifact>> {
        self.artifacts_with(&mut go::Codegen::default())
    }

    pub fn artifacts_with(&self, backend: &mut dyn CodegenBackend) -> Result<Vec<Artifact>> {
        let components = backend.generate_components(self)?;
        let router = backend.generate_router(self)?;
        Ok(vec![components, router])
    }

    /// Emits every artifact before writing any, so a failing emission leaves
    /// the output directories untouched.
    pub fn render(&self, writer: &dyn Writer) -> Result<Vec<PathBuf>> {
        let artifacts = self.artifacts()?;
        let mut written = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            writer.write(artifact)?;
            info!("wrote {}", artifact.path.display());
            written.push(artifact.path.clone());
        }
        Ok(written)
    }
}
