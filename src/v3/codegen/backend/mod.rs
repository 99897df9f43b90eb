pub mod go;

use crate::error::Result;
use crate::v3::codegen::ir::Program;

use std::path::PathBuf;

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

pub trait CodegenBackend {
    /// DTOs, enums, decoders, validators and the processing result taxonomy.
    fn generate_components(&mut self, program: &Program) -> Result<Artifact>;

    /// Request parsers, response builders, services, routers and hooks.
    fn generate_router(&mut self, program: &Program) -> Result<Artifact>;
}
