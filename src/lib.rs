//! Compiles OpenAPI 3 documents into Go HTTP server scaffolding.
//!
//! ```no_run
//! use oas3_servergen::{Config, FsLoader, FsWriter};
//!
//! let config = Config::new("api", "internal/api");
//! oas3_servergen::generate(config, &FsLoader, &FsWriter).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod name;
pub mod v3;
pub mod writer;

pub use config::Config;
pub use convert_case::{Case, Casing};
pub use error::{Diagnostic, DiagnosticKind, Phase, Result};
pub use loader::{FsLoader, Loader};
pub use v3::codegen::backend::Artifact;
pub use v3::codegen::ir::Program;
pub use v3::codegen::Compiler;
pub use v3::Document;
pub use writer::{FsWriter, Writer};

use std::path::PathBuf;

/// Loads `config.swagger_addr`, compiles it and writes both artifacts.
pub fn generate(config: Config, loader: &dyn Loader, writer: &dyn Writer) -> Result<Vec<PathBuf>> {
    let document = loader.load(&config.swagger_addr)?;
    Compiler::new(config).compile(&document)?.render(writer)
}
