mod builders;
mod components;
mod operations;
mod router;
mod runtime;
mod security;
mod types;

pub use types::GoType;

use crate::error::Result;
use crate::v3::codegen::backend::{Artifact, CodegenBackend};
use crate::v3::codegen::ir::{Program, SchemaIr};
use crate::v3::codegen::sink::Sink;
use crate::{Case, Casing};

use log::debug;
use std::collections::BTreeSet;

pub const GENERATED_HEADER: &str = "// Code generated by oas3-servergen. DO NOT EDIT.";

const INDENT: &str = "\t";

/// Packages whose name differs from the last segment of their import path.
pub const IMPORT_ALIASES: &[(&str, &str)] = &[
    ("github.com/go-chi/chi/v5", "chi"),
    ("github.com/go-ozzo/ozzo-validation/v4", "validation"),
];

pub const CHI: &str = "github.com/go-chi/chi/v5";
pub const VALIDATION: &str = "github.com/go-ozzo/ozzo-validation/v4";
pub const UUID: &str = "github.com/google/uuid";
pub const COUNTRY: &str = "github.com/mikekonan/go-types/v2/country";
pub const CURRENCY: &str = "github.com/mikekonan/go-types/v2/currency";
pub const EMAIL: &str = "github.com/mikekonan/go-types/v2/email";

pub const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return",
    "select", "struct", "switch", "type", "var",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

pub fn fix_name_if_keyword(name: &mut String) {
    if is_keyword(name.as_str()) {
        name.push('_');
    }
}

/// Unexported identifier derived from an exported one.
pub fn format_var_name(name: &str) -> String {
    let mut name = name.to_case(Case::Camel);
    fix_name_if_keyword(&mut name);
    name
}

/// Interpreted Go string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Raw string literal when possible, for regular expressions.
pub fn quote_pattern(pattern: &str) -> String {
    if pattern.contains('`') || pattern.contains('\r') {
        quote(pattern)
    } else {
        format!("`{pattern}`")
    }
}

pub fn comment(sink: &mut Sink, name: &str, text: Option<&str>) {
    let Some(text) = text.map(str::trim).filter(|text| !text.is_empty()) else {
        return;
    };
    let mut lines = text.lines();
    if let Some(first) = lines.next() {
        sink.line(format!("// {name} {}", first.trim()));
    }
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            sink.line("//");
        } else {
            sink.line(format!("// {line}"));
        }
    }
}

/// Per-artifact view of the program.
pub(crate) struct Context<'p> {
    pub program: &'p Program,
    /// Import path of the components package when it is not the package being written.
    pub components: Option<&'p str>,
    validated: BTreeSet<String>,
}

impl<'p> Context<'p> {
    pub fn new(program: &'p Program, components: Option<&'p str>) -> Self {
        let mut context = Self {
            program,
            components,
            validated: BTreeSet::new(),
        };
        // a component validates when one of its fields has a rule, which may
        // itself be "validate the nested component"
        loop {
            let found: Vec<String> = program
                .components
                .values()
                .filter(|component| !context.validated.contains(&component.name))
                .filter(|component| context.component_validates(component))
                .map(|component| component.name.clone())
                .collect();
            if found.is_empty() {
                break;
            }
            context.validated.extend(found);
        }
        debug!("{} components carry validators", context.validated.len());
        context
    }

    /// A component declared in the components artifact.
    pub fn component(&self, sink: &mut Sink, name: &str) -> String {
        match self.components {
            Some(path) => sink.qual(path, name),
            None => name.to_string(),
        }
    }

    pub fn has_validator(&self, name: &str) -> bool {
        self.validated.contains(name)
    }

    /// Whether values of this schema have a `Validate` method worth calling.
    pub fn validates(&self, schema: &SchemaIr) -> bool {
        match schema {
            SchemaIr::Named(name) => self.has_validator(name),
            SchemaIr::Array { element, .. } => self.validates(element),
            _ => false,
        }
    }

    pub fn resolve<'s>(&'s self, schema: &'s SchemaIr) -> &'s SchemaIr {
        self.program.resolve(schema)
    }
}

#[derive(Default)]
pub struct Codegen {
    // components declared in the router package, when both artifacts share it
    shared_declarations: Vec<(String, String)>,
}

impl CodegenBackend for Codegen {
    fn generate_components(&mut self, program: &Program) -> Result<Artifact> {
        let config = &program.config;
        let local = config
            .components_package
            .as_deref()
            .unwrap_or(&config.package);
        let mut sink = Sink::new(INDENT, Some(local), IMPORT_ALIASES);

        debug!("generating components artifact");
        Context::new(program, None).emit_components(&mut sink)?;

        self.shared_declarations = if config.components_import_path().is_none() {
            let mut declared: Vec<_> = sink
                .declared()
                .map(|(name, source)| (name.to_string(), source.to_string()))
                .collect();
            declared.sort();
            declared
        } else {
            vec![]
        };

        Ok(Artifact {
            path: config.components_file(),
            contents: render(&sink, &config.components_package_name()),
        })
    }

    fn generate_router(&mut self, program: &Program) -> Result<Artifact> {
        let config = &program.config;
        let mut sink = Sink::new(INDENT, Some(&config.package), IMPORT_ALIASES);
        for (name, source) in &self.shared_declarations {
            sink.declare(name, source)?;
        }

        debug!("generating router artifact");
        Context::new(program, config.components_import_path()).emit_router(&mut sink)?;

        Ok(Artifact {
            path: config.router_file(),
            contents: render(&sink, &config.router_package_name()),
        })
    }
}

/// Header, package clause, grouped imports and body.
fn render(sink: &Sink, package: &str) -> String {
    let mut out = format!("{GENERATED_HEADER}\n\npackage {package}\n");

    let (std, external): (Vec<_>, Vec<_>) = sink
        .imports()
        .iter()
        .partition(|(path, _)| !path.split('/').next().unwrap_or_default().contains('.'));
    if !std.is_empty() || !external.is_empty() {
        out.push_str("\nimport (\n");
        for (i, group) in [std, external].into_iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            if i > 0 && !out.ends_with("(\n") {
                out.push('\n');
            }
            for (path, alias) in group {
                if path.rsplit('/').next() == Some(alias.as_str()) {
                    out.push_str(&format!("\t{}\n", quote(path)));
                } else {
                    out.push_str(&format!("\t{alias} {}\n", quote(path)));
                }
            }
        }
        out.push_str(")\n");
    }

    out.push('\n');
    out.push_str(&sink.body());
    out
}
