//! Line-oriented source buffer shared by the emitters.
//!
//! One sink is created per artifact. It knows nothing about the target
//! language beyond an indentation unit and a table of import aliases.

use crate::error::{Diagnostic, Phase, Result};

use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
pub struct Sink {
    lines: Vec<String>,
    depth: usize,
    indent: &'static str,
    local: Option<String>,
    aliases: &'static [(&'static str, &'static str)],
    imports: BTreeMap<String, String>,
    declared: HashMap<String, String>,
}

impl Sink {
    /// `local` is the import path of the package being written, if it has one;
    /// qualified names from it are emitted bare.
    pub fn new(
        indent: &'static str,
        local: Option<&str>,
        aliases: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            lines: vec![],
            depth: 0,
            indent,
            local: local.map(str::to_string),
            aliases,
            imports: BTreeMap::new(),
            declared: HashMap::new(),
        }
    }

    pub fn line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if line.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines
                .push(format!("{}{line}", self.indent.repeat(self.depth)));
        }
    }

    /// Writes a multi-line snippet at the current depth. Leading and
    /// trailing blank lines of the snippet are dropped.
    pub fn text(&mut self, text: &str) {
        let text = text.trim_matches('\n');
        for line in text.lines() {
            self.line(line.trim_end());
        }
    }

    /// Separates declarations. Never produces two blank lines in a row, nor
    /// a blank line at the start of the buffer or right after an opening line.
    pub fn blank(&mut self) {
        match self.lines.last() {
            None => {}
            Some(last) if last.is_empty() || last.ends_with('{') || last.ends_with('(') => {}
            Some(_) => self.lines.push(String::new()),
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// `header {` + indented body + `}`.
    pub fn block(&mut self, header: impl AsRef<str>, body: impl FnOnce(&mut Self)) {
        self.block_with(format!("{} {{", header.as_ref()), "}", body)
    }

    pub fn block_with(
        &mut self,
        open: impl AsRef<str>,
        close: impl AsRef<str>,
        body: impl FnOnce(&mut Self),
    ) {
        self.line(open);
        self.indent();
        body(self);
        // a block never ends with a blank line
        while self.lines.last().is_some_and(String::is_empty) {
            self.lines.pop();
        }
        self.dedent();
        self.line(close);
    }

    /// Writes rows with every column but the last padded to a common width.
    pub fn rows(&mut self, rows: &[Vec<String>]) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or_default();
        let mut widths = vec![0; columns];
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i + 1 < row.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }
        for row in rows {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i + 1 < row.len() {
                    line.push_str(&format!("{cell:<width$} ", width = widths[i]));
                } else {
                    line.push_str(cell);
                }
            }
            self.line(line.trim_end());
        }
    }

    /// Registers an import and returns its alias.
    pub fn import(&mut self, path: &str) -> String {
        if let Some(alias) = self.imports.get(path) {
            return alias.clone();
        }
        let base = self
            .aliases
            .iter()
            .find(|(known, _)| *known == path)
            .map(|(_, alias)| alias.to_string())
            .unwrap_or_else(|| default_alias(path));

        let mut alias = base.clone();
        let mut n = 2;
        while self.imports.values().any(|taken| *taken == alias) {
            alias = format!("{base}{n}");
            n += 1;
        }
        self.imports.insert(path.to_string(), alias.clone());
        alias
    }

    /// `alias.name`, or the bare name for the local package.
    pub fn qual(&mut self, path: &str, name: &str) -> String {
        if self.local.as_deref() == Some(path) {
            return name.to_string();
        }
        format!("{}.{name}", self.import(path))
    }

    /// Records a top-level identifier; a second declaration of the same
    /// identifier is a [`NameCollision`](crate::DiagnosticKind::NameCollision).
    pub fn declare(&mut self, name: &str, source: &str) -> Result<()> {
        if let Some(first) = self.declared.get(name) {
            return Err(Diagnostic::name_collision(Phase::Emit, name, first, source));
        }
        self.declared.insert(name.to_string(), source.to_string());
        Ok(())
    }

    pub fn declared(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declared
            .iter()
            .map(|(name, source)| (name.as_str(), source.as_str()))
    }

    /// Imports sorted by path, with their aliases.
    pub fn imports(&self) -> &BTreeMap<String, String> {
        &self.imports
    }

    /// The buffered body, terminated by a single newline.
    pub fn body(&self) -> String {
        let mut end = self.lines.len();
        while end > 0 && self.lines[end - 1].is_empty() {
            end -= 1;
        }
        let mut out = self.lines[..end].join("\n");
        out.push('\n');
        out
    }
}

/// Last path segment, skipping a trailing major-version segment such as `v5`.
fn default_alias(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let is_version =
        last.len() > 1 && last.starts_with('v') && last[1..].chars().all(|c| c.is_ascii_digit());
    let segment = if is_version {
        segments.next().unwrap_or(last)
    } else {
        last
    };
    segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
