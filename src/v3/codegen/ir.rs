//! Closed intermediate representation produced by the lowerer.
//!
//! Built once per document and read-only during emission.

use crate::config::Config;
use crate::error::{Diagnostic, Phase, Result};

use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// `import/path.Name`, or a bare builtin name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub package: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(package: Option<&str>, name: &str) -> Self {
        Self {
            package: package.map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (dir, tail) = match raw.rfind('/') {
            Some(i) => (&raw[..=i], &raw[i + 1..]),
            None => ("", raw),
        };
        match tail.find('.') {
            Some(dot) => {
                let (package, name) = (&tail[..dot], &tail[dot + 1..]);
                if package.is_empty() || name.is_empty() || name.contains('.') {
                    return None;
                }
                Some(Self {
                    package: Some(format!("{dir}{package}")),
                    name: name.to_string(),
                })
            }
            None if dir.is_empty() && !tail.is_empty() => Some(Self::new(None, tail)),
            None => None,
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{package}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Float,
    String,
    Bytes,
    Time,
    Uuid,
    Email,
    RawJson,
    CountryA2,
    CountryA3,
    CurrencyCode,
}

impl PrimitiveKind {
    /// Kinds whose runtime representation is a string.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::String
                | PrimitiveKind::Time
                | PrimitiveKind::Email
                | PrimitiveKind::CountryA2
                | PrimitiveKind::CountryA3
                | PrimitiveKind::CurrencyCode
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PrimitiveKind::Int | PrimitiveKind::Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub format_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalPolicy {
    /// Extra keys are not represented.
    Forbidden,
    Any,
    Typed(Box<SchemaIr>),
    GoMapType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectIr {
    pub fields: IndexMap<String, Field>,
    pub required: BTreeSet<String>,
    pub additional: AdditionalPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumLiteral {
    String(String),
    Int(i64),
}

impl fmt::Display for EnumLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumLiteral::String(s) => write!(f, "{s}"),
            EnumLiteral::Int(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub tag: String,
    pub literal: EnumLiteral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumIr {
    pub base: PrimitiveKind,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomType {
    pub target: QualifiedName,
    pub parse_fn: Option<QualifiedName>,
    pub validate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaIr {
    Primitive(Primitive),
    Array {
        element: Box<SchemaIr>,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
    Object(ObjectIr),
    Enum(EnumIr),
    Named(String),
    AnyOf(Vec<SchemaIr>),
    OneOf(Vec<SchemaIr>),
    AllOf(Vec<SchemaIr>),
    Custom(CustomType),
}

impl SchemaIr {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        SchemaIr::Primitive(Primitive {
            kind,
            format_hint: None,
        })
    }

    /// A field-less object; emitted as the opaque value type.
    pub fn opaque() -> Self {
        SchemaIr::Object(ObjectIr {
            fields: IndexMap::new(),
            required: BTreeSet::new(),
            additional: AdditionalPolicy::Forbidden,
        })
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            SchemaIr::Primitive(primitive) => Some(primitive.kind),
            _ => None,
        }
    }

    pub fn is_composition(&self) -> bool {
        matches!(
            self,
            SchemaIr::AnyOf(_) | SchemaIr::OneOf(_) | SchemaIr::AllOf(_)
        )
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            SchemaIr::Named(name) => out.push(name),
            SchemaIr::Array { element, .. } => element.collect_references(out),
            SchemaIr::Object(object) => {
                for field in object.fields.values() {
                    field.schema.collect_references(out);
                }
                if let AdditionalPolicy::Typed(value) = &object.additional {
                    value.collect_references(out);
                }
            }
            SchemaIr::AnyOf(members) | SchemaIr::OneOf(members) | SchemaIr::AllOf(members) => {
                for member in members {
                    member.collect_references(out);
                }
            }
            SchemaIr::Primitive(_) | SchemaIr::Enum(_) | SchemaIr::Custom(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optionality {
    /// Present and non-null; `nullable` only changes nothing but documentation.
    Required,
    /// Absent decodes to the zero value.
    Optional,
    /// Absent, null and value are three distinct observations.
    OptionalNullable,
    /// `x-go-pointer`: absent or null decode to nil.
    Pointer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub exclusive: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<Bound>,
    pub maximum: Option<Bound>,
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self == &Constraints::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub json_name: String,
    pub schema: SchemaIr,
    pub optionality: Optionality,
    pub omitempty: bool,
    /// `x-go-regex`: enforced while decoding, not by the validator.
    pub regex: Option<String>,
    pub constraints: Constraints,
    pub trimmable: bool,
    pub skip_validation: bool,
    pub description: Option<String>,
}

impl Field {
    pub fn is_required(&self) -> bool {
        self.optionality == Optionality::Required
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentOrigin {
    /// `components/schemas` key.
    Declared(String),
    /// Synthesised from an anonymous schema at this location.
    Inline(String),
}

impl fmt::Display for ComponentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentOrigin::Declared(key) => write!(f, "{}{key}", crate::v3::SCHEMAS_REF),
            ComponentOrigin::Inline(location) => write!(f, "{location}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub schema: SchemaIr,
    pub description: Option<String>,
    pub origin: ComponentOrigin,
    pub skip_validation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
}

impl ParamLocation {
    pub const ALL: [ParamLocation; 3] = [
        ParamLocation::Path,
        ParamLocation::Query,
        ParamLocation::Header,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ParamLocation::Path => "Path",
            ParamLocation::Query => "Query",
            ParamLocation::Header => "Header",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub field: Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyContent {
    pub content_type: String,
    pub tag: String,
    pub schema: SchemaIr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    pub contents: Vec<BodyContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Code(u16),
    /// `1XX` .. `5XX`
    Range(u8),
    Default,
}

impl Status {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == "default" {
            return Some(Status::Default);
        }
        if let Ok(code) = raw.parse::<u16>() {
            return (100..600).contains(&code).then_some(Status::Code(code));
        }
        let bytes = raw.as_bytes();
        if bytes.len() == 3 && bytes[1..].eq_ignore_ascii_case(b"xx") {
            let class = (bytes[0] as char).to_digit(10)?;
            return (1..=5).contains(&class).then_some(Status::Range(class as u8));
        }
        None
    }

    /// Suffix used in builder method and type names.
    pub fn label(&self) -> String {
        match self {
            Status::Code(code) => code.to_string(),
            Status::Range(class) => format!("{class}XX"),
            Status::Default => "Default".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHeader {
    pub name: String,
    pub field: Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub description: Option<String>,
    pub contents: Vec<BodyContent>,
    pub headers: Vec<ResponseHeader>,
}

/// Scheme names that must all pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub schemes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecuritySchemeKind {
    HttpBearer,
    HttpBasic,
    ApiKey { location: ApiKeyLocation, name: String },
    /// Only a name constant is emitted; extraction is user supplied.
    OAuth2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityScheme {
    pub name: String,
    pub kind: SecuritySchemeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub method: String,
    pub path: String,
    pub tag: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub responses: Vec<Response>,
    /// Alternatives; empty means no security.
    pub security: Vec<SecurityRequirement>,
    pub skip_security_check: bool,
}

impl Operation {
    pub fn parameters_in(&self, location: ParamLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |param| param.location == location)
    }

    pub fn has_security(&self) -> bool {
        !self.skip_security_check && !self.security.is_empty()
    }

    pub fn body_contents(&self) -> &[BodyContent] {
        self.request_body
            .as_ref()
            .map(|body| body.contents.as_slice())
            .unwrap_or_default()
    }
}

/// Fully lowered document.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub title: String,
    pub components: BTreeMap<String, Component>,
    pub operations: Vec<Operation>,
    pub security_schemes: Vec<SecurityScheme>,
    pub spec_json: String,
    pub config: Config,
}

impl Program {
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Follows `Named` links to the first non-`Named` schema.
    pub fn resolve<'a>(&'a self, schema: &'a SchemaIr) -> &'a SchemaIr {
        let mut current = schema;
        for _ in 0..=self.components.len() {
            match current {
                SchemaIr::Named(name) => match self.components.get(name) {
                    Some(component) => current = &component.schema,
                    None => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Operations grouped by tag; both levels are sorted.
    pub fn tags(&self) -> BTreeMap<&str, Vec<&Operation>> {
        let mut tags: BTreeMap<&str, Vec<&Operation>> = BTreeMap::new();
        for operation in &self.operations {
            tags.entry(operation.tag.as_str())
                .or_default()
                .push(operation);
        }
        tags
    }

    pub fn security_scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.security_schemes.iter().find(|scheme| scheme.name == name)
    }

    /// Every `Named` reachable from the program must be a registered component.
    pub fn check_ref_closure(&self) -> Result<()> {
        let mut roots: Vec<(String, &SchemaIr)> = vec![];
        for component in self.components.values() {
            roots.push((format!("component {}", component.name), &component.schema));
        }
        for operation in &self.operations {
            for param in &operation.parameters {
                roots.push((
                    format!("operation {} parameter {}", operation.name, param.name),
                    &param.field.schema,
                ));
            }
            for content in operation.body_contents() {
                roots.push((
                    format!("operation {} body {}", operation.name, content.content_type),
                    &content.schema,
                ));
            }
            for response in &operation.responses {
                for content in &response.contents {
                    roots.push((
                        format!("operation {} response {}", operation.name, response.status.label()),
                        &content.schema,
                    ));
                }
                for header in &response.headers {
                    roots.push((
                        format!("operation {} header {}", operation.name, header.name),
                        &header.field.schema,
                    ));
                }
            }
        }

        for (owner, schema) in roots {
            let mut references = vec![];
            schema.collect_references(&mut references);
            if let Some(missing) = references
                .into_iter()
                .find(|name| !self.components.contains_key(*name))
            {
                return Err(Diagnostic::schema_invalid(
                    owner,
                    format!("reference `{missing}` does not resolve to a registered component"),
                )
                .in_phase(Phase::Emit));
            }
        }
        Ok(())
    }
}
