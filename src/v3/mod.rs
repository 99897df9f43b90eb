pub mod codegen;
pub mod extensions;
pub mod items;
pub mod operation;
pub mod parameter;
pub mod path;
pub mod responses;
pub mod schema;
pub mod security;

pub use items::Item;
pub use operation::{MediaType, Operation, RequestBody};
pub use parameter::{Parameter, ParameterLocation};
pub use path::{PathItem, Paths};
pub use responses::{Header, Response, Responses};
pub use schema::Schema;
pub use security::{SecurityRequirement, SecurityScheme};

use crate::error::{Diagnostic, Result};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

pub const SCHEMAS_REF: &str = "#/components/schemas/";
pub const PARAMETERS_REF: &str = "#/components/parameters/";
pub const REQUEST_BODIES_REF: &str = "#/components/requestBodies/";
pub const RESPONSES_REF: &str = "#/components/responses/";
pub const HEADERS_REF: &str = "#/components/headers/";
pub const SECURITY_SCHEMES_REF: &str = "#/components/securitySchemes/";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Item<Schema>>,
    #[serde(default)]
    pub parameters: IndexMap<String, Item<Parameter>>,
    #[serde(rename = "requestBodies", default)]
    pub request_bodies: IndexMap<String, Item<RequestBody>>,
    #[serde(default)]
    pub responses: IndexMap<String, Item<Response>>,
    #[serde(default)]
    pub headers: IndexMap<String, Item<Header>>,
    #[serde(rename = "securitySchemes", default)]
    pub security_schemes: IndexMap<String, Item<SecurityScheme>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenApi {
    pub openapi: String,
    #[serde(default)]
    pub info: Info,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub components: Components,
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Follows `$ref` chains inside one component table.
fn resolve<'a, T>(
    table: &'a IndexMap<String, Item<T>>,
    prefix: &str,
    item: &'a Item<T>,
) -> Option<&'a T> {
    let mut current = item;
    // a chain longer than the table is a cycle
    for _ in 0..=table.len() {
        match current {
            Item::Object(object) => return Some(object),
            Item::Reference(ref_) => {
                let key = ref_.strip_prefix(prefix)?;
                current = table.get(key)?;
            }
        }
    }
    None
}

impl OpenApi {
    pub fn get_ref_schema(&self, ref_: &str) -> Option<&Item<Schema>> {
        self.components.schemas.get(ref_.strip_prefix(SCHEMAS_REF)?)
    }

    pub fn resolve_parameter<'a>(&'a self, item: &'a Item<Parameter>) -> Option<&'a Parameter> {
        resolve(&self.components.parameters, PARAMETERS_REF, item)
    }

    pub fn resolve_request_body<'a>(
        &'a self,
        item: &'a Item<RequestBody>,
    ) -> Option<&'a RequestBody> {
        resolve(&self.components.request_bodies, REQUEST_BODIES_REF, item)
    }

    pub fn resolve_response<'a>(&'a self, item: &'a Item<Response>) -> Option<&'a Response> {
        resolve(&self.components.responses, RESPONSES_REF, item)
    }

    pub fn resolve_header<'a>(&'a self, item: &'a Item<Header>) -> Option<&'a Header> {
        resolve(&self.components.headers, HEADERS_REF, item)
    }

    pub fn resolve_security_scheme<'a>(
        &'a self,
        item: &'a Item<SecurityScheme>,
    ) -> Option<&'a SecurityScheme> {
        resolve(&self.components.security_schemes, SECURITY_SCHEMES_REF, item)
    }
}

/// A loaded OpenAPI 3 document: the typed model plus the raw value it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub spec: OpenApi,
    pub raw: Value,
}

impl Document {
    pub fn from_value(mut raw: Value, source: &str) -> Result<Self> {
        // `openapi: 3.0` is a YAML float
        if let Some(Value::Number(number)) = raw.get("openapi") {
            let version = number.to_string();
            raw["openapi"] = Value::String(version);
        }

        let version = raw.get("openapi").and_then(Value::as_str);
        match version {
            Some(version) if version.starts_with("3.") => {}
            Some(version) => {
                return Err(Diagnostic::load_failed(
                    source,
                    format!("unsupported OpenAPI version `{version}`"),
                )
                .expected("3.x"))
            }
            None => {
                let mut diagnostic =
                    Diagnostic::load_failed(source, "document has no `openapi` version field")
                        .expected("3.x");
                if raw.get("swagger").is_some() {
                    diagnostic = diagnostic
                        .received("swagger 2.0")
                        .with_hint("convert the document to OpenAPI 3 first");
                }
                return Err(diagnostic);
            }
        }

        let spec: OpenApi = serde_json::from_value(raw.clone()).map_err(|e| {
            Diagnostic::load_failed(source, "document does not match the OpenAPI 3 structure")
                .with_source(e)
        })?;
        Ok(Self { spec, raw })
    }

    /// Parses YAML or JSON text.
    pub fn from_text(text: &str, source: &str) -> Result<Self> {
        let raw: Value = serde_yaml::from_str(text).map_err(|e| {
            Diagnostic::load_failed(source, "document is neither valid YAML nor JSON")
                .with_source(e)
        })?;
        Self::from_value(raw, source)
    }

    /// The raw document with object keys sorted recursively, serialised compactly.
    pub fn canonical_json(&self) -> String {
        canonicalize(&self.raw).to_string()
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by_key(|(k, _)| *k);
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        v => v.clone(),
    }
}
