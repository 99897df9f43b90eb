//! Typed `x-go-*` vendor extensions.
//!
//! Every extension read here has exactly one accepted value shape. Anything
//! else is an `ExtensionTypeMismatch` diagnostic.

use crate::error::{value_kind, Diagnostic, Result};
use crate::v3::codegen::ir::QualifiedName;

use indexmap::IndexMap;
use log::trace;
use serde_json::Value;

pub const X_GO_TYPE: &str = "x-go-type";
pub const X_GO_MAP_TYPE: &str = "x-go-map-type";
pub const X_GO_TYPE_STRING_PARSE: &str = "x-go-type-string-parse";
pub const X_GO_POINTER: &str = "x-go-pointer";
pub const X_GO_REGEX: &str = "x-go-regex";
pub const X_GO_STRING_TRIMMABLE: &str = "x-go-string-trimmable";
pub const X_GO_OMITEMPTY: &str = "x-go-omitempty";
pub const X_GO_SKIP_VALIDATION: &str = "x-go-skip-validation";
pub const X_GO_SKIP_SECURITY_CHECK: &str = "x-go-skip-security-check";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct GoExtensions {
    pub go_type: Option<QualifiedName>,
    pub map_type: Option<String>,
    pub string_parse: Option<QualifiedName>,
    pub pointer: bool,
    pub regex: Option<String>,
    pub string_trimmable: bool,
    pub omitempty: bool,
    pub skip_validation: bool,
    pub skip_security_check: bool,
}

impl GoExtensions {
    pub fn parse(extensions: &IndexMap<String, Value>, location: &str) -> Result<Self> {
        let mut parsed = GoExtensions::default();
        for (key, value) in extensions {
            if !key.starts_with("x-go-") {
                continue;
            }
            trace!("parsing extension `{key}` at {location}");
            match key.as_str() {
                X_GO_TYPE => {
                    parsed.go_type = Some(qualified(value, key, location)?);
                }
                X_GO_MAP_TYPE => {
                    parsed.map_type = Some(string(value, key, location)?.to_string());
                }
                X_GO_TYPE_STRING_PARSE => {
                    parsed.string_parse = Some(qualified(value, key, location)?);
                }
                X_GO_POINTER => parsed.pointer = boolean(value, key, location)?,
                X_GO_REGEX => {
                    let pattern = string(value, key, location)?;
                    check_pattern(pattern, &format!("{location}/{key}"))?;
                    parsed.regex = Some(pattern.to_string());
                }
                X_GO_STRING_TRIMMABLE => {
                    parsed.string_trimmable = boolean(value, key, location)?
                }
                X_GO_OMITEMPTY => parsed.omitempty = boolean(value, key, location)?,
                X_GO_SKIP_VALIDATION => parsed.skip_validation = boolean(value, key, location)?,
                X_GO_SKIP_SECURITY_CHECK => {
                    parsed.skip_security_check = boolean(value, key, location)?
                }
                _ => trace!("extension `{key}` is not consumed"),
            }
        }
        Ok(parsed)
    }
}

fn boolean(value: &Value, key: &str, location: &str) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Diagnostic::extension_mismatch(location, key, value_kind(value), "boolean"))
}

fn string<'a>(value: &'a Value, key: &str, location: &str) -> Result<&'a str> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s),
        Some(_) => Err(
            Diagnostic::extension_mismatch(location, key, "empty string", "non-empty string")
        ),
        None => Err(Diagnostic::extension_mismatch(
            location,
            key,
            value_kind(value),
            "string",
        )),
    }
}

fn qualified(value: &Value, key: &str, location: &str) -> Result<QualifiedName> {
    let raw = string(value, key, location)?;
    QualifiedName::parse(raw).ok_or_else(|| {
        Diagnostic::extension_mismatch(
            location,
            key,
            format!("string `{raw}`"),
            "qualified name `import/path.Name`",
        )
        .with_hint("for example `github.com/google/uuid.UUID`")
    })
}

/// Patterns are compiled once so that malformed expressions fail at compile time.
pub fn check_pattern(pattern: &str, location: &str) -> Result<()> {
    regex::Regex::new(pattern).map(|_| ()).map_err(|e| {
        Diagnostic::schema_invalid(location, format!("invalid regular expression `{pattern}`"))
            .with_source(e)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DiagnosticKind;
    use serde_json::json;

    fn extensions(value: Value) -> IndexMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_every_flag() {
        let parsed = GoExtensions::parse(
            &extensions(json!({
                "x-go-type": "github.com/google/uuid.UUID",
                "x-go-type-string-parse": "github.com/google/uuid.Parse",
                "x-go-map-type": "map[string]int",
                "x-go-pointer": true,
                "x-go-regex": "^[a-z]+$",
                "x-go-string-trimmable": true,
                "x-go-omitempty": true,
                "x-go-skip-validation": true,
                "x-go-skip-security-check": true,
                "x-go-unknown": {"ignored": 1},
                "example": "not an extension",
            })),
            "#/components/schemas/Thing",
        )
        .unwrap();

        assert_eq!(
            parsed.go_type,
            Some(QualifiedName::new(Some("github.com/google/uuid"), "UUID"))
        );
        assert_eq!(
            parsed.string_parse,
            Some(QualifiedName::new(Some("github.com/google/uuid"), "Parse"))
        );
        assert_eq!(parsed.map_type.as_deref(), Some("map[string]int"));
        assert!(parsed.pointer);
        assert_eq!(parsed.regex.as_deref(), Some("^[a-z]+$"));
        assert!(parsed.string_trimmable);
        assert!(parsed.omitempty);
        assert!(parsed.skip_validation);
        assert!(parsed.skip_security_check);
    }

    #[test]
    fn rejects_wrong_shapes() {
        let err = GoExtensions::parse(
            &extensions(json!({"x-go-pointer": "yes"})),
            "#/components/schemas/Thing/properties/name",
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ExtensionTypeMismatch);
        assert_eq!(err.received.as_deref(), Some("string"));
        assert_eq!(err.expected.as_deref(), Some("boolean"));
        assert_eq!(
            err.location.as_deref(),
            Some("#/components/schemas/Thing/properties/name")
        );

        let err = GoExtensions::parse(&extensions(json!({"x-go-type": 3})), "here").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ExtensionTypeMismatch);
        assert_eq!(err.received.as_deref(), Some("number"));

        let err =
            GoExtensions::parse(&extensions(json!({"x-go-type": "uuid."})), "here").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ExtensionTypeMismatch);
    }

    #[test]
    fn rejects_invalid_regex() {
        let err = GoExtensions::parse(&extensions(json!({"x-go-regex": "(unclosed"})), "here")
            .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SchemaInvalid);
    }
}
