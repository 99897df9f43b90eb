use crate::v3::items::Item;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Item<Schema>),
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub type_: Option<SchemaType>,
    pub format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: IndexMap<String, Item<Schema>>,
    pub items: Option<Item<Schema>>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(rename = "enum", default)]
    pub enum_: Vec<Value>,
    #[serde(rename = "allOf", default)]
    pub all_of: Vec<Item<Schema>>,
    #[serde(rename = "oneOf", default)]
    pub one_of: Vec<Item<Schema>>,
    #[serde(rename = "anyOf", default)]
    pub any_of: Vec<Item<Schema>>,
    #[serde(default)]
    pub nullable: bool,

    // Constraints
    #[serde(rename = "minLength")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength")]
    pub max_length: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    #[serde(rename = "exclusiveMinimum")]
    pub exclusive_minimum: Option<Value>,
    #[serde(rename = "exclusiveMaximum")]
    pub exclusive_maximum: Option<Value>,
    pub pattern: Option<String>,
    #[serde(rename = "minItems")]
    pub min_items: Option<u64>,
    #[serde(rename = "maxItems")]
    pub max_items: Option<u64>,

    // Extensions and everything this generator does not read
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Schema {
    /// Primary declared type; `null` members of a 3.1 type list are skipped.
    pub fn type_(&self) -> Option<&str> {
        match self.type_.as_ref()? {
            SchemaType::Single(ty) => Some(ty.as_str()),
            SchemaType::Multiple(types) => types
                .iter()
                .map(String::as_str)
                .find(|ty| *ty != "null"),
        }
    }

    pub fn is_of_type(&self, type_: impl AsRef<str>) -> bool {
        self.type_() == Some(type_.as_ref())
    }

    pub fn is_object(&self) -> bool {
        self.is_of_type("object") || (self.type_.is_none() && !self.properties.is_empty())
    }

    pub fn is_array(&self) -> bool {
        self.is_of_type("array")
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_.is_empty()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
            || matches!(&self.type_, Some(SchemaType::Multiple(types)) if types.iter().any(|ty| ty == "null"))
    }

    pub fn is_composition(&self) -> bool {
        !self.all_of.is_empty() || !self.one_of.is_empty() || !self.any_of.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{AdditionalProperties, Schema};

    #[test]
    fn schema_types() {
        let s = Schema::default();
        assert_eq!(s.type_(), None);
        assert!(!s.is_array());
        assert!(!s.is_object());

        let s: Schema = serde_json::from_str(r#"{"type": "array"}"#).unwrap();
        assert!(s.is_array());
        assert!(!s.is_object());

        let s: Schema =
            serde_json::from_str(r#"{"properties": {"name": {"type": "string"}}}"#).unwrap();
        assert!(!s.is_array());
        assert!(s.is_object());
    }

    #[test]
    fn nullable_forms() {
        let s: Schema = serde_json::from_str(r#"{"type": "string", "nullable": true}"#).unwrap();
        assert!(s.is_nullable());
        let s: Schema = serde_json::from_str(r#"{"type": ["string", "null"]}"#).unwrap();
        assert!(s.is_nullable());
        assert_eq!(s.type_(), Some("string"));
    }

    #[test]
    fn collects_extensions() {
        let s: Schema = serde_json::from_str(
            r#"{"type": "string", "minLength": 8, "x-go-string-trimmable": true, "example": "x"}"#,
        )
        .unwrap();
        assert_eq!(s.min_length, Some(8));
        assert_eq!(
            s.extensions.get("x-go-string-trimmable"),
            Some(&serde_json::Value::Bool(true))
        );
        assert!(s.extensions.contains_key("example"));
    }

    #[test]
    fn additional_properties_forms() {
        let s: Schema = serde_json::from_str(r#"{"additionalProperties": false}"#).unwrap();
        assert_eq!(
            s.additional_properties,
            Some(AdditionalProperties::Allowed(false))
        );
        let s: Schema =
            serde_json::from_str(r#"{"additionalProperties": {"type": "integer"}}"#).unwrap();
        assert!(matches!(
            s.additional_properties,
            Some(AdditionalProperties::Schema(_))
        ));
    }
}
