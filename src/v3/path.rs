use crate::v3::{items::Item, operation::Operation, parameter::Parameter};

use indexmap::IndexMap;
use serde::{de, Deserialize};
use serde_json::Value;

/// HTTP methods in the order they are declared on a path item.
pub const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PathItem {
    #[serde(rename = "$ref")]
    pub ref_: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
    #[serde(default)]
    pub parameters: Vec<Item<Parameter>>,
}

impl PathItem {
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        match method {
            "get" => self.get.as_ref(),
            "put" => self.put.as_ref(),
            "post" => self.post.as_ref(),
            "delete" => self.delete.as_ref(),
            "options" => self.options.as_ref(),
            "head" => self.head.as_ref(),
            "patch" => self.patch.as_ref(),
            "trace" => self.trace.as_ref(),
            _ => None,
        }
    }

    /// `(method, operation)` pairs declared on this item.
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &Operation)> + '_ {
        METHODS
            .iter()
            .filter_map(move |method| self.operation(method).map(|op| (*method, op)))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paths(pub IndexMap<String, PathItem>);

impl<'de> de::Deserialize<'de> for Paths {
    fn deserialize<D>(deserializer: D) -> Result<Paths, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let v: Value = de::Deserialize::deserialize(deserializer)?;

        match v {
            Value::Object(map) => {
                let mut paths = IndexMap::new();
                for (key, val) in map {
                    if key.starts_with("x-") {
                        continue;
                    }
                    let item: PathItem = serde_json::from_value(val)
                        .map_err(|e| de::Error::custom(format!("path `{key}`: {e}")))?;
                    paths.insert(key, item);
                }
                Ok(Paths(paths))
            }
            v => Err(de::Error::custom(format!(
                "invalid object for paths `{:?}`",
                v
            ))),
        }
    }
}
