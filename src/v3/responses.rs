use crate::v3::{items::Item, operation::MediaType, schema::Schema};

use indexmap::IndexMap;
use serde::{de, Deserialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Response {
    pub description: Option<String>,
    #[serde(default)]
    pub headers: IndexMap<String, Item<Header>>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Header {
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub schema: Option<Item<Schema>>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// Responses keyed by status code (`"200"`, `"4XX"`, `"default"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Responses(pub IndexMap<String, Item<Response>>);

impl<'de> de::Deserialize<'de> for Responses {
    fn deserialize<D>(deserializer: D) -> Result<Responses, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let v: Value = de::Deserialize::deserialize(deserializer)?;

        let mut responses = IndexMap::new();
        match v {
            Value::Object(map) => {
                for (key, val) in map {
                    if key.starts_with("x-") {
                        continue;
                    }
                    let val: Item<Response> = serde_json::from_value(val)
                        .map_err(|e| de::Error::custom(format!("response `{key}`: {e}")))?;
                    responses.insert(key, val);
                }

                Ok(Responses(responses))
            }
            _ => Err(de::Error::custom("invalid type for responses object")),
        }
    }
}
