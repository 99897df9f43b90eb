use serde::{de, de::DeserializeOwned, Deserialize};
use serde_json::Value;

/// Either a `$ref` pointer or an inline object.
#[derive(Debug, Clone, PartialEq)]
pub enum Item<T> {
    Reference(String),
    Object(Box<T>),
}

impl<T> Item<T> {
    pub fn is_reference(&self) -> bool {
        matches!(self, Item::Reference(_))
    }

    pub fn as_object(&self) -> Option<&T> {
        match self {
            Item::Object(object) => Some(object),
            Item::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Item::Reference(ref_) => Some(ref_),
            Item::Object(_) => None,
        }
    }
}

impl<'de, T> de::Deserialize<'de> for Item<T>
where
    T: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Item<T>, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let v: Value = Deserialize::deserialize(deserializer)?;

        match v {
            Value::Object(map) if map.contains_key("$ref") => match map.get("$ref") {
                Some(Value::String(ref_)) => Ok(Item::Reference(ref_.to_string())),
                ref_ => Err(de::Error::custom(format!("invalid reference `{ref_:?}`"))),
            },
            v => serde_json::from_value(v)
                .map(|object: T| Item::Object(Box::new(object)))
                .map_err(|e| de::Error::custom(e.to_string())),
        }
    }
}
