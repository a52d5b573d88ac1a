use crate::core::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Primary-key value of a persistent entity.
///
/// Identifiers are plain data: they travel inside serialization surrogates and
/// are handed to the session when a proxy loads its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Integer(i64),
    Text(String),
    Uuid(Uuid),
    /// Embedded (multi-column) key, one entry per component property.
    Composite(BTreeMap<String, Identifier>),
}

impl Identifier {
    pub fn composite<I, K>(parts: I) -> Self
    where
        I: IntoIterator<Item = (K, Identifier)>,
        K: Into<String>,
    {
        Self::Composite(parts.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns a component of a composite key.
    pub fn component(&self, name: &str) -> Option<&Identifier> {
        match self {
            Self::Composite(parts) => parts.get(name),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Integer(i) => Value::Integer(*i),
            Self::Text(s) => Value::Text(s.clone()),
            Self::Uuid(u) => Value::Text(u.to_string()),
            Self::Composite(_) => Value::Json(self.to_json()),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Text(s) => serde_json::Value::from(s.as_str()),
            Self::Uuid(u) => serde_json::Value::from(u.to_string()),
            Self::Composite(parts) => serde_json::Value::Object(
                parts
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::Uuid(u) => write!(f, "{}", u),
            Self::Composite(parts) => {
                write!(f, "{{")?;
                for (idx, (name, value)) in parts.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<i64> for Identifier {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Identifier {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Uuid> for Identifier {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_display_is_ordered() {
        let id = Identifier::composite([
            ("region", Identifier::from("eu")),
            ("account", Identifier::from(7)),
        ]);
        assert_eq!(id.to_string(), "{account=7, region=eu}");
        assert_eq!(id.component("account"), Some(&Identifier::Integer(7)));
        assert!(id.component("missing").is_none());
    }

    #[test]
    fn test_uuid_identifier_as_value() {
        let uuid = Uuid::new_v4();
        let id = Identifier::from(uuid);
        assert_eq!(id.to_value(), Value::Text(uuid.to_string()));
        assert!(!id.is_composite());
    }

    #[test]
    fn test_composite_as_json_value() {
        let id = Identifier::composite([("a", Identifier::from(1))]);
        match id.to_value() {
            Value::Json(json) => assert_eq!(json["a"], 1),
            other => panic!("unexpected value {:?}", other),
        }
    }
}
