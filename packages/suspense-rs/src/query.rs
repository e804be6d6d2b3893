//! Query definitions, variables, and the cache key derived from them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Immutable, named description of a data shape to fetch.
///
/// Definitions are declared as `const` items next to the component that
/// reads them and shared by reference from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryDefinition {
    name: &'static str,
    text: &'static str,
}

impl QueryDefinition {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    /// Operation name, e.g. `AppUserQuery`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Full document text sent to the network layer.
    pub fn text(&self) -> &'static str {
        self.text
    }
}

/// Variables passed alongside a query.
///
/// Always a JSON object. Key order does not affect the derived
/// [`QueryKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(Map<String, Value>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one variable.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Build variables from any serializable struct or map.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "query variables must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Compact JSON with object keys sorted at every depth.
    pub fn canonical(&self) -> String {
        canonical_json(&Value::Object(self.0.clone()))
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let fields: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// Identity of a `(query, variables)` pair.
///
/// Keys the record store and the in-flight request table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub name: String,
    pub variables: String,
}

impl QueryKey {
    pub fn new(query: &QueryDefinition, variables: &Variables) -> Self {
        Self {
            name: query.name().to_string(),
            variables: variables.canonical(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.variables)
    }
}
