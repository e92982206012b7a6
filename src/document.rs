//! Search index documents and result grouping

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Placeholder shown for empty metadata values
pub const NOT_AVAILABLE: &str = "N/A";

pub const UNKNOWN_LIBRARY: &str = "Unknown Library";

/// A document as returned by the search index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "DocumentName", default)]
    pub name: Option<String>,
    #[serde(rename = "Library", default)]
    pub library: Option<String>,
    #[serde(rename = "merged_content", default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub people: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub organizations: Vec<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub locations: Vec<String>,
    /// Library-specific metadata fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Document {
    /// Parse one hit, dropping the index's `@search.*` annotations.
    pub fn from_hit(mut hit: Map<String, Value>) -> serde_json::Result<Self> {
        hit.retain(|k, _| !k.starts_with("@search."));
        serde_json::from_value(Value::Object(hit))
    }

    pub fn library_name(&self) -> &str {
        self.library.as_deref().unwrap_or(UNKNOWN_LIBRARY)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Untitled Document")
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Display text for an index field, `N/A` when the value is empty.
    pub fn display_field(&self, field: &str) -> String {
        let value = match field {
            "DocumentName" => self.name.clone().map(Value::String),
            "Library" => self.library.clone().map(Value::String),
            "merged_content" => self.content.clone().map(Value::String),
            other => self.fields.get(other).cloned(),
        };
        match value {
            Some(v) if !is_blank(&v) => render_value(&v),
            _ => NOT_AVAILABLE.to_string(),
        }
    }

    pub fn mentions_entity(&self, name: &str) -> bool {
        self.people.iter().chain(&self.organizations).chain(&self.locations).any(|n| n == name)
    }
}

/// Values the result tables treat as missing
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Group documents by library, keeping first-seen library order and result order within each.
pub fn group_by_library(docs: &[Document]) -> IndexMap<String, Vec<Document>> {
    let mut groups: IndexMap<String, Vec<Document>> = IndexMap::new();
    for doc in docs {
        groups.entry(doc.library_name().to_string()).or_default().push(doc.clone());
    }
    groups
}

#[derive(Error, Debug, PartialEq)]
pub enum KeyError {
    #[error("Invalid result key '{0}'")]
    Invalid(String),
}

/// Position of a document inside the grouped results: `{library}_{index}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    pub library: String,
    pub index: usize,
}

impl ResultKey {
    pub fn new(library: impl Into<String>, index: usize) -> Self {
        Self { library: library.into(), index }
    }

    /// Parse a key, splitting on the last underscore since library names contain them.
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        match key.rsplit_once('_') {
            Some((library, index)) if !library.is_empty() => {
                let index = index.parse().map_err(|_| KeyError::Invalid(key.to_string()))?;
                Ok(Self::new(library, index))
            }
            Some(_) => Err(KeyError::Invalid(key.to_string())),
            None if key.is_empty() => Err(KeyError::Invalid(key.to_string())),
            None => Ok(Self::new(key, 0)),
        }
    }

    pub fn resolve<'a>(&self, groups: &'a IndexMap<String, Vec<Document>>) -> Option<&'a Document> {
        groups.get(&self.library).and_then(|docs| docs.get(self.index))
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.library, self.index)
    }
}
