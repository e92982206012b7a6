//! Entity graph: documents linked to the people, organizations and locations they mention
//!
//! The graph lives in a hosted Gremlin service. This module builds the
//! co-mention traversal, shapes its results and defines the client seam.

pub mod client;
pub mod graphson;
pub mod query;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use client::GremlinClient;
pub use query::similar_documents_query;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Graph server error ({code}): {message}")]
    Server { code: u16, message: String },
    #[error("Unexpected result shape: {0}")]
    Shape(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Kinds of extracted entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Organization,
    Location,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Person, EntityKind::Organization, EntityKind::Location];

    /// Vertex label in the graph. People are stored under `peopl`.
    pub fn vertex_label(&self) -> &'static str {
        match self {
            EntityKind::Person => "peopl",
            EntityKind::Organization => "organization",
            EntityKind::Location => "location",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Person => "People",
            EntityKind::Organization => "Organizations",
            EntityKind::Location => "Locations",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "person" | "people" | "peopl" => Ok(EntityKind::Person),
            "org" | "organization" | "organizations" => Ok(EntityKind::Organization),
            "location" | "locations" | "place" => Ok(EntityKind::Location),
            other => Err(format!("unknown entity kind '{}'", other)),
        }
    }
}

/// Entities chosen for a similar-documents pivot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySelection {
    #[serde(default)]
    pub people: BTreeSet<String>,
    #[serde(default)]
    pub organizations: BTreeSet<String>,
    #[serde(default)]
    pub locations: BTreeSet<String>,
}

impl EntitySelection {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, kind: EntityKind) -> &BTreeSet<String> {
        match kind {
            EntityKind::Person => &self.people,
            EntityKind::Organization => &self.organizations,
            EntityKind::Location => &self.locations,
        }
    }

    fn set_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<String> {
        match kind {
            EntityKind::Person => &mut self.people,
            EntityKind::Organization => &mut self.organizations,
            EntityKind::Location => &mut self.locations,
        }
    }

    pub fn select(&mut self, kind: EntityKind, name: impl Into<String>) {
        self.set_mut(kind).insert(name.into());
    }

    pub fn deselect(&mut self, kind: EntityKind, name: &str) -> bool {
        self.set_mut(kind).remove(name)
    }

    /// Flip selection of `name`; returns whether it is now selected.
    pub fn toggle(&mut self, kind: EntityKind, name: &str) -> bool {
        let set = self.set_mut(kind);
        if set.remove(name) {
            false
        } else {
            set.insert(name.to_string());
            true
        }
    }

    pub fn contains(&self, kind: EntityKind, name: &str) -> bool {
        self.set(kind).contains(name)
    }

    pub fn names(&self, kind: EntityKind) -> impl Iterator<Item = &str> {
        self.set(kind).iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.people.clear();
        self.organizations.clear();
        self.locations.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.organizations.is_empty() && self.locations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.people.len() + self.organizations.len() + self.locations.len()
    }

    /// One-line rendering for the search path, e.g. `People: a, b | Locations: c`
    pub fn describe(&self) -> String {
        EntityKind::ALL
            .iter()
            .filter(|kind| !self.set(**kind).is_empty())
            .map(|kind| format!("{}: {}", kind, self.names(*kind).collect::<Vec<_>>().join(", ")))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// A document reached through the co-mention traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedDocument {
    pub document: String,
    pub library: String,
    /// Entity names the document mentions, keyed by entity vertex type
    #[serde(default)]
    pub matched_entities: BTreeMap<String, Vec<String>>,
}

/// An entity mentioned by a related document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMention {
    pub name: String,
    /// Part of the selection that produced this result
    pub selected: bool,
}

impl RelatedDocument {
    /// Decode one traversal result (already GraphSON-unwrapped).
    pub fn from_value(value: Value) -> GraphResult<Self> {
        let mut value = value;
        // `by(out('belongs_to').values('name'))` yields a list when the vertex has several edges
        if let Some(library) = value.get_mut("library") {
            let first = match library {
                Value::Array(items) => Some(items.first().cloned().unwrap_or(Value::Null)),
                _ => None,
            };
            if let Some(first) = first {
                *library = first;
            }
            if library.is_null() {
                *library = Value::String(crate::document::UNKNOWN_LIBRARY.to_string());
            }
        }
        serde_json::from_value(value).map_err(|e| GraphError::Shape(e.to_string()))
    }

    pub fn names(&self, kind: EntityKind) -> &[String] {
        self.matched_entities
            .get(kind.vertex_label())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn mentions(&self, kind: EntityKind, selection: &EntitySelection) -> Vec<EntityMention> {
        self.names(kind)
            .iter()
            .map(|name| EntityMention {
                name: name.clone(),
                selected: selection.contains(kind, name),
            })
            .collect()
    }
}

pub fn group_related_by_library(docs: &[RelatedDocument]) -> IndexMap<String, Vec<RelatedDocument>> {
    let mut groups: IndexMap<String, Vec<RelatedDocument>> = IndexMap::new();
    for doc in docs {
        groups.entry(doc.library.clone()).or_default().push(doc.clone());
    }
    groups
}

/// Query access to the entity graph
#[async_trait]
pub trait EntityGraph: Send + Sync {
    /// Run a Gremlin script and return its unwrapped result items.
    async fn submit(&self, gremlin: &str) -> GraphResult<Vec<Value>>;

    /// Documents mentioning any selected entity
    async fn related_documents(&self, selection: &EntitySelection) -> GraphResult<Vec<RelatedDocument>> {
        let Some(query) = similar_documents_query(selection) else {
            return Ok(Vec::new());
        };
        tracing::debug!("Executing query: {}", query);
        self.submit(&query)
            .await?
            .into_iter()
            .map(RelatedDocument::from_value)
            .collect()
    }
}
