//! Docsearch
//!
//! Document discovery over an Azure AI Search index and a Cosmos DB Gremlin
//! entity graph, with LLM-generated summaries.
//!
//! # Architecture
//!
//! - [`search`]: full-text search and name lookup against the document index
//! - [`graph`]: entity selection and similar-document traversal over Gremlin
//! - [`llm`]: bullet-point summaries with a per-process cache
//! - [`library`]: per-library metadata and result-table layouts
//! - [`session`]: the browsing state machine shared by the CLI shell
//! - [`http`]: JSON API and embedded browser page
//!
//! ## Example Usage
//!
//! ```rust
//! use docsearch::graph::{similar_documents_query, EntityKind, EntitySelection};
//!
//! let mut selection = EntitySelection::new();
//! selection.select(EntityKind::Person, "Ana Cruz");
//!
//! let query = similar_documents_query(&selection).unwrap();
//! assert!(query.contains("hasLabel('peopl')"));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod document;
pub mod graph;
pub mod http;
pub mod library;
pub mod llm;
pub mod search;
pub mod session;

// Re-export main types for convenience
pub use config::{AppConfig, ConfigError, ConfigResult, GraphConfig, LlmConfig, SearchConfig, ServerConfig};

pub use document::{group_by_library, Document, KeyError, ResultKey};

pub use graph::{
    EntityGraph, EntityKind, EntitySelection, GraphError, GraphResult, GremlinClient,
    RelatedDocument,
};

pub use library::{Library, LibraryTable, MetadataRow};

pub use llm::{LlmClient, LlmError, LlmProvider, LlmResult, Summarizer, SummaryService};

pub use search::{AzureSearchClient, DocumentIndex, SearchError, SearchPage, SearchResult};

pub use session::{Services, Session, SessionError, SessionResult, SessionState, View};

pub use http::{router, HttpServer};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, env!("CARGO_PKG_VERSION"));
    }
}
