//! Full-text search against the hosted document index

pub mod client;

use crate::document::Document;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use client::AzureSearchClient;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search service error ({status}): {message}")]
    Service { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// One page of search hits
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchPage {
    /// Total matches reported by the index, which may exceed `documents.len()`
    pub total_count: Option<u64>,
    pub documents: Vec<Document>,
}

/// Read access to the document index
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Full-text query over every document
    async fn search(&self, text: &str) -> SearchResult<SearchPage>;

    /// Exact lookup by `DocumentName`
    async fn find_by_name(&self, name: &str) -> SearchResult<Option<Document>>;
}

/// Quote a string for use inside an OData filter literal.
pub fn odata_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Filter expression selecting one document by name
pub fn name_filter(name: &str) -> String {
    format!("DocumentName eq {}", odata_quote(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odata_quote_doubles_single_quotes() {
        assert_eq!(odata_quote("plain"), "'plain'");
        assert_eq!(odata_quote("O'Brien's memo"), "'O''Brien''s memo'");
    }

    #[test]
    fn test_name_filter() {
        assert_eq!(name_filter("report.pdf"), "DocumentName eq 'report.pdf'");
    }
}
