//! Browsing session
//!
//! Tracks what a user is looking at: a result list, one document, or the
//! similar-documents view reached by pivoting on selected entities. Front ends
//! drive it with the operations below and render from [`SessionState`].

use crate::config::AppConfig;
use crate::document::{group_by_library, Document, KeyError, ResultKey};
use crate::graph::{
    group_related_by_library, EntityGraph, EntityKind, EntitySelection, GraphError, GremlinClient,
    RelatedDocument,
};
use crate::llm::{LlmClient, LlmError, SummaryService};
use crate::search::{AzureSearchClient, DocumentIndex, SearchError};
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please select at least one entity to find similar documents.")]
    NoEntitiesSelected,
    #[error("No document is open")]
    NoDocument,
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("The current document does not mention '{0}'")]
    UnknownEntity(String),
    #[error("No previous results")]
    NoPreviousResults,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),
    #[error("Error querying related documents: {0}")]
    Graph(#[from] GraphError),
    #[error("Error generating summary: {0}")]
    Summary(#[from] LlmError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Shared upstream clients
pub struct Services {
    pub index: Arc<dyn DocumentIndex>,
    pub graph: Arc<dyn EntityGraph>,
    pub summaries: SummaryService,
}

impl Services {
    /// Build the Azure Search, Gremlin and LLM clients described by `config`.
    pub fn from_config(config: &AppConfig) -> SessionResult<Self> {
        let index = AzureSearchClient::new(&config.search)?;
        let graph = GremlinClient::new(&config.graph);
        let llm = LlmClient::new(&config.llm)?;

        info!(
            "Using index '{}', graph {} and {:?} summaries",
            config.search.index_name,
            graph.url(),
            llm.provider()
        );

        Ok(Self {
            index: Arc::new(index),
            graph: Arc::new(graph),
            summaries: SummaryService::new(Arc::new(llm), config.llm.cache_capacity),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Search,
    Document,
    Similar,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub view: View,
    pub search_results: Option<Vec<Document>>,
    pub total_count: Option<u64>,
    pub selected_result: Option<ResultKey>,
    /// Document opened from the similar view
    pub similar_document: Option<Document>,
    pub selection: EntitySelection,
    pub similar_docs: Vec<RelatedDocument>,
    /// Whether the similar view is active beneath an open document
    pub show_similar: bool,
    /// Selections that produced each similar-documents query, oldest first
    pub history: Vec<EntitySelection>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            view: View::Search,
            search_results: None,
            total_count: None,
            selected_result: None,
            similar_document: None,
            selection: EntitySelection::new(),
            similar_docs: Vec::new(),
            show_similar: false,
            history: Vec::new(),
        }
    }
}

pub struct Session {
    services: Arc<Services>,
    state: SessionState,
}

impl Session {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn view(&self) -> View {
        self.state.view
    }

    pub fn selection(&self) -> &EntitySelection {
        &self.state.selection
    }

    pub fn grouped_results(&self) -> IndexMap<String, Vec<Document>> {
        self.state
            .search_results
            .as_deref()
            .map(group_by_library)
            .unwrap_or_default()
    }

    pub fn grouped_similar(&self) -> IndexMap<String, Vec<RelatedDocument>> {
        group_related_by_library(&self.state.similar_docs)
    }

    /// Run a new query. Blank queries leave the results unchanged.
    pub async fn search(&mut self, query: &str) -> SessionResult<usize> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(self.state.search_results.as_ref().map_or(0, Vec::len));
        }

        let page = self.services.index.search(query).await?;
        let count = page.documents.len();

        self.state.search_results = Some(page.documents);
        self.state.total_count = page.total_count;
        self.state.selected_result = None;
        self.state.similar_document = None;
        self.state.similar_docs.clear();
        self.state.history.clear();
        self.state.show_similar = false;
        self.state.view = View::Search;
        Ok(count)
    }

    /// Open a row of the grouped search results.
    pub fn open_result(&mut self, key: &str) -> SessionResult<&Document> {
        let key = ResultKey::parse(key)?;
        let groups = self.grouped_results();
        if key.resolve(&groups).is_none() {
            return Err(SessionError::NotFound(key.to_string()));
        }

        self.state.selected_result = Some(key);
        self.state.similar_document = None;
        self.state.view = View::Document;
        self.current_document().ok_or(SessionError::NoDocument)
    }

    /// Fetch a similar-view document by name and open it with a fresh selection.
    pub async fn open_similar(&mut self, name: &str) -> SessionResult<&Document> {
        let doc = self
            .services
            .index
            .find_by_name(name)
            .await?
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;

        self.state.similar_document = Some(doc);
        self.state.selection.clear();
        self.state.view = View::Document;
        self.current_document().ok_or(SessionError::NoDocument)
    }

    pub fn current_document(&self) -> Option<&Document> {
        if self.state.view != View::Document {
            return None;
        }
        if let Some(doc) = &self.state.similar_document {
            return Some(doc);
        }
        let key = self.state.selected_result.as_ref()?;
        let results = self.state.search_results.as_ref()?;
        results
            .iter()
            .filter(|d| d.library_name() == key.library)
            .nth(key.index)
    }

    pub async fn summary(&self) -> SessionResult<String> {
        let doc = self.current_document().ok_or(SessionError::NoDocument)?;
        Ok(self.services.summaries.summary_for_document(doc).await?)
    }

    fn check_mentioned(&self, kind: EntityKind, name: &str) -> SessionResult<()> {
        let doc = self.current_document().ok_or(SessionError::NoDocument)?;
        let listed = match kind {
            EntityKind::Person => &doc.people,
            EntityKind::Organization => &doc.organizations,
            EntityKind::Location => &doc.locations,
        };
        if listed.iter().any(|n| n == name) {
            Ok(())
        } else {
            Err(SessionError::UnknownEntity(name.to_string()))
        }
    }

    /// Flip an entity mentioned by the open document; returns whether it is now selected.
    pub fn toggle_entity(&mut self, kind: EntityKind, name: &str) -> SessionResult<bool> {
        self.check_mentioned(kind, name)?;
        Ok(self.state.selection.toggle(kind, name))
    }

    pub fn select_entity(&mut self, kind: EntityKind, name: &str) -> SessionResult<()> {
        self.check_mentioned(kind, name)?;
        self.state.selection.select(kind, name);
        Ok(())
    }

    pub fn deselect_entity(&mut self, kind: EntityKind, name: &str) -> bool {
        self.state.selection.deselect(kind, name)
    }

    pub fn clear_entities(&mut self) {
        self.state.selection.clear();
    }

    /// Pivot to documents mentioning the selected entities.
    pub async fn find_similar(&mut self) -> SessionResult<usize> {
        if self.state.selection.is_empty() {
            return Err(SessionError::NoEntitiesSelected);
        }

        let docs = self.services.graph.related_documents(&self.state.selection).await?;
        info!(
            "Found {} similar documents for {}",
            docs.len(),
            self.state.selection.describe()
        );

        self.state.history.push(self.state.selection.clone());
        self.state.similar_docs = docs;
        self.state.show_similar = true;
        self.state.search_results = None;
        self.state.total_count = None;
        self.state.selected_result = None;
        self.state.view = View::Similar;
        Ok(self.state.similar_docs.len())
    }

    /// Step back to the selection that produced the previous similar results.
    pub async fn previous_results(&mut self) -> SessionResult<usize> {
        if self.state.history.len() < 2 {
            return Err(SessionError::NoPreviousResults);
        }
        let previous = self.state.history[self.state.history.len() - 2].clone();
        let docs = self.services.graph.related_documents(&previous).await?;

        self.state.history.pop();
        self.state.selection = previous;
        self.state.similar_docs = docs;
        self.state.similar_document = None;
        self.state.view = View::Similar;
        Ok(self.state.similar_docs.len())
    }

    pub fn back(&mut self) -> View {
        match self.state.view {
            View::Document if self.state.show_similar => {
                self.state.view = View::Similar;
            }
            View::Document => {
                self.state.view = View::Search;
            }
            View::Similar => {
                self.state.view = View::Search;
                self.state.show_similar = false;
                self.state.history.clear();
                self.state.similar_docs.clear();
                self.state.similar_document = None;
            }
            View::Search => {}
        }
        self.state.view
    }

    /// Search path lines, e.g. `Search 1: People: Ana Cruz`
    pub fn search_path(&self) -> Vec<String> {
        self.state
            .history
            .iter()
            .enumerate()
            .map(|(i, selection)| format!("Search {}: {}", i + 1, selection.describe()))
            .collect()
    }
}
