//! HTTP handlers for the search API

use crate::document::Document;
use crate::graph::{EntityKind, EntityMention, EntitySelection, GraphError};
use crate::library::{metadata_rows, table_rows, LibraryTable, MetadataRow};
use crate::llm::LlmError;
use crate::search::SearchError;
use crate::session::Services;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

/// Error body returned by every endpoint
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Upstream(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        warn!("Search failed: {}", e);
        match e {
            SearchError::Config(m) => ApiError::Internal(m),
            other => ApiError::Upstream(format!("Search failed: {}", other)),
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(e: GraphError) -> Self {
        warn!("Graph query failed: {}", e);
        ApiError::Upstream(format!("Error querying related documents: {}", e))
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::ConfigError(m) => {
                error!("LLM misconfigured: {}", m);
                ApiError::Internal(m)
            }
            other => ApiError::Upstream(format!("Error generating summary: {}", other)),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Documents returned
    pub total: usize,
    /// Matches reported by the index
    pub total_count: Option<u64>,
    pub library_count: usize,
    pub libraries: Vec<LibraryResults>,
}

/// A library's result table with the full view of each row, in row order
#[derive(Serialize)]
pub struct LibraryResults {
    #[serde(flatten)]
    pub table: LibraryTable,
    pub documents: Vec<DocumentView>,
}

pub async fn search_handler(
    State(services): State<Arc<Services>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<SearchResponse> {
    let Query(params) = params?;
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Enter a search query".to_string()));
    }

    let page = services.index.search(query).await?;
    let groups = crate::document::group_by_library(&page.documents);
    let libraries: Vec<LibraryResults> = groups
        .iter()
        .map(|(library, docs)| LibraryResults {
            table: table_rows(library, docs),
            documents: docs.iter().map(DocumentView::from).collect(),
        })
        .collect();

    Ok(Json(SearchResponse {
        query: query.to_string(),
        total: page.documents.len(),
        total_count: page.total_count,
        library_count: libraries.len(),
        libraries,
    }))
}

#[derive(Deserialize)]
pub struct DocumentParams {
    pub name: String,
}

#[derive(Serialize, Default)]
pub struct EntitiesView {
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Serialize)]
pub struct DocumentView {
    /// `DocumentName` as indexed; absent for unnamed documents
    pub name: Option<String>,
    pub title: String,
    pub library: String,
    /// `None` when the library has no metadata schema
    pub metadata: Option<Vec<MetadataRow>>,
    pub entities: EntitiesView,
    pub content: String,
}

impl From<&Document> for DocumentView {
    fn from(doc: &Document) -> Self {
        Self {
            name: doc.name.clone(),
            title: doc.display_name().to_string(),
            library: doc.library_name().to_string(),
            metadata: metadata_rows(doc),
            entities: EntitiesView {
                people: doc.people.clone(),
                organizations: doc.organizations.clone(),
                locations: doc.locations.clone(),
            },
            content: doc.content().to_string(),
        }
    }
}

async fn fetch_document(services: &Services, name: &str) -> Result<Document, ApiError> {
    services
        .index
        .find_by_name(name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document not found: {}", name)))
}

pub async fn document_handler(
    State(services): State<Arc<Services>>,
    params: Result<Query<DocumentParams>, QueryRejection>,
) -> ApiResult<DocumentView> {
    let Query(params) = params?;
    let doc = fetch_document(&services, &params.name).await?;
    Ok(Json(DocumentView::from(&doc)))
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub name: String,
    pub summary: String,
}

pub async fn summary_handler(
    State(services): State<Arc<Services>>,
    params: Result<Query<DocumentParams>, QueryRejection>,
) -> ApiResult<SummaryResponse> {
    let Query(params) = params?;
    let doc = fetch_document(&services, &params.name).await?;
    let summary = services.summaries.summary_for_document(&doc).await?;
    Ok(Json(SummaryResponse {
        name: doc.display_name().to_string(),
        summary,
    }))
}

/// Content of a document the caller already holds, e.g. a search row
#[derive(Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub content: String,
}

pub async fn summarize_handler(
    State(services): State<Arc<Services>>,
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> ApiResult<SummaryResponse> {
    let Json(request) = body?;
    let doc = Document {
        name: request.name,
        content: Some(request.content),
        ..Document::default()
    };
    let summary = services.summaries.summary_for_document(&doc).await?;
    Ok(Json(SummaryResponse {
        name: doc.display_name().to_string(),
        summary,
    }))
}

#[derive(Serialize)]
pub struct MentionsView {
    pub people: Vec<EntityMention>,
    pub organizations: Vec<EntityMention>,
    pub locations: Vec<EntityMention>,
}

#[derive(Serialize)]
pub struct SimilarDocumentView {
    pub document: String,
    pub entities: MentionsView,
}

#[derive(Serialize)]
pub struct SimilarLibrary {
    pub library: String,
    pub count: usize,
    pub documents: Vec<SimilarDocumentView>,
}

#[derive(Serialize)]
pub struct SimilarResponse {
    pub search_path: String,
    pub total: usize,
    pub libraries: Vec<SimilarLibrary>,
}

pub async fn similar_handler(
    State(services): State<Arc<Services>>,
    body: Result<Json<EntitySelection>, JsonRejection>,
) -> ApiResult<SimilarResponse> {
    let Json(selection) = body?;
    if selection.is_empty() {
        return Err(ApiError::BadRequest(
            "Please select at least one entity to find similar documents.".to_string(),
        ));
    }

    let docs = services.graph.related_documents(&selection).await?;
    let libraries = crate::graph::group_related_by_library(&docs)
        .into_iter()
        .map(|(library, docs)| SimilarLibrary {
            library,
            count: docs.len(),
            documents: docs
                .iter()
                .map(|doc| SimilarDocumentView {
                    document: doc.document.clone(),
                    entities: MentionsView {
                        people: doc.mentions(EntityKind::Person, &selection),
                        organizations: doc.mentions(EntityKind::Organization, &selection),
                        locations: doc.mentions(EntityKind::Location, &selection),
                    },
                })
                .collect(),
        })
        .collect();

    Ok(Json(SimilarResponse {
        search_path: selection.describe(),
        total: docs.len(),
        libraries,
    }))
}

/// Handler for system status
pub async fn status_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
    }))
}
