//! Azure AI Search REST client

use crate::config::SearchConfig;
use crate::document::Document;
use crate::library::select_fields;
use crate::search::{name_filter, DocumentIndex, SearchError, SearchPage, SearchResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Body of a `docs/search` request
#[derive(Debug, Serialize)]
pub struct SearchRequest {
    pub search: String,
    pub select: String,
    pub count: bool,
    pub top: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl SearchRequest {
    pub fn full_text(text: &str, top: usize) -> Self {
        Self {
            search: text.to_string(),
            select: select_fields().join(","),
            count: true,
            top,
            filter: None,
        }
    }

    pub fn by_name(name: &str) -> Self {
        Self {
            search: "*".to_string(),
            select: select_fields().join(","),
            count: false,
            top: 1,
            filter: Some(name_filter(name)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "@odata.count")]
    count: Option<u64>,
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

/// Decode a `docs/search` response body.
pub fn parse_search_response(body: &str) -> SearchResult<SearchPage> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let documents = response
        .value
        .into_iter()
        .map(Document::from_hit)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SearchPage {
        total_count: response.count,
        documents,
    })
}

/// Pull the human-readable message out of an error body, if it has one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

pub struct AzureSearchClient {
    client: Client,
    search_url: String,
    api_key: String,
    top: usize,
}

impl AzureSearchClient {
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        if config.endpoint.is_empty() || config.index_name.is_empty() {
            return Err(SearchError::Config("endpoint and index name are required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let search_url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.index_name,
            config.api_version
        );

        Ok(Self {
            client,
            search_url,
            api_key: config.api_key.clone(),
            top: config.top,
        })
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    async fn post(&self, request: &SearchRequest) -> SearchResult<SearchPage> {
        debug!("Search request: {:?}", request.search);
        let response = self
            .client
            .post(&self.search_url)
            .header("api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::Service {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        parse_search_response(&body)
    }
}

#[async_trait]
impl DocumentIndex for AzureSearchClient {
    async fn search(&self, text: &str) -> SearchResult<SearchPage> {
        let page = self.post(&SearchRequest::full_text(text, self.top)).await?;
        info!(
            "Search '{}' returned {} documents (total {:?})",
            text,
            page.documents.len(),
            page.total_count
        );
        Ok(page)
    }

    async fn find_by_name(&self, name: &str) -> SearchResult<Option<Document>> {
        let page = self.post(&SearchRequest::by_name(name)).await?;
        Ok(page.documents.into_iter().next())
    }
}
