//! In-memory stand-ins for the search index, entity graph and LLM
#![allow(dead_code)]

use async_trait::async_trait;
use docsearch::graph::{EntityGraph, EntityKind, EntitySelection, GraphError, GraphResult, RelatedDocument};
use docsearch::llm::{LlmError, LlmResult, Summarizer, SummaryService};
use docsearch::search::{DocumentIndex, SearchError, SearchPage, SearchResult};
use docsearch::{Document, Services};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct MockIndex {
    pub documents: Vec<Document>,
    pub queries: Mutex<Vec<String>>,
}

impl MockIndex {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentIndex for MockIndex {
    async fn search(&self, text: &str) -> SearchResult<SearchPage> {
        self.queries.lock().unwrap().push(text.to_string());
        if text == "explode" {
            return Err(SearchError::Service {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }

        let needle = text.to_lowercase();
        let documents: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| text == "*" || d.content().to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(SearchPage {
            total_count: Some(documents.len() as u64),
            documents,
        })
    }

    async fn find_by_name(&self, name: &str) -> SearchResult<Option<Document>> {
        Ok(self
            .documents
            .iter()
            .find(|d| d.name.as_deref() == Some(name))
            .cloned())
    }
}

/// Answers selections from a fixed set of related documents.
pub struct MockGraph {
    pub corpus: Vec<RelatedDocument>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockGraph {
    pub fn new(corpus: Vec<RelatedDocument>) -> Self {
        Self {
            corpus,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EntityGraph for MockGraph {
    async fn submit(&self, _gremlin: &str) -> GraphResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn related_documents(&self, selection: &EntitySelection) -> GraphResult<Vec<RelatedDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(GraphError::Connection("connection refused".to_string()));
        }
        Ok(self
            .corpus
            .iter()
            .filter(|doc| {
                EntityKind::ALL
                    .iter()
                    .any(|&kind| doc.names(kind).iter().any(|n| selection.contains(kind, n)))
            })
            .cloned()
            .collect())
    }
}

/// Returns canned raw results and records every submitted script.
pub struct ScriptedGraph {
    pub response: Vec<Value>,
    pub scripts: Mutex<Vec<String>>,
}

#[async_trait]
impl EntityGraph for ScriptedGraph {
    async fn submit(&self, gremlin: &str) -> GraphResult<Vec<Value>> {
        self.scripts.lock().unwrap().push(gremlin.to_string());
        Ok(self.response.clone())
    }
}

pub struct MockSummarizer {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, content: &str) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(LlmError::ApiError("rate limited".to_string()));
        }
        Ok(format!("- Point 1: {} words", content.split_whitespace().count()))
    }
}

pub fn document(name: &str, library: &str, content: &str) -> Document {
    Document {
        name: Some(name.to_string()),
        library: Some(library.to_string()),
        content: Some(content.to_string()),
        ..Document::default()
    }
}

pub fn related(name: &str, library: &str, people: &[&str], orgs: &[&str], locations: &[&str]) -> RelatedDocument {
    let mut matched = BTreeMap::new();
    for (kind, names) in [
        (EntityKind::Person, people),
        (EntityKind::Organization, orgs),
        (EntityKind::Location, locations),
    ] {
        if !names.is_empty() {
            matched.insert(
                kind.vertex_label().to_string(),
                names.iter().map(|n| n.to_string()).collect(),
            );
        }
    }
    RelatedDocument {
        document: name.to_string(),
        library: library.to_string(),
        matched_entities: matched,
    }
}

/// Five documents over three libraries, one of them unnamed with overlapping entities
pub fn sample_documents() -> Vec<Document> {
    let mut contract = document(
        "contract.pdf",
        "HR",
        "Employment contract between Ayala Land and Ana Cruz in Makati",
    );
    contract.people = vec!["Ana Cruz".to_string()];
    contract.organizations = vec!["Ayala Land".to_string()];
    contract.locations = vec!["Makati".to_string()];
    contract.fields.insert("Employee_No_HR".to_string(), json!("E-7"));
    contract.fields.insert("Department_HR".to_string(), json!("Legal"));

    let mut report = document(
        "annual-2023.pdf",
        "Ayala_Annual_Report",
        "Annual report of Ayala Land for 2023 covering Makati",
    );
    report.organizations = vec!["Ayala Land".to_string()];
    report.locations = vec!["Makati".to_string()];

    let mut memo = document("memo.docx", "HR", "Memo from Ben Reyes about the contract renewal");
    memo.people = vec!["Ben Reyes".to_string()];

    let brochure = document("brochure.pdf", "Marketing", "Product brochure for the spring launch");

    let mut payroll = document("", "HR", "Payroll register for March");
    payroll.name = None;

    vec![contract, report, memo, brochure, payroll]
}

pub fn sample_graph() -> Vec<RelatedDocument> {
    vec![
        related("contract.pdf", "HR", &["Ana Cruz"], &["Ayala Land"], &["Makati"]),
        related("annual-2023.pdf", "Ayala_Annual_Report", &[], &["Ayala Land"], &["Makati"]),
        related("memo.docx", "HR", &["Ben Reyes"], &[], &[]),
        related("lease.pdf", "Ayala_Legal_Docs", &[], &["Ayala Land"], &["Taguig"]),
    ]
}

pub struct Fixture {
    pub index: Arc<MockIndex>,
    pub graph: Arc<MockGraph>,
    pub summarizer: Arc<MockSummarizer>,
    pub services: Arc<Services>,
}

pub fn fixture() -> Fixture {
    let index = Arc::new(MockIndex::new(sample_documents()));
    let graph = Arc::new(MockGraph::new(sample_graph()));
    let summarizer = Arc::new(MockSummarizer::new());
    let services = Arc::new(Services {
        index: index.clone(),
        graph: graph.clone(),
        summaries: SummaryService::new(summarizer.clone(), 16),
    });
    Fixture {
        index,
        graph,
        summarizer,
        services,
    }
}
