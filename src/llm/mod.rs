//! Document summaries
//!
//! Builds the summary prompt, calls the configured LLM and caches results per
//! document name.

pub mod client;

use crate::document::Document;
use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

pub use client::LlmClient;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API error: {0}")]
    ApiError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Hosted LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Groq,
    OpenAI,
    Ollama,
    /// Deterministic offline summaries
    Mock,
}

impl LlmProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "https://api.groq.com/openai/v1",
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::Mock => "",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(LlmProvider::Groq),
            "openai" => Ok(LlmProvider::OpenAI),
            "ollama" => Ok(LlmProvider::Ollama),
            "mock" => Ok(LlmProvider::Mock),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

pub const SYSTEM_PROMPT: &str =
    "You are a document analysis expert that provides clear, structured summaries in bullet points.";

/// Characters of document content sent to the model
pub const MAX_PROMPT_CHARS: usize = 4000;

pub const TEMPERATURE: f32 = 0.3;
pub const MAX_TOKENS: u32 = 500;

/// Number of summary points requested for a document of `word_count` words.
pub fn point_count(word_count: usize) -> &'static str {
    if word_count < 500 {
        "three"
    } else if word_count < 1000 {
        "five"
    } else {
        "seven"
    }
}

/// Longest prefix of `content` with at most `max_chars` characters.
pub fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

pub fn summary_prompt(content: &str) -> String {
    let points = point_count(content.split_whitespace().count());
    let excerpt = truncate_chars(content, MAX_PROMPT_CHARS);
    format!(
        "Analyze the following document content and provide a {points}-point summary:\n\
         Document Content: {excerpt}\n\n\
         Provide a clear, bullet-point summary that includes {points} main points.\n\
         Make each point concise but informative."
    )
}

/// Anything that can turn document content into a summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, content: &str) -> LlmResult<String>;
}

/// LRU-cached summaries keyed by document name
pub struct SummaryService {
    summarizer: Arc<dyn Summarizer>,
    cache: Mutex<LruCache<String, String>>,
}

impl SummaryService {
    pub fn new(summarizer: Arc<dyn Summarizer>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            summarizer,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Summary for the named document, generated on first request.
    ///
    /// Failures are returned to the caller and never cached.
    pub async fn summary_for(&self, name: &str, content: &str) -> LlmResult<String> {
        if let Some(hit) = self.cache.lock().await.get(name) {
            debug!("Summary cache hit for {}", name);
            return Ok(hit.clone());
        }

        let summary = self.summarizer.summarize(content).await?;
        self.cache.lock().await.put(name.to_string(), summary.clone());
        Ok(summary)
    }

    /// Summary of a document, cached under its `DocumentName`.
    ///
    /// Unnamed documents have no stable key and are summarized on every call.
    pub async fn summary_for_document(&self, doc: &Document) -> LlmResult<String> {
        match doc.name.as_deref() {
            Some(name) => self.summary_for(name, doc.content()).await,
            None => self.summarizer.summarize(doc.content()).await,
        }
    }

    pub async fn cached(&self, name: &str) -> Option<String> {
        self.cache.lock().await.peek(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
